//! Inspect command implementation.

use super::Format;
use mefkit_core::quantize::precision_from_scale_factor;
use mefkit_core::SessionReader;
use serde::Serialize;
use std::path::Path;

/// Session inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Session path.
    pub path: String,
    /// Per-channel summaries.
    pub channels: Vec<ChannelSummary>,
    /// Number of session-level annotation records.
    pub session_records: usize,
}

/// Summary of a single channel.
#[derive(Debug, Serialize)]
pub struct ChannelSummary {
    /// Channel name.
    pub name: String,
    /// Sampling frequency in Hz.
    pub sampling_frequency: f64,
    /// Stored precision in decimal digits.
    pub precision: u32,
    /// Unit label.
    pub units: String,
    /// Stored samples.
    pub samples: u64,
    /// First timestamp (uutc).
    pub start_time: i64,
    /// End timestamp (uutc).
    pub end_time: i64,
    /// Number of annotation records.
    pub records: usize,
}

/// Collects the inspection result.
pub fn inspect(path: &Path, reader: &SessionReader) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let mut channels = Vec::new();
    for info in reader.channel_infos() {
        channels.push(ChannelSummary {
            name: info.name.clone(),
            sampling_frequency: info.sampling_frequency(),
            precision: precision_from_scale_factor(info.units_conversion_factor),
            units: info.units_description.clone(),
            samples: info.number_of_samples,
            start_time: info.start_time,
            end_time: info.end_time,
            records: reader.read_annotations(Some(&info.name))?.len(),
        });
    }
    Ok(InspectResult {
        path: path.display().to_string(),
        channels,
        session_records: reader.read_annotations(None)?.len(),
    })
}

/// Runs the inspect command.
pub fn run(
    path: &Path,
    reader: &SessionReader,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(path, reader)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Text => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Session: {}", result.path);
    println!("Channels: {}", result.channels.len());
    println!("Session records: {}", result.session_records);
    for channel in &result.channels {
        println!();
        println!("  {}", channel.name);
        println!("    Sampling frequency: {} Hz", channel.sampling_frequency);
        println!("    Precision: {} ({})", channel.precision, channel.units);
        println!("    Samples: {}", channel.samples);
        println!("    Time: {} .. {}", channel.start_time, channel.end_time);
        println!("    Records: {}", channel.records);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mefkit_core::{SessionWriter, WriteRequest, WriterConfig};
    use mefkit_storage::{Annotation, Credentials, InMemoryEngine};

    #[test]
    fn summarizes_channels() {
        let engine = InMemoryEngine::new();
        let mut writer =
            SessionWriter::open(engine.clone(), WriterConfig::default(), Credentials::none())
                .unwrap();
        writer
            .write(&WriteRequest::new("eeg", &[1.0, 2.0], 0, 2.0).precision(2))
            .unwrap();
        writer
            .write_annotations(&[Annotation::note(0, "start")], Some("eeg"))
            .unwrap();
        writer.close().unwrap();

        let reader = SessionReader::open(engine).unwrap();
        let result = inspect(Path::new("mem"), &reader).unwrap();
        assert_eq!(result.channels.len(), 1);
        let eeg = &result.channels[0];
        assert_eq!(eeg.precision, 2);
        assert_eq!(eeg.samples, 2);
        assert_eq!(eeg.end_time, 1_000_000);
        assert_eq!(eeg.records, 1);
        assert_eq!(result.session_records, 0);
    }
}
