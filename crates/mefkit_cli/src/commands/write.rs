//! Write command implementation.

use super::CliError;
use mefkit_core::{SessionWriter, WriteOutcome, WriteRequest, WriteSummary};
use std::fs;
use std::path::Path;
use tracing::info;

/// Options of a single channel write.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Target channel.
    pub channel: String,
    /// Timestamp of the first sample (uutc).
    pub start_uutc: i64,
    /// Sampling frequency in Hz.
    pub sampling_frequency: f64,
    /// Explicit end timestamp.
    pub end_uutc: Option<i64>,
    /// Precision for a new channel.
    pub precision: Option<i64>,
    /// Start a new segment.
    pub new_segment: bool,
    /// Store the buffer as one run, gaps included.
    pub no_gap_split: bool,
}

/// Parses one sample per line. Empty lines and `nan` are gaps; lines
/// starting with `#` are skipped.
pub fn parse_samples(text: &str) -> Result<Vec<f64>, CliError> {
    let mut samples = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.starts_with('#') {
            continue;
        }
        if line.is_empty() {
            samples.push(f64::NAN);
            continue;
        }
        let value = line.parse::<f64>().map_err(|_| CliError::InvalidSample {
            line: i + 1,
            value: line.to_string(),
        })?;
        samples.push(value);
    }
    Ok(samples)
}

/// Writes `samples` through `writer` and turns a rejection into an error.
pub fn write_samples(
    writer: &mut SessionWriter,
    samples: &[f64],
    options: &WriteOptions,
) -> Result<WriteSummary, Box<dyn std::error::Error>> {
    let mut request = WriteRequest::new(
        &options.channel,
        samples,
        options.start_uutc,
        options.sampling_frequency,
    )
    .new_segment(options.new_segment)
    .discontinuity_handling(!options.no_gap_split);
    if let Some(end) = options.end_uutc {
        request = request.end_uutc(end);
    }
    if let Some(precision) = options.precision {
        request = request.precision(precision);
    }

    match writer.write(&request)? {
        WriteOutcome::Written(summary) => Ok(summary),
        WriteOutcome::Rejected(rejection) => Err(CliError::Rejected(rejection).into()),
    }
}

/// Prints a one-line summary of a write.
pub fn report(summary: &WriteSummary) {
    println!(
        "{}: {} samples in {} interval(s) to segment {}{} at precision {}",
        summary.channel,
        summary.samples_written,
        summary.intervals,
        summary.segment,
        if summary.created_segment { " (new)" } else { "" },
        summary.precision
    );
    if summary.saturation_steps > 0 {
        println!(
            "  precision lowered {} time(s) to fit the dynamic range",
            summary.saturation_steps
        );
    }
}

/// Runs the write command.
pub fn run(
    writer: &mut SessionWriter,
    input: &Path,
    options: &WriteOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let samples = parse_samples(&fs::read_to_string(input)?)?;
    info!(input = %input.display(), samples = samples.len(), "read sample file");
    let summary = write_samples(writer, &samples, options)?;
    report(&summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mefkit_core::WriterConfig;
    use mefkit_storage::{Credentials, InMemoryEngine};

    fn options(start_uutc: i64) -> WriteOptions {
        WriteOptions {
            channel: "eeg".to_string(),
            start_uutc,
            sampling_frequency: 1.0,
            end_uutc: None,
            precision: None,
            new_segment: false,
            no_gap_split: false,
        }
    }

    #[test]
    fn parses_gaps_and_comments() {
        let samples = parse_samples("# header\n1.5\n\nnan\n-2\n").unwrap();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0], 1.5);
        assert!(samples[1].is_nan());
        assert!(samples[2].is_nan());
        assert_eq!(samples[3], -2.0);
    }

    #[test]
    fn reports_bad_lines() {
        let err = parse_samples("1\nabc\n").unwrap_err();
        assert!(matches!(err, CliError::InvalidSample { line: 2, .. }));
    }

    #[test]
    fn rejection_becomes_error() {
        let mut writer =
            SessionWriter::open(InMemoryEngine::new(), WriterConfig::default(), Credentials::none())
                .unwrap();
        write_samples(&mut writer, &[1.0, 2.0, 3.0], &options(0)).unwrap();
        let err = write_samples(&mut writer, &[4.0], &options(1_000_000)).unwrap_err();
        assert!(err.to_string().starts_with("write rejected"));
    }

    #[test]
    fn run_writes_sample_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("samples.txt");
        fs::write(&input, "1\n2\n3\n").unwrap();

        let engine = InMemoryEngine::new();
        let mut writer =
            SessionWriter::open(engine.clone(), WriterConfig::default(), Credentials::none())
                .unwrap();
        run(&mut writer, &input, &options(0)).unwrap();
        writer.close().unwrap();

        let reader = mefkit_core::SessionReader::open(engine).unwrap();
        assert_eq!(reader.read("eeg", None).unwrap()[0], vec![1.0, 2.0, 3.0]);
    }
}
