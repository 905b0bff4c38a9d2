//! Read command implementation.

use super::Format;
use mefkit_core::{ChannelSelector, SessionReader};
use mefkit_storage::TimeRange;
use serde::Serialize;

/// Samples of one channel.
#[derive(Debug, Serialize)]
pub struct ChannelData {
    /// Channel name.
    pub channel: String,
    /// Samples in physical units; gaps are NaN, written as `null` in JSON.
    pub samples: Vec<f64>,
}

/// Builds a selector from names, treating all-digit entries as indices.
pub fn selector(channels: &[String]) -> ChannelSelector {
    ChannelSelector::Many(
        channels
            .iter()
            .map(|c| match c.parse::<usize>() {
                Ok(index) => ChannelSelector::Index(index),
                Err(_) => ChannelSelector::Name(c.clone()),
            })
            .collect(),
    )
}

/// Runs the read command.
pub fn run(
    reader: &SessionReader,
    channels: &[String],
    start: Option<i64>,
    end: Option<i64>,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let selector = if channels.is_empty() {
        ChannelSelector::Many((0..reader.channels().len()).map(ChannelSelector::Index).collect())
    } else {
        selector(channels)
    };
    let names = reader.resolve(&selector)?;

    // An open-ended bound falls back to the common window of the selection.
    let range = match (start, end) {
        (None, None) => None,
        (start, end) => {
            let infos: Vec<_> = names.iter().filter_map(|n| reader.channel_info(n)).collect();
            let default_start = infos.iter().map(|i| i.start_time).min().unwrap_or(0);
            let default_end = infos.iter().map(|i| i.end_time).min().unwrap_or(0);
            Some(TimeRange::new(
                start.unwrap_or(default_start),
                end.unwrap_or(default_end),
            ))
        }
    };

    let data: Vec<ChannelData> = names
        .iter()
        .cloned()
        .zip(reader.read(selector, range)?)
        .map(|(channel, samples)| ChannelData { channel, samples })
        .collect();

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&data)?),
        Format::Text => {
            for channel in &data {
                println!("{} ({} samples)", channel.channel, channel.samples.len());
                for sample in &channel.samples {
                    println!("  {sample}");
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_select_by_index() {
        let selector = selector(&["2".to_string(), "eeg".to_string()]);
        assert_eq!(
            selector,
            ChannelSelector::Many(vec![
                ChannelSelector::Index(2),
                ChannelSelector::Name("eeg".to_string())
            ])
        );
    }
}
