//! Annotation commands.

use super::Format;
use mefkit_core::{SessionReader, SessionWriter};
use mefkit_storage::{Annotation, RecordKind};

/// Adds one record to a channel or to the session.
pub fn add(
    writer: &mut SessionWriter,
    channel: Option<&str>,
    time: i64,
    kind: RecordKind,
    text: &str,
    duration: Option<i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut record = Annotation::new(time, kind, text);
    if let Some(duration) = duration {
        record = record.with_duration(duration);
    }
    writer.write_annotations(&[record], channel)?;
    println!(
        "{} record added to {}",
        kind,
        channel.unwrap_or("session")
    );
    Ok(())
}

/// Lists the records of a channel or of the session.
pub fn list(
    reader: &SessionReader,
    channel: Option<&str>,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = reader.read_annotations(channel)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        Format::Text => {
            if records.is_empty() {
                println!("No records");
            }
            for record in &records {
                match record.duration {
                    Some(duration) => println!(
                        "{:>16}  {:<7} {} ({} us)",
                        record.time, record.kind, record.text, duration
                    ),
                    None => println!("{:>16}  {:<7} {}", record.time, record.kind, record.text),
                }
            }
        }
    }
    Ok(())
}
