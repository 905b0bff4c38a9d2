//! Annotation record merging.
//!
//! Storage engines replace the whole record set of a scope on every write,
//! so adding records means reading the old set and writing the union.

use crate::error::{CoreError, CoreResult};
use mefkit_storage::{Annotation, StorageEngine, StorageError};
use tracing::{debug, warn};

/// A record set ready to be written back, with its time bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedRecords {
    /// New records followed by the previously stored ones.
    pub records: Vec<Annotation>,
    /// Earliest record time.
    pub start_time: i64,
    /// Latest record time.
    pub end_time: i64,
}

/// Places `new` before `previous` and computes the bounds over both.
///
/// # Errors
///
/// Returns [`CoreError::InvalidOperation`] if `new` is empty.
pub fn combine(new: &[Annotation], previous: Vec<Annotation>) -> CoreResult<CombinedRecords> {
    if new.is_empty() {
        return Err(CoreError::invalid_operation("no annotation records to write"));
    }

    let mut records = Vec::with_capacity(new.len() + previous.len());
    records.extend_from_slice(new);
    records.extend(previous);

    let (start_time, end_time) = records
        .iter()
        .fold((i64::MAX, i64::MIN), |(lo, hi), r| (lo.min(r.time), hi.max(r.time)));

    Ok(CombinedRecords {
        records,
        start_time,
        end_time,
    })
}

/// Reads the stored records of a scope before they are rewritten.
///
/// Only a scope that never held records reads as empty. Any other failure
/// is returned, since writing the combined set would replace what is stored.
pub(crate) fn read_existing(
    engine: &dyn StorageEngine,
    channel: Option<&str>,
) -> CoreResult<Vec<Annotation>> {
    match engine.read_records(channel) {
        Ok(records) => Ok(records),
        Err(StorageError::NoRecords { .. }) => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Reads the stored records of a scope. Read failures, including a scope
/// that never held records, give an empty set.
pub(crate) fn read_or_empty(engine: &dyn StorageEngine, channel: Option<&str>) -> Vec<Annotation> {
    let scope = channel.unwrap_or("<session>");
    match engine.read_records(channel) {
        Ok(records) => records,
        Err(StorageError::NoRecords { .. }) => {
            debug!(scope, "no stored records");
            Vec::new()
        }
        Err(e) => {
            warn!(scope, error = %e, "failed to read records");
            Vec::new()
        }
    }
}
