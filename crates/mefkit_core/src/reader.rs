//! Session reader.

use crate::annotations;
use crate::error::{CoreError, CoreResult};
use mefkit_storage::{Annotation, ChannelBasicInfo, StorageEngine, TimeRange};
use tracing::debug;

/// Which channels to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelector {
    /// A channel by name.
    Name(String),
    /// A channel by position in [`SessionReader::channels`].
    Index(usize),
    /// Several channels. Duplicates are read once, in first-seen order.
    Many(Vec<ChannelSelector>),
}

impl From<&str> for ChannelSelector {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for ChannelSelector {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for ChannelSelector {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl<T: Into<ChannelSelector>> From<Vec<T>> for ChannelSelector {
    fn from(selectors: Vec<T>) -> Self {
        Self::Many(selectors.into_iter().map(Into::into).collect())
    }
}

/// Reads samples and annotations from one session.
///
/// Engines check the access password when they are opened, so the reader
/// takes an engine that is already authorized.
///
/// # Example
///
/// ```rust
/// use mefkit_core::{SessionReader, SessionWriter, WriteRequest, WriterConfig};
/// use mefkit_storage::{Credentials, InMemoryEngine};
///
/// let engine = InMemoryEngine::new();
/// let mut writer =
///     SessionWriter::open(engine.clone(), WriterConfig::default(), Credentials::none()).unwrap();
/// writer
///     .write(&WriteRequest::new("eeg", &[1.5, 2.5, 3.5], 0, 1.0))
///     .unwrap();
/// writer.close().unwrap();
///
/// let reader = SessionReader::open(engine).unwrap();
/// let data = reader.read("eeg", None).unwrap();
/// assert_eq!(data[0], vec![1.5, 2.5, 3.5]);
/// ```
pub struct SessionReader {
    engine: Box<dyn StorageEngine>,
    channels: Vec<ChannelBasicInfo>,
    is_open: bool,
}

impl SessionReader {
    /// Opens a reader and loads the channel summaries.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Unsupported`] if a channel was recorded at more
    /// than one sampling frequency, or the engine's error if it cannot be
    /// read.
    pub fn open(engine: impl StorageEngine + 'static) -> CoreResult<Self> {
        let channels = engine.read_basic_info()?;
        if let Some(info) = channels.iter().find(|c| c.sampling_frequencies.len() > 1) {
            return Err(CoreError::unsupported(format!(
                "channel {} has several sampling frequencies {:?}",
                info.name, info.sampling_frequencies
            )));
        }
        debug!(channels = channels.len(), "session reader opened");
        Ok(Self {
            engine: Box::new(engine),
            channels,
            is_open: true,
        })
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.is_open {
            Ok(())
        } else {
            Err(CoreError::SessionClosed)
        }
    }

    /// Channel names in storage order.
    #[must_use]
    pub fn channels(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    /// Summary of one channel.
    #[must_use]
    pub fn channel_info(&self, channel: &str) -> Option<&ChannelBasicInfo> {
        self.channels.iter().find(|c| c.name == channel)
    }

    /// Summaries of all channels.
    #[must_use]
    pub fn channel_infos(&self) -> &[ChannelBasicInfo] {
        &self.channels
    }

    fn resolve_into(&self, selector: &ChannelSelector, out: &mut Vec<String>) -> CoreResult<()> {
        let name = match selector {
            ChannelSelector::Name(name) => {
                if self.channel_info(name).is_none() {
                    return Err(CoreError::channel_not_found(name.clone()));
                }
                name.clone()
            }
            ChannelSelector::Index(index) => self
                .channels
                .get(*index)
                .map(|c| c.name.clone())
                .ok_or_else(|| {
                    CoreError::channel_not_found(format!(
                        "index {index} of {} channels",
                        self.channels.len()
                    ))
                })?,
            ChannelSelector::Many(selectors) => {
                for s in selectors {
                    self.resolve_into(s, out)?;
                }
                return Ok(());
            }
        };
        if !out.contains(&name) {
            out.push(name);
        }
        Ok(())
    }

    /// Resolves a selector to distinct channel names, in request order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ChannelNotFound`] for an unknown name or an
    /// out-of-range index, and [`CoreError::InvalidOperation`] if nothing
    /// is selected.
    pub fn resolve(&self, selector: &ChannelSelector) -> CoreResult<Vec<String>> {
        let mut names = Vec::new();
        self.resolve_into(selector, &mut names)?;
        if names.is_empty() {
            return Err(CoreError::invalid_operation("no channels selected"));
        }
        Ok(names)
    }

    /// Window covered by all of `channels`: earliest start to earliest end.
    fn default_range(&self, channels: &[String]) -> TimeRange {
        let selected = || {
            self.channels
                .iter()
                .filter(|c| channels.contains(&c.name))
        };
        let start = selected().map(|c| c.start_time).min().unwrap_or(0);
        let end = selected().map(|c| c.end_time).min().unwrap_or(0);
        TimeRange::new(start, end)
    }

    /// Reads stored integer samples, one slot per sample period.
    ///
    /// Slots inside gaps are `None`, so positions line up with time.
    /// Without a range, reads from the earliest start to the earliest end
    /// among the selected channels.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader is closed, the selector does not
    /// resolve, or the engine fails.
    pub fn read_raw(
        &self,
        selector: impl Into<ChannelSelector>,
        range: Option<TimeRange>,
    ) -> CoreResult<Vec<Vec<Option<i32>>>> {
        self.ensure_open()?;
        let names = self.resolve(&selector.into())?;
        let range = range.unwrap_or_else(|| self.default_range(&names));
        Ok(self.engine.read_samples(&names, range)?)
    }

    /// Reads samples converted back to physical units. Gaps are NaN.
    ///
    /// # Errors
    ///
    /// Same as [`read_raw`](Self::read_raw).
    pub fn read(
        &self,
        selector: impl Into<ChannelSelector>,
        range: Option<TimeRange>,
    ) -> CoreResult<Vec<Vec<f64>>> {
        self.ensure_open()?;
        let names = self.resolve(&selector.into())?;
        let range = range.unwrap_or_else(|| self.default_range(&names));
        let raw = self.engine.read_samples(&names, range)?;

        Ok(names
            .iter()
            .zip(raw)
            .map(|(name, samples)| {
                let factor = self
                    .channel_info(name)
                    .map_or(1.0, |c| c.units_conversion_factor);
                samples
                    .into_iter()
                    .map(|s| s.map_or(f64::NAN, |s| f64::from(s) * factor))
                    .collect()
            })
            .collect())
    }

    /// Annotation records of a channel or of the session; empty if none
    /// were stored.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SessionClosed`] after [`close`](Self::close).
    pub fn read_annotations(&self, channel: Option<&str>) -> CoreResult<Vec<Annotation>> {
        self.ensure_open()?;
        Ok(annotations::read_or_empty(self.engine.as_ref(), channel))
    }

    /// Closes the reader. Closing twice is a no-op.
    pub fn close(&mut self) {
        self.is_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SessionWriter, WriteRequest, WriterConfig};
    use mefkit_storage::{Credentials, InMemoryEngine, RecordingMetadata, SegmentMetadata};

    fn session() -> InMemoryEngine {
        let engine = InMemoryEngine::new();
        let mut writer =
            SessionWriter::open(engine.clone(), WriterConfig::default(), Credentials::none())
                .unwrap();
        let a: Vec<f64> = (0..10).map(|i| f64::from(i) * 0.25).collect();
        let b: Vec<f64> = (0..20).map(|i| f64::from(i) * 0.5).collect();
        writer
            .write(&WriteRequest::new("a", &a, 0, 10.0).precision(2))
            .unwrap();
        writer
            .write(&WriteRequest::new("b", &b, 500_000, 10.0).precision(1))
            .unwrap();
        writer.close().unwrap();
        engine
    }

    #[test]
    fn selectors_resolve_in_request_order() {
        let reader = SessionReader::open(session()).unwrap();
        assert_eq!(reader.channels(), vec!["a", "b"]);

        let many = ChannelSelector::Many(vec![1usize.into(), "a".into(), "b".into()]);
        assert_eq!(reader.resolve(&many).unwrap(), vec!["b", "a"]);
        assert_eq!(reader.resolve(&0usize.into()).unwrap(), vec!["a"]);
    }

    #[test]
    fn unknown_channels_fail() {
        let reader = SessionReader::open(session()).unwrap();
        assert!(matches!(
            reader.resolve(&"zz".into()),
            Err(CoreError::ChannelNotFound { .. })
        ));
        assert!(matches!(
            reader.resolve(&5usize.into()),
            Err(CoreError::ChannelNotFound { .. })
        ));
        assert!(matches!(
            reader.resolve(&ChannelSelector::Many(Vec::new())),
            Err(CoreError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn default_window_is_common_to_selection() {
        let reader = SessionReader::open(session()).unwrap();
        // a covers [0, 1s), b covers [0.5s, 2.5s)
        let data = reader.read_raw(vec!["a", "b"], None).unwrap();
        assert_eq!(data[0].len(), 10);
        assert_eq!(data[1].len(), 5);

        let only_b = reader.read_raw("b", None).unwrap();
        assert_eq!(only_b[0].len(), 20);
    }

    #[test]
    fn read_applies_scale_factor() {
        let reader = SessionReader::open(session()).unwrap();
        let data = reader
            .read("a", Some(TimeRange::new(0, 400_000)))
            .unwrap();
        assert_eq!(data[0].len(), 4);
        for (i, value) in data[0].iter().enumerate() {
            assert!((value - i as f64 * 0.25).abs() < 1e-9);
        }
    }

    #[test]
    fn gaps_read_back_in_place() {
        let engine = InMemoryEngine::new();
        let config = WriterConfig::new().gap_tolerance(crate::GapTolerance::Samples(0));
        let mut writer =
            SessionWriter::open(engine.clone(), config, Credentials::none()).unwrap();
        let samples = [1.0, f64::NAN, f64::NAN, f64::NAN, 5.0];
        writer
            .write(&WriteRequest::new("g", &samples, 0, 1.0).precision(0))
            .unwrap();
        writer.close().unwrap();

        let reader = SessionReader::open(engine).unwrap();
        assert_eq!(
            reader.read_raw("g", None).unwrap()[0],
            vec![Some(1), None, None, None, Some(5)]
        );
        let values = reader.read("g", None).unwrap().remove(0);
        assert_eq!(values.len(), samples.len());
        for (read, written) in values.iter().zip(&samples) {
            assert_eq!(read.is_nan(), written.is_nan());
            if !written.is_nan() {
                assert_eq!(read, written);
            }
        }

        let window = reader.read_raw("g", Some(TimeRange::new(2_000_000, 5_000_000))).unwrap();
        assert_eq!(window[0], vec![None, None, Some(5)]);
    }

    #[test]
    fn several_frequencies_are_unsupported() {
        let mut engine = InMemoryEngine::new();
        let creds = Credentials::none();
        let rec = RecordingMetadata::default();
        for (segment, fs) in [(0, 10.0), (1, 20.0)] {
            let meta = SegmentMetadata {
                sampling_frequency: fs,
                ..SegmentMetadata::default()
            };
            engine
                .create_segment("x", segment, &creds, 0, 1, &meta, &rec)
                .unwrap();
        }
        assert!(matches!(
            SessionReader::open(engine),
            Err(CoreError::Unsupported { .. })
        ));
    }

    #[test]
    fn annotations_and_close() {
        let engine = session();
        let mut writer =
            SessionWriter::open(engine.clone(), WriterConfig::default(), Credentials::none())
                .unwrap();
        writer
            .write_annotations(&[Annotation::note(10, "start")], None)
            .unwrap();
        drop(writer);

        let mut reader = SessionReader::open(engine).unwrap();
        assert_eq!(reader.read_annotations(None).unwrap().len(), 1);
        assert!(reader.read_annotations(Some("a")).unwrap().is_empty());

        reader.close();
        reader.close();
        assert!(matches!(reader.read_raw("a", None), Err(CoreError::SessionClosed)));
    }
}
