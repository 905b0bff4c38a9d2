//! Session writer.
//!
//! Turns float sample buffers into segment create and append calls against
//! a [`StorageEngine`]. All checks happen before the first storage call: a
//! write is either rejected without touching storage, or dispatched
//! interval by interval. A storage failure partway through dispatch leaves
//! the earlier intervals written and the metadata cache refreshed to show
//! them; callers should check the channel's end time before retrying.
//!
//! One writer per channel at a time. The overlap check and the segment
//! index both come from the metadata cache, which concurrent writers on the
//! same channel would invalidate.

use crate::annotations::{self, combine};
use crate::config::{SegmentFields, WriterConfig};
use crate::error::{CoreError, CoreResult};
use crate::intervals::{find_intervals, offset_to_uutc, validity_mask, Interval};
use crate::metadata::{block_length_for, ChannelInfo, ChannelMetadataCache};
use crate::quantize::{infer_precision, normalize_precision, quantize, scale_factor};
use mefkit_storage::{Annotation, Credentials, StorageEngine};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Samples to write to one channel.
///
/// # Example
///
/// ```rust
/// use mefkit_core::WriteRequest;
///
/// let samples = [0.5, 1.0, f64::NAN, 2.0];
/// let request = WriteRequest::new("eeg", &samples, 1_000_000, 256.0)
///     .precision(3)
///     .new_segment(true);
/// assert_eq!(request.precision, Some(3));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct WriteRequest<'a> {
    /// Target channel.
    pub channel: &'a str,
    /// Float samples; non-finite values are gaps.
    pub samples: &'a [f64],
    /// Timestamp of the first sample (uutc).
    pub start_uutc: i64,
    /// Sampling frequency in Hz.
    pub sampling_frequency: f64,
    /// End timestamp; derived from the buffer length when absent.
    pub end_uutc: Option<i64>,
    /// Decimal digits to keep. Only honored when the write creates the
    /// channel; existing channels keep their stored scale factor.
    pub precision: Option<i64>,
    /// Start a new segment instead of appending to the last one. Always
    /// true for new channels.
    pub new_segment: bool,
    /// Split the buffer at long gaps instead of storing it as one run.
    pub discontinuity_handling: bool,
    /// Re-read channel metadata after the write. Defaults to
    /// [`WriterConfig::refresh_after_write`]. A created segment always
    /// triggers a refresh.
    pub refresh_metadata: Option<bool>,
}

impl<'a> WriteRequest<'a> {
    /// Creates a request with default options.
    #[must_use]
    pub const fn new(
        channel: &'a str,
        samples: &'a [f64],
        start_uutc: i64,
        sampling_frequency: f64,
    ) -> Self {
        Self {
            channel,
            samples,
            start_uutc,
            sampling_frequency,
            end_uutc: None,
            precision: None,
            new_segment: false,
            discontinuity_handling: true,
            refresh_metadata: None,
        }
    }

    /// Sets an explicit end timestamp.
    #[must_use]
    pub const fn end_uutc(mut self, end_uutc: i64) -> Self {
        self.end_uutc = Some(end_uutc);
        self
    }

    /// Sets the precision for a new channel.
    #[must_use]
    pub const fn precision(mut self, precision: i64) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Sets whether to start a new segment.
    #[must_use]
    pub const fn new_segment(mut self, value: bool) -> Self {
        self.new_segment = value;
        self
    }

    /// Sets whether gaps split the buffer.
    #[must_use]
    pub const fn discontinuity_handling(mut self, value: bool) -> Self {
        self.discontinuity_handling = value;
        self
    }

    /// Sets whether to refresh metadata after the write.
    #[must_use]
    pub const fn refresh_metadata(mut self, value: bool) -> Self {
        self.refresh_metadata = Some(value);
        self
    }

    /// End timestamp, explicit or derived from the buffer length.
    #[must_use]
    pub fn resolved_end_uutc(&self) -> i64 {
        self.end_uutc.unwrap_or_else(|| {
            offset_to_uutc(self.start_uutc, self.samples.len(), self.sampling_frequency)
        })
    }
}

/// Why a write was refused. No storage call was made.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WriteRejection {
    /// The request ends before it starts.
    #[error("end {end_uutc} is before start {start_uutc}")]
    EndBeforeStart {
        /// Requested start.
        start_uutc: i64,
        /// Requested or derived end.
        end_uutc: i64,
    },

    /// The request starts before the channel's stored data ends.
    #[error("start {start_uutc} overlaps data of channel {channel} ending at {channel_end}")]
    OverlapsExistingData {
        /// Channel name.
        channel: String,
        /// Requested start.
        start_uutc: i64,
        /// Current end of the channel.
        channel_end: i64,
    },

    /// The request's sampling frequency differs from the channel's.
    #[error("channel {channel} is sampled at {expected} Hz, got {actual} Hz")]
    SamplingFrequencyMismatch {
        /// Channel name.
        channel: String,
        /// The channel's sampling frequency.
        expected: f64,
        /// The requested sampling frequency.
        actual: f64,
    },
}

/// What a successful write did.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteSummary {
    /// Channel written.
    pub channel: String,
    /// Segment the samples went to.
    pub segment: usize,
    /// Whether the write created that segment.
    pub created_segment: bool,
    /// Precision the samples were stored at.
    pub precision: u32,
    /// Precision reductions forced by the dynamic range of a new channel.
    pub saturation_steps: u32,
    /// Number of stored intervals.
    pub intervals: usize,
    /// Number of stored samples, including zero-filled short gaps.
    pub samples_written: usize,
}

/// Result of [`SessionWriter::write`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The samples were dispatched to storage.
    Written(WriteSummary),
    /// The request was refused before any storage call.
    Rejected(WriteRejection),
}

impl WriteOutcome {
    /// Returns true if the write went through.
    #[must_use]
    pub const fn is_written(&self) -> bool {
        matches!(self, Self::Written(_))
    }

    /// The summary of a successful write.
    #[must_use]
    pub const fn summary(&self) -> Option<&WriteSummary> {
        match self {
            Self::Written(summary) => Some(summary),
            Self::Rejected(_) => None,
        }
    }

    /// The reason a write was refused.
    #[must_use]
    pub const fn rejection(&self) -> Option<&WriteRejection> {
        match self {
            Self::Written(_) => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }
}

/// Where and how a planned write lands.
struct SegmentPlan {
    segment: usize,
    create: bool,
    precision: u32,
    saturation_steps: u32,
    scale_factor: f64,
    block_length: i64,
    start_sample: u64,
}

impl SegmentPlan {
    fn for_existing(info: &ChannelInfo, new_segment: bool) -> Self {
        Self {
            segment: if new_segment {
                info.segment_count
            } else {
                info.segment_count.saturating_sub(1)
            },
            create: new_segment,
            precision: info.precision(),
            saturation_steps: 0,
            scale_factor: info.scale_factor,
            block_length: info.block_length,
            start_sample: info.number_of_samples,
        }
    }

    fn for_new(request: &WriteRequest<'_>, block_length_override: Option<i64>) -> Self {
        let (precision, saturation_steps) = match request.precision {
            Some(precision) => (normalize_precision(precision), 0),
            None => {
                let inferred = infer_precision(request.samples);
                (inferred.precision, inferred.saturation_steps)
            }
        };
        Self {
            segment: 0,
            create: true,
            precision,
            saturation_steps,
            scale_factor: scale_factor(precision),
            block_length: block_length_for(request.sampling_frequency, block_length_override),
            start_sample: 0,
        }
    }
}

/// Writes samples and annotations to one session.
///
/// The writer owns its engine and flushes it on [`close`](Self::close),
/// which also runs on drop.
///
/// # Example
///
/// ```rust
/// use mefkit_core::{SessionWriter, WriteRequest, WriterConfig};
/// use mefkit_storage::{Credentials, InMemoryEngine};
///
/// let mut writer =
///     SessionWriter::open(InMemoryEngine::new(), WriterConfig::default(), Credentials::none())
///         .unwrap();
///
/// let samples: Vec<f64> = (0..100).map(|i| f64::from(i) * 0.1).collect();
/// let outcome = writer
///     .write(&WriteRequest::new("eeg", &samples, 0, 100.0))
///     .unwrap();
/// assert!(outcome.is_written());
/// assert_eq!(writer.channel_info("eeg").unwrap().number_of_samples, 100);
///
/// writer.close().unwrap();
/// ```
pub struct SessionWriter {
    engine: Box<dyn StorageEngine>,
    config: WriterConfig,
    credentials: Credentials,
    cache: ChannelMetadataCache,
    is_open: bool,
}

impl SessionWriter {
    /// Opens a writer over `engine` and loads the channel metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the engine
    /// cannot be read.
    pub fn open(
        engine: impl StorageEngine + 'static,
        config: WriterConfig,
        credentials: Credentials,
    ) -> CoreResult<Self> {
        config.validate()?;
        let mut writer = Self {
            engine: Box::new(engine),
            config,
            credentials,
            cache: ChannelMetadataCache::new(),
            is_open: true,
        };
        writer.refresh()?;
        debug!(channels = writer.cache.len(), "session writer opened");
        Ok(writer)
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.is_open {
            Ok(())
        } else {
            Err(CoreError::SessionClosed)
        }
    }

    /// Rebuilds the channel metadata cache from the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed or the engine cannot be
    /// read.
    pub fn refresh(&mut self) -> CoreResult<()> {
        self.ensure_open()?;
        self.cache
            .refresh(self.engine.as_mut(), self.config.block_length)
    }

    /// Writes a sample buffer to a channel.
    ///
    /// Time-ordering and sampling-frequency conflicts are returned as
    /// [`WriteOutcome::Rejected`] and leave storage and cache untouched.
    ///
    /// # Errors
    ///
    /// Returns an error, without touching storage, if:
    /// - the writer was closed ([`CoreError::SessionClosed`])
    /// - the sampling frequency is not positive and finite
    ///   ([`CoreError::InvalidSamplingFrequency`])
    /// - the channel's block length is not positive, as for channels slower
    ///   than 0.1 Hz without a configured length
    ///   ([`CoreError::InvalidBlockLength`])
    /// - a planned interval falls outside the buffer
    ///   ([`CoreError::ShapeMismatch`])
    ///
    /// A storage error during dispatch is returned after the metadata cache
    /// is refreshed.
    pub fn write(&mut self, request: &WriteRequest<'_>) -> CoreResult<WriteOutcome> {
        self.ensure_open()?;

        let channel = request.channel;
        let sampling_frequency = request.sampling_frequency;
        if !sampling_frequency.is_finite() || sampling_frequency <= 0.0 {
            return Err(CoreError::InvalidSamplingFrequency {
                channel: channel.to_string(),
                sampling_frequency,
            });
        }
        let start_uutc = request.start_uutc;
        let end_uutc = request.resolved_end_uutc();
        if end_uutc < start_uutc {
            return Ok(self.reject(WriteRejection::EndBeforeStart {
                start_uutc,
                end_uutc,
            }));
        }

        let plan = match self.cache.get(channel) {
            Some(info) => {
                if start_uutc < info.end_time {
                    return Ok(self.reject(WriteRejection::OverlapsExistingData {
                        channel: channel.to_string(),
                        start_uutc,
                        channel_end: info.end_time,
                    }));
                }
                if sampling_frequency != info.sampling_frequency {
                    return Ok(self.reject(WriteRejection::SamplingFrequencyMismatch {
                        channel: channel.to_string(),
                        expected: info.sampling_frequency,
                        actual: sampling_frequency,
                    }));
                }
                if let Some(precision) = request.precision {
                    debug!(channel, precision, "precision ignored for existing channel");
                }
                SegmentPlan::for_existing(info, request.new_segment)
            }
            None => SegmentPlan::for_new(request, self.config.block_length),
        };
        if plan.block_length <= 0 {
            return Err(CoreError::InvalidBlockLength {
                channel: channel.to_string(),
                block_length: plan.block_length,
            });
        }

        let quantized = quantize(request.samples, i64::from(plan.precision));
        let intervals: Vec<Interval> = if request.discontinuity_handling {
            find_intervals(
                &validity_mask(request.samples),
                sampling_frequency,
                start_uutc,
                self.config.gap_tolerance.resolve(sampling_frequency),
            )
        } else {
            vec![Interval::whole(quantized.len(), start_uutc, end_uutc)]
        };
        let intervals: Vec<Interval> = intervals.into_iter().filter(|i| !i.is_empty()).collect();

        if let Some(bad) = intervals.iter().find(|i| i.stop_sample > quantized.len()) {
            return Err(CoreError::ShapeMismatch {
                start: bad.start_sample,
                stop: bad.stop_sample,
                len: quantized.len(),
            });
        }

        let (created_segment, samples_written) =
            match self.dispatch(channel, sampling_frequency, &plan, &quantized.samples, &intervals) {
                Ok(done) => done,
                Err(e) => {
                    // Earlier intervals may be stored; let the cache show them.
                    if let Err(refresh_error) = self.refresh() {
                        warn!(channel, error = %refresh_error, "refresh after failed write failed");
                    }
                    return Err(e);
                }
            };

        let refresh = request
            .refresh_metadata
            .unwrap_or(self.config.refresh_after_write);
        if created_segment || refresh {
            self.refresh()?;
        }

        debug!(
            channel,
            segment = plan.segment,
            intervals = intervals.len(),
            samples_written,
            "samples written"
        );
        Ok(WriteOutcome::Written(WriteSummary {
            channel: channel.to_string(),
            segment: plan.segment,
            created_segment,
            precision: plan.precision,
            saturation_steps: plan.saturation_steps,
            intervals: intervals.len(),
            samples_written,
        }))
    }

    /// Sends each interval to the engine. Returns whether a segment was
    /// created and how many samples were stored.
    fn dispatch(
        &mut self,
        channel: &str,
        sampling_frequency: f64,
        plan: &SegmentPlan,
        quantized: &[i32],
        intervals: &[Interval],
    ) -> CoreResult<(bool, usize)> {
        let mut created_segment = false;
        let mut samples_written = 0;
        for (i, interval) in intervals.iter().enumerate() {
            let samples = &quantized[interval.sample_range()];
            if i == 0 && plan.create {
                self.create_segment(channel, sampling_frequency, plan, interval)?;
                self.engine.write_segment_samples(
                    channel,
                    plan.segment,
                    &self.credentials,
                    plan.block_length,
                    samples,
                )?;
                created_segment = true;
            } else {
                self.engine.append_segment_samples(
                    channel,
                    plan.segment,
                    &self.credentials,
                    interval.start_uutc,
                    interval.stop_uutc,
                    plan.block_length,
                    samples,
                )?;
            }
            samples_written += samples.len();
        }
        Ok((created_segment, samples_written))
    }

    fn reject(&self, rejection: WriteRejection) -> WriteOutcome {
        warn!(%rejection, "write rejected");
        WriteOutcome::Rejected(rejection)
    }

    fn create_segment(
        &mut self,
        channel: &str,
        sampling_frequency: f64,
        plan: &SegmentPlan,
        interval: &Interval,
    ) -> CoreResult<()> {
        let segment_metadata = self.config.segment_metadata(SegmentFields {
            sampling_frequency,
            recording_duration: (interval.stop_uutc - interval.start_uutc) / 1_000_000,
            units_conversion_factor: plan.scale_factor,
            start_sample: plan.start_sample,
        });
        let recording_metadata = self.config.recording_metadata();
        self.engine.create_segment(
            channel,
            plan.segment,
            &self.credentials,
            interval.start_uutc,
            interval.stop_uutc,
            &segment_metadata,
            &recording_metadata,
        )?;
        info!(channel, segment = plan.segment, start_sample = plan.start_sample, "segment created");
        Ok(())
    }

    /// Adds annotation records to a channel, or to the session when
    /// `channel` is `None`.
    ///
    /// New records are stored ahead of the existing ones and the record
    /// set's time bounds cover both.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed, `records` is empty, the
    /// stored records cannot be read, or the engine refuses the write.
    pub fn write_annotations(
        &mut self,
        records: &[Annotation],
        channel: Option<&str>,
    ) -> CoreResult<()> {
        self.ensure_open()?;
        let previous = annotations::read_existing(self.engine.as_ref(), channel)?;
        let combined = combine(records, previous)?;
        self.engine.write_records(
            &self.credentials,
            combined.start_time,
            combined.end_time,
            self.config.record_offset,
            &combined.records,
            channel,
        )?;
        debug!(
            scope = channel.unwrap_or("<session>"),
            records = combined.records.len(),
            "annotations written"
        );
        Ok(())
    }

    /// Reads the annotation records of a channel or of the session. A
    /// scope without records gives an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SessionClosed`] after [`close`](Self::close).
    pub fn read_annotations(&self, channel: Option<&str>) -> CoreResult<Vec<Annotation>> {
        self.ensure_open()?;
        Ok(annotations::read_or_empty(self.engine.as_ref(), channel))
    }

    /// Cached metadata of a channel.
    #[must_use]
    pub fn channel_info(&self, channel: &str) -> Option<&ChannelInfo> {
        self.cache.get(channel)
    }

    /// Sorted names of the cached channels.
    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        self.cache.channels()
    }

    /// The writer's configuration.
    #[must_use]
    pub const fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// The underlying engine.
    #[must_use]
    pub fn engine(&self) -> &dyn StorageEngine {
        self.engine.as_ref()
    }

    /// Returns true until [`close`](Self::close) is called.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.is_open
    }

    /// Makes every write so far durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is closed or the engine cannot
    /// persist.
    pub fn flush(&mut self) -> CoreResult<()> {
        self.ensure_open()?;
        Ok(self.engine.flush()?)
    }

    /// Flushes the engine and closes the writer.
    ///
    /// Closing twice is a no-op. Every other operation fails with
    /// [`CoreError::SessionClosed`] afterwards.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the flush fails; the writer stays open
    /// in that case.
    pub fn close(&mut self) -> CoreResult<()> {
        if !self.is_open {
            return Ok(());
        }
        self.engine.flush()?;
        self.is_open = false;
        debug!("session writer closed");
        Ok(())
    }
}

impl Drop for SessionWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close session writer");
        }
    }
}
