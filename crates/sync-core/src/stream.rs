//! StreamChannelSet: multichannel time series sharing one clock

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Physiological type of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelKind {
    Eeg,
    Ecg,
    Egg,
    Eog,
    Misc,
    /// Trigger/event channel holding integer codes
    Stim,
}

/// One named channel of samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub kind: ChannelKind,
    pub data: Vec<f64>,
}

impl Channel {
    pub fn new(name: impl Into<String>, kind: ChannelKind, data: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            kind,
            data,
        }
    }

    /// Number of samples in this channel
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Rescale the channel to Volts given its recorded unit.
    ///
    /// Only millivolt channels are rescaled; any other unit is left alone.
    pub fn scale_to_volts(&mut self, unit: &str) {
        if unit.trim().eq_ignore_ascii_case("mv") {
            self.data.iter_mut().for_each(|x| *x *= 1e-3);
        }
    }

    /// Basic statistics for this channel
    pub fn stats(&self) -> ChannelStats {
        ChannelStats::calculate(&self.data)
    }
}

/// Timed event attached to a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Onset in seconds, in recording time
    pub onset: f64,
    /// Duration in seconds
    pub duration: f64,
    pub description: String,
}

impl Annotation {
    pub fn new(onset: f64, duration: f64, description: impl Into<String>) -> Self {
        Self {
            onset,
            duration,
            description: description.into(),
        }
    }
}

/// Container for a multichannel recording with one sample rate and one time origin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChannelSet {
    /// Unique identifier for this stream instance
    pub id: Uuid,
    /// Human readable label ("eeg", "biopac", ...)
    pub label: String,
    sampling_rate: f64,
    /// Sample offset of the first retained sample from the recording start
    first_sample: i64,
    channels: Vec<Channel>,
    /// Annotations in stored order (not necessarily sorted)
    annotations: Vec<Annotation>,
}

impl StreamChannelSet {
    /// Create a stream; every channel must have the same length
    pub fn new(
        label: impl Into<String>,
        sampling_rate: f64,
        channels: Vec<Channel>,
    ) -> SyncResult<Self> {
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            return Err(SyncError::InvalidSamplingRate { rate: sampling_rate });
        }

        if let Some(first) = channels.first() {
            let expected = first.len();
            if let Some(bad) = channels.iter().find(|c| c.len() != expected) {
                return Err(SyncError::InvalidChannel {
                    reason: format!(
                        "channel '{}' has {} samples, expected {}",
                        bad.name,
                        bad.len(),
                        expected
                    ),
                });
            }
        }

        for (i, channel) in channels.iter().enumerate() {
            if channels[..i].iter().any(|c| c.name == channel.name) {
                return Err(SyncError::InvalidChannel {
                    reason: format!("duplicate channel name '{}'", channel.name),
                });
            }
        }

        Ok(StreamChannelSet {
            id: Uuid::new_v4(),
            label: label.into(),
            sampling_rate,
            first_sample: 0,
            channels,
            annotations: Vec::new(),
        })
    }

    /// Attach annotations (replacing any existing ones)
    pub fn with_annotations(mut self, annotations: Vec<Annotation>) -> Self {
        self.annotations = annotations;
        self
    }

    /// Set the recording-start sample offset
    pub fn with_first_sample(mut self, first_sample: i64) -> Self {
        self.first_sample = first_sample;
        self
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn first_sample(&self) -> i64 {
        self.first_sample
    }

    /// Number of samples per channel
    pub fn n_samples(&self) -> usize {
        self.channels.first().map_or(0, Channel::len)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_samples() == 0
    }

    /// Duration in seconds covered by the samples
    pub fn duration(&self) -> f64 {
        self.n_samples() as f64 / self.sampling_rate
    }

    /// Time of the last sample relative to the stream start
    pub fn last_time(&self) -> f64 {
        self.n_samples().saturating_sub(1) as f64 / self.sampling_rate
    }

    /// Time vector relative to the stream start
    pub fn times(&self) -> Vec<f64> {
        let dt = 1.0 / self.sampling_rate;
        (0..self.n_samples()).map(|i| i as f64 * dt).collect()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    /// Get a channel by name
    pub fn channel(&self, name: &str) -> SyncResult<&Channel> {
        self.channels
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| SyncError::ChannelNotFound { name: name.to_string() })
    }

    /// Get mutable channel by name
    pub fn channel_mut(&mut self, name: &str) -> SyncResult<&mut Channel> {
        self.channels
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| SyncError::ChannelNotFound { name: name.to_string() })
    }

    /// Remove every channel matching the predicate, returning how many went
    pub fn drop_channels_where<F: Fn(&Channel) -> bool>(&mut self, predicate: F) -> usize {
        let before = self.channels.len();
        self.channels.retain(|c| !predicate(c));
        before - self.channels.len()
    }

    /// Drop all annotations
    pub fn clear_annotations(&mut self) {
        self.annotations.clear();
    }

    /// Consume the stream and return its channels
    pub fn into_channels(self) -> Vec<Channel> {
        self.channels
    }

    /// Keep samples `[start, end)`.
    ///
    /// `first_sample` advances by `start`; annotations stay in recording
    /// time and those falling outside the retained window are removed.
    pub fn crop_samples(&self, start: usize, end: usize) -> SyncResult<StreamChannelSet> {
        let n = self.n_samples();
        if start >= end || end > n {
            return Err(SyncError::Alignment {
                reason: format!(
                    "invalid sample range [{}, {}) for {} with {} samples",
                    start, end, self.label, n
                ),
            });
        }

        let channels = self
            .channels
            .iter()
            .map(|c| Channel::new(c.name.clone(), c.kind, c.data[start..end].to_vec()))
            .collect();

        let first_sample = self.first_sample + start as i64;
        // Half a sample of slack so an onset that rounds onto the edge survives
        let half = 0.5 / self.sampling_rate;
        let t_start = first_sample as f64 / self.sampling_rate - half;
        let t_end = (first_sample + (end - start) as i64) as f64 / self.sampling_rate - half;
        let annotations = self
            .annotations
            .iter()
            .filter(|a| a.onset >= t_start && a.onset < t_end)
            .cloned()
            .collect();

        Ok(StreamChannelSet {
            id: self.id,
            label: self.label.clone(),
            sampling_rate: self.sampling_rate,
            first_sample,
            channels,
            annotations,
        })
    }

    /// Keep samples from time `tmin` (seconds from the stream start) to the end
    pub fn crop_from(&self, tmin: f64) -> SyncResult<StreamChannelSet> {
        let start = (tmin * self.sampling_rate).round().max(0.0) as usize;
        if start >= self.n_samples() {
            return Err(SyncError::Alignment {
                reason: format!(
                    "cropping {} at {:.4}s leaves no samples (duration {:.4}s)",
                    self.label,
                    tmin,
                    self.duration()
                ),
            });
        }
        self.crop_samples(start, self.n_samples())
    }

    /// Keep the first `n` samples
    pub fn truncate(&self, n: usize) -> SyncResult<StreamChannelSet> {
        self.crop_samples(0, n)
    }

    /// Build a new stream sharing metadata with this one but with other channels
    pub fn with_channels(
        &self,
        sampling_rate: f64,
        first_sample: i64,
        channels: Vec<Channel>,
    ) -> SyncResult<StreamChannelSet> {
        let mut stream = StreamChannelSet::new(self.label.clone(), sampling_rate, channels)?;
        stream.id = self.id;
        stream.first_sample = first_sample;
        stream.annotations = self.annotations.clone();
        Ok(stream)
    }
}

/// Basic statistics for a signal channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: f64,
    pub rms: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub peak_to_peak: f64,
}

impl ChannelStats {
    pub fn calculate(data: &[f64]) -> Self {
        if data.is_empty() {
            return Self {
                mean: 0.0,
                rms: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
                peak_to_peak: 0.0,
            };
        }

        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let rms = (data.iter().map(|x| x * x).sum::<f64>() / n).sqrt();

        let variance = data.iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>() / n;
        let std_dev = variance.sqrt();

        let min = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

        Self {
            mean,
            rms,
            std_dev,
            min,
            max,
            peak_to_peak: max - min,
        }
    }
}
