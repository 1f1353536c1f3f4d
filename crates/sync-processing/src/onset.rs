//! Synchronization onset detection
//!
//! The EEG stream carries the shared pulse as an annotation; the auxiliary
//! stream carries it on a digital trigger line. Both are reduced to a single
//! onset in the stream's own time base.

use serde::{Deserialize, Serialize};
use sync_core::{StreamChannelSet, SyncError, SyncResult};
use tracing::debug;

/// Annotation written by the EEG amplifier when the paradigm starts
pub const DEFAULT_ONSET_MARKER: &str = "Stimulus/s1";

/// Position of the synchronization pulse
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OnsetMarker {
    /// Sample index, corrected for the recording-start offset
    Sample(i64),
    /// Seconds, in recording time when read from an annotation
    Seconds(f64),
}

impl OnsetMarker {
    /// Onset as a sample index, converting seconds with `rate` if needed
    pub fn as_sample(&self, rate: f64) -> i64 {
        match *self {
            OnsetMarker::Sample(s) => s,
            OnsetMarker::Seconds(t) => (t * rate).round() as i64,
        }
    }

    /// Onset in seconds, converting samples with `rate` if needed
    pub fn as_seconds(&self, rate: f64) -> f64 {
        match *self {
            OnsetMarker::Sample(s) => s as f64 / rate,
            OnsetMarker::Seconds(t) => t,
        }
    }
}

/// Where the onset of a stream is read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OnsetSource {
    /// First annotation with this description
    Annotation { marker: String },
    /// First rising edge on this stim channel
    StimChannel { channel: String },
}

impl Default for OnsetSource {
    fn default() -> Self {
        OnsetSource::Annotation {
            marker: DEFAULT_ONSET_MARKER.to_string(),
        }
    }
}

/// Find the first annotation labelled `marker`.
///
/// Annotations are scanned in stored order and the first match wins. With
/// `as_samples` the onset becomes `round(onset * rate) - first_sample`,
/// otherwise the onset is returned in seconds unmodified.
pub fn find_onset(
    stream: &StreamChannelSet,
    marker: &str,
    as_samples: bool,
) -> SyncResult<OnsetMarker> {
    let annotation = stream
        .annotations()
        .iter()
        .find(|a| a.description == marker)
        .ok_or_else(|| SyncError::OnsetNotFound { marker: marker.to_string() })?;

    let onset = if as_samples {
        let index =
            (annotation.onset * stream.sampling_rate()).round() as i64 - stream.first_sample();
        OnsetMarker::Sample(index)
    } else {
        OnsetMarker::Seconds(annotation.onset)
    };
    debug!(stream = %stream.label, marker, ?onset, "annotation onset located");
    Ok(onset)
}

/// Time in seconds, from the stream start, of the first 0 to non-zero
/// transition on a stim channel. A non-zero first sample counts as an onset.
pub fn find_stim_onset(stream: &StreamChannelSet, channel: &str) -> SyncResult<f64> {
    let data = &stream.channel(channel)?.data;
    let mut previous = 0.0;
    for (i, &value) in data.iter().enumerate() {
        if value != 0.0 && previous == 0.0 {
            let onset = i as f64 / stream.sampling_rate();
            debug!(stream = %stream.label, channel, sample = i, onset, "stim onset located");
            return Ok(onset);
        }
        previous = value;
    }
    Err(SyncError::OnsetNotFound { marker: channel.to_string() })
}

/// Onset in seconds from the stream start for the configured source.
///
/// Annotations live in recording time, so they are snapped to the sample grid
/// and shifted by the stream's `first_sample`.
pub fn locate_onset(stream: &StreamChannelSet, source: &OnsetSource) -> SyncResult<f64> {
    match source {
        OnsetSource::Annotation { marker } => {
            Ok(find_onset(stream, marker, true)?.as_seconds(stream.sampling_rate()))
        }
        OnsetSource::StimChannel { channel } => find_stim_onset(stream, channel),
    }
}
