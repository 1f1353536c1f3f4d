//! Event extraction and fixed-length epoching on a trigger channel

use crate::triggers::TriggerDictionary;
use serde::{Deserialize, Serialize};
use sync_core::{StreamChannelSet, SyncError, SyncResult};
use tracing::debug;

/// A trigger onset on a stim channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Sample index from the stream start
    pub sample: usize,
    pub code: i32,
}

/// Every 0 to non-zero transition on `channel`; the code is the new value
pub fn find_events(stream: &StreamChannelSet, channel: &str) -> SyncResult<Vec<Event>> {
    let data = &stream.channel(channel)?.data;
    let mut events = Vec::new();
    let mut previous = 0.0;
    for (sample, &value) in data.iter().enumerate() {
        if value != 0.0 && previous == 0.0 {
            events.push(Event {
                sample,
                code: value.round() as i32,
            });
        }
        previous = value;
    }
    debug!(stream = %stream.label, channel, count = events.len(), "events found");
    Ok(events)
}

/// Fixed-length window labelled with its event name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epoch {
    pub label: String,
    pub code: i32,
    /// First sample of the window
    pub start: usize,
    /// One past the last sample
    pub end: usize,
}

impl Epoch {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Window start in seconds from the stream start
    pub fn onset(&self, rate: f64) -> f64 {
        self.start as f64 / rate
    }
}

/// Cut each event segment into windows of `duration` seconds.
///
/// Windows start at the event and step by `duration - overlap`; a window is
/// only produced if it ends before the next event (or the stream end).
/// Events whose code has no name in `dictionary` are skipped.
pub fn create_epochs(
    stream: &StreamChannelSet,
    stim_channel: &str,
    dictionary: &TriggerDictionary,
    duration: f64,
    overlap: f64,
) -> SyncResult<Vec<Epoch>> {
    if !(duration > 0.0 && overlap >= 0.0 && overlap < duration) {
        return Err(SyncError::ConfigurationError {
            message: format!(
                "epoch duration {} and overlap {} must satisfy 0 <= overlap < duration",
                duration, overlap
            ),
        });
    }

    let rate = stream.sampling_rate();
    let window = (duration * rate).round() as usize;
    let step = ((duration - overlap) * rate).round() as usize;
    if window == 0 || step == 0 {
        return Err(SyncError::ConfigurationError {
            message: format!(
                "epoch of {}s with overlap {}s is shorter than one sample",
                duration, overlap
            ),
        });
    }

    let events = find_events(stream, stim_channel)?;
    let n = stream.n_samples();
    let mut epochs = Vec::new();
    for (i, event) in events.iter().enumerate() {
        let Some(label) = dictionary.name_of(event.code) else {
            debug!(code = event.code, sample = event.sample, "skipping unnamed event");
            continue;
        };
        let limit = events.get(i + 1).map_or(n, |next| next.sample);
        let mut start = event.sample;
        while start + window <= limit {
            epochs.push(Epoch {
                label: label.to_string(),
                code: event.code,
                start,
                end: start + window,
            });
            start += step;
        }
    }
    Ok(epochs)
}
