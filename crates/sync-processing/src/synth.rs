//! Synthetic trigger channel
//!
//! Turns a rotation schedule into a stim channel whose non-zero samples mark
//! the start of each segment, counted from the synchronization onset.

use crate::align::AlignedPair;
use crate::sequence::SequenceTable;
use serde::{Deserialize, Serialize};
use sync_core::{alignment_error, Channel, ChannelKind, SyncError, SyncResult};
use tracing::{debug, warn};

/// Default name of the synthesized channel
pub const DEFAULT_TRIGGER_CHANNEL: &str = "STI";

/// What to stamp into the trigger channel
#[derive(Debug, Clone, Copy)]
pub enum Schedule<'a> {
    /// A single code at the onset
    Baseline { code: i32 },
    /// One code per row, each placed after the previous row's duration
    Sequence(&'a SequenceTable),
}

/// Whether the whole schedule fit inside the recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScheduleStatus {
    Complete,
    /// The recording ended before the schedule did
    Truncated { rows_written: usize, rows_total: usize },
}

impl ScheduleStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, ScheduleStatus::Complete)
    }
}

#[derive(Debug, Clone)]
pub struct SynthesizedTriggers {
    pub channel: Channel,
    pub status: ScheduleStatus,
}

/// Build a trigger buffer of `n_samples` at `rate` Hz.
///
/// Sequence rows are written at a cursor that starts at `onset_sample` and
/// advances by `round(duration * rate)` per row. Writing stops as soon as the
/// cursor leaves the buffer; the schedule is complete only if the cursor
/// after the last row is still within `n_samples`.
pub fn synthesize_buffer(
    n_samples: usize,
    rate: f64,
    onset_sample: usize,
    schedule: &Schedule<'_>,
    channel_name: &str,
) -> SyncResult<SynthesizedTriggers> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(SyncError::InvalidSamplingRate { rate });
    }
    if onset_sample >= n_samples {
        return Err(alignment_error!(
            "onset sample {} lies outside the aligned recording of {} samples",
            onset_sample,
            n_samples
        ));
    }

    let mut buffer = vec![0.0; n_samples];
    let status = match schedule {
        Schedule::Baseline { code } => {
            buffer[onset_sample] = *code as f64;
            ScheduleStatus::Complete
        }
        Schedule::Sequence(table) => {
            let mut cursor = onset_sample;
            let mut rows_written = 0;
            for row in table.iter() {
                if cursor >= n_samples {
                    break;
                }
                buffer[cursor] = row.trigger_code as f64;
                rows_written += 1;
                // float-to-int casts saturate; an unreachable step parks the cursor past the end
                cursor = cursor.saturating_add((row.duration_seconds * rate).round() as usize);
            }

            if rows_written == table.len() && cursor <= n_samples {
                ScheduleStatus::Complete
            } else {
                warn!(
                    rows_written,
                    rows_total = table.len(),
                    end_sample = cursor,
                    n_samples,
                    "rotation schedule runs past the end of the recording"
                );
                ScheduleStatus::Truncated {
                    rows_written,
                    rows_total: table.len(),
                }
            }
        }
    };

    debug!(channel = channel_name, onset_sample, ?status, "trigger channel synthesized");
    Ok(SynthesizedTriggers {
        channel: Channel::new(channel_name, ChannelKind::Stim, buffer),
        status,
    })
}

/// Synthesize a trigger channel matching the aligned pair
pub fn synthesize(
    aligned: &AlignedPair,
    onset_sample: usize,
    schedule: &Schedule<'_>,
    channel_name: &str,
) -> SyncResult<SynthesizedTriggers> {
    synthesize_buffer(
        aligned.n_samples(),
        aligned.sampling_rate(),
        onset_sample,
        schedule,
        channel_name,
    )
}
