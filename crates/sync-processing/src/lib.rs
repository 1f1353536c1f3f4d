//! Sync-Processing: alignment and trigger synthesis for EEG/auxiliary recording pairs
//!
//! Loads trigger definitions and rotation schedules, locates the shared
//! synchronization onset, aligns both streams on the EEG clock and stamps a
//! synthetic trigger channel into the merged recording.

pub mod triggers;
pub mod sequence;
pub mod onset;
pub mod resample;
pub mod align;
pub mod synth;
pub mod merge;
pub mod epochs;
pub mod config;
pub mod pipeline;

pub use triggers::{TriggerCodebook, TriggerDictionary, TriggerSchema};
pub use sequence::{sequence_file_name, SequenceRow, SequenceTable};
pub use onset::{
    find_onset, find_stim_onset, locate_onset, OnsetMarker, OnsetSource, DEFAULT_ONSET_MARKER,
};
pub use resample::{resample_channel, resample_stream, resampled_len};
pub use align::{align, AlignedPair, AlignmentEngine, DEFAULT_PREROLL};
pub use synth::{
    synthesize, synthesize_buffer, Schedule, ScheduleStatus, SynthesizedTriggers,
    DEFAULT_TRIGGER_CHANNEL,
};
pub use merge::{merge, MergeOptions};
pub use epochs::{create_epochs, find_events, Epoch, Event};
pub use config::SyncConfig;
pub use pipeline::{SessionPlan, SyncOutput, SyncPipeline, SyncSummary};
