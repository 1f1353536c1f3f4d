//! Sync-Core: Foundation types for two-stream biosignal synchronization
//!
//! Multichannel streams, rotation axis combinations, recording layout and
//! the shared error type.

pub mod stream;
pub mod rotation;
pub mod paths;
pub mod error;

pub use stream::*;
pub use rotation::*;
pub use paths::{RecordingLayout, RecordingPaths, check_participant_session};
pub use error::{SyncError, SyncResult};
