//! Error handling for the stream synchronization framework
//!
//! Every failure is deterministic (bad data or bad configuration), so each
//! variant carries enough context to tell which precondition failed.

use core::fmt;

/// Result type alias for synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Error type for all synchronization operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SyncError {
    /// Required trigger key absent from the trigger definition
    MissingKey {
        /// Name of the first missing key
        key: String,
    },

    /// Axis combination with no matching trigger code
    UnknownCombo {
        /// Trigger key the combination resolved to
        combo: String,
    },

    /// Synchronization marker absent from a stream
    OnsetNotFound {
        /// Annotation description or stim channel that was searched
        marker: String,
    },

    /// Onset too close to the start of the recording to keep the pre-roll
    InsufficientPreRoll {
        /// Stream label
        stream: String,
        /// Onset in seconds
        onset: f64,
        /// Requested pre-roll in seconds
        preroll: f64,
    },

    /// Cropping or onset placement left nothing to work with
    Alignment {
        /// Description of the alignment failure
        reason: String,
    },

    /// Streams disagree on sample rate or sample count
    ShapeMismatch {
        /// Which inputs disagree and how
        reason: String,
    },

    /// Malformed declarative source (trigger INI, sequence CSV)
    Parse {
        /// Source name (usually a file path)
        source: String,
        /// 1-based line number
        line: usize,
        /// Description of the problem
        reason: String,
    },

    /// File system failure
    Io {
        /// Path involved
        path: String,
        /// Underlying error message
        reason: String,
    },

    /// Channel layout problem (length mismatch, duplicate name)
    InvalidChannel {
        /// Description of the channel problem
        reason: String,
    },

    /// Channel lookup by name failed
    ChannelNotFound {
        /// Requested channel name
        name: String,
    },

    /// Non-positive or non-finite sampling rate
    InvalidSamplingRate {
        /// Provided sampling rate
        rate: f64,
    },

    /// Participant/session addressing error
    InvalidRecording {
        /// Description of the addressing problem
        reason: String,
    },

    /// Rotation axis list is empty, duplicated or unknown
    InvalidRotationAxes {
        /// Description of the axis problem
        reason: String,
    },

    /// Rate conversion failure
    Resample {
        /// Description of the resampling failure
        reason: String,
    },

    /// Pipeline configuration error
    ConfigurationError {
        /// Description of the configuration error
        message: String,
    },

    /// Synthetic recording generation failure
    SimulationError {
        message: String,
    },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::MissingKey { key } => {
                write!(f, "Key '{}' is missing from trigger definition", key)
            }
            SyncError::UnknownCombo { combo } => {
                write!(f, "Axis combination '{}' has no trigger code", combo)
            }
            SyncError::OnsetNotFound { marker } => {
                write!(f, "Onset marker '{}' was not found in the recording", marker)
            }
            SyncError::InsufficientPreRoll { stream, onset, preroll } => {
                write!(f, "Onset of {} at {:.4}s leaves less than the {:.4}s pre-roll",
                       stream, onset, preroll)
            }
            SyncError::Alignment { reason } => {
                write!(f, "Alignment error: {}", reason)
            }
            SyncError::ShapeMismatch { reason } => {
                write!(f, "Shape mismatch: {}", reason)
            }
            SyncError::Parse { source, line, reason } => {
                write!(f, "Parse error in {} line {}: {}", source, line, reason)
            }
            SyncError::Io { path, reason } => {
                write!(f, "I/O error on {}: {}", path, reason)
            }
            SyncError::InvalidChannel { reason } => {
                write!(f, "Invalid channel: {}", reason)
            }
            SyncError::ChannelNotFound { name } => {
                write!(f, "Channel '{}' not found", name)
            }
            SyncError::InvalidSamplingRate { rate } => {
                write!(f, "Invalid sampling rate: {}Hz", rate)
            }
            SyncError::InvalidRecording { reason } => {
                write!(f, "Invalid recording: {}", reason)
            }
            SyncError::InvalidRotationAxes { reason } => {
                write!(f, "Invalid rotation axes: {}", reason)
            }
            SyncError::Resample { reason } => {
                write!(f, "Resampling error: {}", reason)
            }
            SyncError::ConfigurationError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            SyncError::SimulationError { message } => {
                write!(f, "Simulation error: {}", message)
            }
        }
    }
}

impl std::error::Error for SyncError {}

impl SyncError {
    /// Wrap an I/O error with the path that produced it
    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        SyncError::Io {
            path: path.as_ref().display().to_string(),
            reason: err.to_string(),
        }
    }
}

/// Convenience macro for creating alignment errors
#[macro_export]
macro_rules! alignment_error {
    ($($arg:tt)+) => {
        $crate::error::SyncError::Alignment {
            reason: format!($($arg)+)
        }
    };
}

/// Convenience macro for creating shape mismatch errors
#[macro_export]
macro_rules! shape_error {
    ($($arg:tt)+) => {
        $crate::error::SyncError::ShapeMismatch {
            reason: format!($($arg)+)
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SyncError::MissingKey { key: "start".to_string() };
        let display = format!("{}", error);
        assert!(display.contains("Key 'start' is missing"));

        let error = SyncError::InsufficientPreRoll {
            stream: "eeg".to_string(),
            onset: 0.1,
            preroll: 0.2,
        };
        let display = format!("{}", error);
        assert!(display.contains("eeg"));
        assert!(display.contains("0.2000"));
    }

    #[test]
    fn test_error_macros() {
        let error = alignment_error!("stream {} is empty", "aux");
        assert_eq!(error, SyncError::Alignment { reason: "stream aux is empty".to_string() });

        let error = shape_error!("{} vs {}", 1000, 999);
        assert!(error.to_string().contains("1000 vs 999"));
    }

    #[test]
    fn test_error_equality() {
        let error1 = SyncError::OnsetNotFound { marker: "Stimulus/s1".to_string() };
        let error2 = SyncError::OnsetNotFound { marker: "Stimulus/s1".to_string() };
        assert_eq!(error1, error2);
    }
}
