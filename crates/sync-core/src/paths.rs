//! Participant/session addressed layout of raw recordings and derivatives

use crate::error::{SyncError, SyncResult};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Raw input files for one participant/session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingPaths {
    /// EEG header file (the data file sits next to it)
    pub eeg_header: PathBuf,
    /// Auxiliary (Biopac) recording
    pub aux: PathBuf,
}

/// Root folder holding `raw/`, `raw_aux/` and `derivatives/`
#[derive(Debug, Clone)]
pub struct RecordingLayout {
    root: PathBuf,
}

impl RecordingLayout {
    /// Create a layout rooted at an existing directory
    pub fn new(root: impl Into<PathBuf>) -> SyncResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(SyncError::InvalidRecording {
                reason: format!("root folder {} does not exist", root.display()),
            });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Paths of the EEG header and auxiliary recording.
    ///
    /// Missing files are reported as warnings; the reader decides whether
    /// that is fatal.
    pub fn raw_paths(&self, participant: u32, session: u32) -> SyncResult<RecordingPaths> {
        check_participant_session(participant, session)?;
        let participant_dir = participant_folder(participant);

        let eeg_header = self
            .root
            .join("raw")
            .join(&participant_dir)
            .join(format!("S{}", session))
            .join("eeg")
            .join("experiment.vhdr");
        if !eeg_header.exists() {
            warn!("The EEG file {} does not exist.", eeg_header.display());
        }

        let aux = self
            .root
            .join("raw_aux")
            .join(&participant_dir)
            .join(format!("S{}", session))
            .join("experiment.acq");
        if !aux.exists() {
            warn!("The Biopac file {} does not exist.", aux.display());
        }

        Ok(RecordingPaths { eeg_header, aux })
    }

    /// File name stem for derivatives of a participant/session.
    ///
    /// The participant folder is created if needed.
    pub fn derivative_stem(&self, participant: u32, session: u32) -> SyncResult<PathBuf> {
        check_participant_session(participant, session)?;
        let participant_dir = participant_folder(participant);
        let folder = self.root.join("derivatives").join(&participant_dir);
        std::fs::create_dir_all(&folder).map_err(|e| SyncError::io(&folder, e))?;
        Ok(folder.join(format!("{}_S{}", participant_dir, session)))
    }
}

fn participant_folder(participant: u32) -> String {
    format!("P{:02}", participant)
}

/// Participant IDs run from 1 to 99, sessions from 1 to 4
pub fn check_participant_session(participant: u32, session: u32) -> SyncResult<()> {
    if !(1..=99).contains(&participant) {
        return Err(SyncError::InvalidRecording {
            reason: format!(
                "the participant ID should be set between 1 and 99, {} is not valid",
                participant
            ),
        });
    }
    if !(1..=4).contains(&session) {
        return Err(SyncError::InvalidRecording {
            reason: format!(
                "the session ID should be set between 1 and 4, {} is not valid",
                session
            ),
        });
    }
    Ok(())
}
