//! Configuration for the synchronization pipeline

use crate::align::{AlignmentEngine, DEFAULT_PREROLL};
use crate::merge::MergeOptions;
use crate::onset::OnsetSource;
use crate::synth::DEFAULT_TRIGGER_CHANNEL;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use sync_core::{check_rotation_axes, RotationAxis, SyncError, SyncResult};

/// Settings for one synchronization run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds kept before the synchronization onset
    pub preroll_seconds: f64,
    /// Where the EEG onset is read from
    pub eeg_onset: OnsetSource,
    /// Where the auxiliary onset is read from
    pub aux_onset: OnsetSource,
    /// Reference and ocular channels removed from the EEG before alignment
    pub eeg_drop_channels: Vec<String>,
    /// Recorded unit per auxiliary channel; millivolt channels are rescaled to Volts
    pub aux_units: BTreeMap<String, String>,
    /// Auxiliary trigger line, removed when merging
    pub aux_placeholder_channel: String,
    /// Name of the synthesized trigger channel
    pub trigger_channel: String,
    /// Session recorded without rotations
    pub baseline_session: u32,
    /// Axes considered when resolving schedule rows
    pub rotation_axes: Vec<RotationAxis>,
    /// Directory holding `session{N}-{axes}.csv` schedules
    pub sequence_dir: Option<PathBuf>,
    /// Trigger definition file; the built-in table is used when unset
    pub triggers_path: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            preroll_seconds: DEFAULT_PREROLL,
            eeg_onset: OnsetSource::default(),
            aux_onset: OnsetSource::StimChannel {
                channel: "STI-Biopac".to_string(),
            },
            eeg_drop_channels: vec!["M1".to_string(), "M2".to_string(), "EOG".to_string()],
            aux_units: [("ECG", "mV"), ("EGG", "mV")]
                .into_iter()
                .map(|(c, u)| (c.to_string(), u.to_string()))
                .collect(),
            aux_placeholder_channel: "STI-Biopac".to_string(),
            trigger_channel: DEFAULT_TRIGGER_CHANNEL.to_string(),
            baseline_session: 2,
            rotation_axes: RotationAxis::ALL.to_vec(),
            sequence_dir: None,
            triggers_path: None,
        }
    }
}

impl SyncConfig {
    /// Default settings reading schedules from `dir`
    pub fn with_sequence_dir(dir: impl Into<PathBuf>) -> Self {
        SyncConfig {
            sequence_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Validate entire configuration
    pub fn validate(&self) -> SyncResult<()> {
        if !self.preroll_seconds.is_finite() || self.preroll_seconds < 0.0 {
            return Err(SyncError::ConfigurationError {
                message: format!("Pre-roll must be non-negative, got {}", self.preroll_seconds),
            });
        }

        if self.trigger_channel.trim().is_empty() {
            return Err(SyncError::ConfigurationError {
                message: "Trigger channel name must not be empty".to_string(),
            });
        }

        if self.eeg_drop_channels.contains(&self.trigger_channel) {
            return Err(SyncError::ConfigurationError {
                message: format!(
                    "Trigger channel '{}' is also listed as an EEG channel to drop",
                    self.trigger_channel
                ),
            });
        }

        if !(1..=4).contains(&self.baseline_session) {
            return Err(SyncError::ConfigurationError {
                message: format!("Baseline session {} is outside 1..=4", self.baseline_session),
            });
        }

        let names: Vec<&str> = self.rotation_axes.iter().map(RotationAxis::name).collect();
        check_rotation_axes(&names).map_err(|e| SyncError::ConfigurationError {
            message: format!("Rotation axes invalid: {}", e),
        })?;

        Ok(())
    }

    /// Rotation axes, sorted and checked
    pub fn axes(&self) -> SyncResult<Vec<RotationAxis>> {
        let names: Vec<&str> = self.rotation_axes.iter().map(RotationAxis::name).collect();
        check_rotation_axes(&names)
    }

    pub fn alignment_engine(&self) -> SyncResult<AlignmentEngine> {
        AlignmentEngine::new(self.preroll_seconds)
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            aux_placeholder_channel: self.aux_placeholder_channel.clone(),
            trigger_channel: self.trigger_channel.clone(),
        }
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> SyncResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SyncError::ConfigurationError {
            message: format!("Failed to serialize configuration: {}", e),
        })
    }

    /// Import configuration from JSON
    pub fn from_json(json: &str) -> SyncResult<Self> {
        serde_json::from_str(json).map_err(|e| SyncError::ConfigurationError {
            message: format!("Failed to deserialize configuration: {}", e),
        })
    }

    /// Read and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        let config = Self::from_json(&json)?;
        config.validate()?;
        Ok(config)
    }
}
