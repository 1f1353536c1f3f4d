//! Synthetic EEG/auxiliary recording pairs with a shared synchronization pulse

use crate::signal_patterns::SignalPattern;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use sync_core::{Annotation, Channel, ChannelKind, StreamChannelSet, SyncError, SyncResult};

/// Configuration for one simulated recording pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// EEG sampling rate in Hz
    pub eeg_rate: f64,
    /// Auxiliary sampling rate in Hz
    pub aux_rate: f64,
    /// EEG channel names; `EOG` is typed as an ocular channel
    pub eeg_channels: Vec<String>,
    /// EEG recording length in seconds
    pub eeg_duration: f64,
    /// Auxiliary recording length in seconds
    pub aux_duration: f64,
    /// Time of the synchronization pulse in the EEG clock
    pub eeg_onset: f64,
    /// Time of the synchronization pulse in the auxiliary clock
    pub aux_onset: f64,
    /// Annotation written at the EEG onset
    pub onset_marker: String,
    /// Digital trigger line of the auxiliary recording
    pub pulse_channel: String,
    /// Value held on the trigger line during the pulse
    pub pulse_code: f64,
    /// Pulse length in seconds
    pub pulse_width: f64,
    /// Gaussian noise std on EEG channels (Volts)
    pub eeg_noise_std: f64,
    /// Gaussian noise std on ECG/EGG channels (millivolts)
    pub aux_noise_std: f64,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            eeg_rate: 500.0,
            aux_rate: 2000.0,
            eeg_channels: ["Fz", "Cz", "Pz", "Oz", "M1", "M2", "EOG"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            eeg_duration: 30.0,
            aux_duration: 32.0,
            eeg_onset: 2.0,
            aux_onset: 3.5,
            onset_marker: "Stimulus/s1".to_string(),
            pulse_channel: "STI-Biopac".to_string(),
            pulse_code: 5.0,
            pulse_width: 0.05,
            eeg_noise_std: 2e-6,
            aux_noise_std: 0.02,
            seed: None,
        }
    }
}

impl RecordingConfig {
    fn validate(&self) -> SyncResult<()> {
        if self.eeg_onset < 0.0 || self.eeg_onset >= self.eeg_duration {
            return Err(SyncError::SimulationError {
                message: format!(
                    "EEG onset {}s must fall inside the {}s recording",
                    self.eeg_onset, self.eeg_duration
                ),
            });
        }
        if self.aux_onset < 0.0 || self.aux_onset >= self.aux_duration {
            return Err(SyncError::SimulationError {
                message: format!(
                    "Auxiliary onset {}s must fall inside the {}s recording",
                    self.aux_onset, self.aux_duration
                ),
            });
        }
        if self.pulse_code == 0.0 {
            return Err(SyncError::SimulationError {
                message: "Pulse code must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

/// EEG stream and auxiliary stream recorded side by side
#[derive(Debug, Clone)]
pub struct SimulatedPair {
    pub eeg: StreamChannelSet,
    pub aux: StreamChannelSet,
}

/// Recording pair simulator
pub struct RecordingSimulator {
    config: RecordingConfig,
    rng: StdRng,
    eeg_noise: Normal<f64>,
    aux_noise: Normal<f64>,
}

impl RecordingSimulator {
    /// Create new simulator with configuration
    pub fn new(config: RecordingConfig) -> SyncResult<Self> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default()
        });

        let normal = |std: f64| {
            Normal::new(0.0, std).map_err(|e| SyncError::SimulationError {
                message: format!("Failed to create normal distribution: {}", e),
            })
        };

        Ok(Self {
            eeg_noise: normal(config.eeg_noise_std)?,
            aux_noise: normal(config.aux_noise_std)?,
            rng: StdRng::seed_from_u64(seed),
            config,
        })
    }

    pub fn config(&self) -> &RecordingConfig {
        &self.config
    }

    /// Generate one recording pair
    pub fn generate(&mut self) -> SyncResult<SimulatedPair> {
        let eeg = self.generate_eeg()?;
        let aux = self.generate_aux()?;
        Ok(SimulatedPair { eeg, aux })
    }

    fn generate_eeg(&mut self) -> SyncResult<StreamChannelSet> {
        let rate = self.config.eeg_rate;
        let n = (self.config.eeg_duration * rate).round() as usize;

        let names = self.config.eeg_channels.clone();
        let channels = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let kind = if name.eq_ignore_ascii_case("EOG") {
                    ChannelKind::Eog
                } else {
                    ChannelKind::Eeg
                };
                let pattern = SignalPattern::cortical(i as f64 * 0.7);
                let mut data = pattern.sample(n, rate);
                self.add_noise(&mut data, true);
                Channel::new(name, kind, data)
            })
            .collect();

        let annotations = vec![
            Annotation::new(0.0, 0.0, "New Segment/"),
            Annotation::new(self.config.eeg_onset, 0.0, self.config.onset_marker.clone()),
        ];
        Ok(StreamChannelSet::new("eeg", rate, channels)?.with_annotations(annotations))
    }

    fn generate_aux(&mut self) -> SyncResult<StreamChannelSet> {
        let rate = self.config.aux_rate;
        let n = (self.config.aux_duration * rate).round() as usize;

        let mut ecg = SignalPattern::ecg().sample(n, rate);
        self.add_noise(&mut ecg, false);
        let mut egg = SignalPattern::egg().sample(n, rate);
        self.add_noise(&mut egg, false);

        let mut pulse = vec![0.0; n];
        let start = (self.config.aux_onset * rate).round() as usize;
        let width = ((self.config.pulse_width * rate).round() as usize).max(1);
        let end = (start + width).min(n);
        pulse[start..end].iter_mut().for_each(|x| *x = self.config.pulse_code);

        let channels = vec![
            Channel::new("ECG", ChannelKind::Ecg, ecg),
            Channel::new("EGG", ChannelKind::Egg, egg),
            Channel::new(self.config.pulse_channel.clone(), ChannelKind::Stim, pulse),
        ];
        StreamChannelSet::new("biopac", rate, channels)
    }

    fn add_noise(&mut self, data: &mut [f64], eeg: bool) {
        let dist = if eeg { self.eeg_noise } else { self.aux_noise };
        for x in data.iter_mut() {
            *x += dist.sample(&mut self.rng);
        }
    }
}
