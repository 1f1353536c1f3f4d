//! Two-stream alignment on a shared synchronization onset
//!
//! Each call is one linear pass: crop both streams to start a fixed pre-roll
//! before their onsets, resample the auxiliary stream to the EEG rate, then
//! cut the longer stream down to the shorter one.

use crate::resample::{resample_stream, resampled_len};
use serde::{Deserialize, Serialize};
use sync_core::{StreamChannelSet, SyncError, SyncResult};
use tracing::{debug, info};

/// Lead-in kept before the onset, in seconds
pub const DEFAULT_PREROLL: f64 = 0.2;

/// Slack when comparing an onset against the pre-roll
const PREROLL_TOLERANCE: f64 = 1e-9;

/// Both streams after alignment: same rate, same sample count, same origin
#[derive(Debug, Clone)]
pub struct AlignedPair {
    pub eeg: StreamChannelSet,
    pub aux: StreamChannelSet,
}

impl AlignedPair {
    pub fn sampling_rate(&self) -> f64 {
        self.eeg.sampling_rate()
    }

    pub fn n_samples(&self) -> usize {
        self.eeg.n_samples()
    }
}

/// Alignment settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentEngine {
    preroll: f64,
}

impl Default for AlignmentEngine {
    fn default() -> Self {
        Self { preroll: DEFAULT_PREROLL }
    }
}

impl AlignmentEngine {
    pub fn new(preroll: f64) -> SyncResult<Self> {
        if !preroll.is_finite() || preroll < 0.0 {
            return Err(SyncError::ConfigurationError {
                message: format!(
                    "pre-roll must be a non-negative number of seconds, got {}",
                    preroll
                ),
            });
        }
        Ok(Self { preroll })
    }

    pub fn preroll(&self) -> f64 {
        self.preroll
    }

    /// Align `aux` onto `eeg` given each stream's onset in seconds.
    ///
    /// Time zero of both outputs is "onset minus pre-roll" in their original
    /// recording. Inputs are left untouched.
    pub fn align(
        &self,
        eeg: &StreamChannelSet,
        aux: &StreamChannelSet,
        eeg_onset: f64,
        aux_onset: f64,
    ) -> SyncResult<AlignedPair> {
        self.check_preroll(eeg, eeg_onset)?;
        self.check_preroll(aux, aux_onset)?;

        let eeg = eeg.crop_from(eeg_onset - self.preroll)?;
        let aux = aux.crop_from(aux_onset - self.preroll)?;
        debug!(
            eeg_samples = eeg.n_samples(),
            aux_samples = aux.n_samples(),
            "streams cropped to pre-roll"
        );

        if resampled_len(aux.n_samples(), aux.sampling_rate(), eeg.sampling_rate()) == 0 {
            return Err(SyncError::Alignment {
                reason: format!(
                    "{} keeps {} samples after cropping, none survive resampling to {}Hz",
                    aux.label,
                    aux.n_samples(),
                    eeg.sampling_rate()
                ),
            });
        }
        let aux = resample_stream(&aux, eeg.sampling_rate())?;

        let n = eeg.n_samples().min(aux.n_samples());
        if n == 0 {
            return Err(SyncError::Alignment {
                reason: "aligned streams have no overlapping samples".to_string(),
            });
        }
        let eeg = if eeg.n_samples() > n { eeg.truncate(n)? } else { eeg };
        let aux = if aux.n_samples() > n { aux.truncate(n)? } else { aux };

        info!(
            rate = eeg.sampling_rate(),
            samples = n,
            duration = eeg.duration(),
            "streams aligned"
        );
        Ok(AlignedPair { eeg, aux })
    }

    fn check_preroll(&self, stream: &StreamChannelSet, onset: f64) -> SyncResult<()> {
        if onset + PREROLL_TOLERANCE < self.preroll {
            return Err(SyncError::InsufficientPreRoll {
                stream: stream.label.clone(),
                onset,
                preroll: self.preroll,
            });
        }
        Ok(())
    }
}

/// Align with an explicit pre-roll; see [`AlignmentEngine::align`]
pub fn align(
    eeg: &StreamChannelSet,
    aux: &StreamChannelSet,
    eeg_onset: f64,
    aux_onset: f64,
    preroll: f64,
) -> SyncResult<AlignedPair> {
    AlignmentEngine::new(preroll)?.align(eeg, aux, eeg_onset, aux_onset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::{Annotation, Channel, ChannelKind};

    fn eeg_stream(n: usize, rate: f64) -> StreamChannelSet {
        let data = (0..n).map(|i| (i as f64 * 0.01).sin()).collect();
        StreamChannelSet::new("eeg", rate, vec![Channel::new("Fz", ChannelKind::Eeg, data)])
            .unwrap()
            .with_annotations(vec![Annotation::new(3.0, 0.0, "Stimulus/s1")])
    }

    fn aux_stream(n: usize, rate: f64) -> StreamChannelSet {
        let data = (0..n).map(|i| (i as f64 * 0.003).cos()).collect();
        let ecg = Channel::new("ECG", ChannelKind::Ecg, data);
        StreamChannelSet::new("biopac", rate, vec![ecg]).unwrap()
    }

    #[test]
    fn test_align_equalizes_rate_and_length() {
        let eeg = eeg_stream(10_000, 500.0); // 20 s
        let aux = aux_stream(30_000, 2000.0); // 15 s
        let pair = align(&eeg, &aux, 3.0, 1.0, 0.2).unwrap();

        assert_eq!(pair.eeg.sampling_rate(), 500.0);
        assert_eq!(pair.aux.sampling_rate(), 500.0);
        // eeg keeps 17.2 s, aux keeps 14.2 s -> both cut to the aux length
        assert_eq!(pair.aux.n_samples(), 7100);
        assert_eq!(pair.eeg.n_samples(), 7100);
        assert_eq!(pair.eeg.first_sample(), 1400);
        assert_eq!(pair.eeg.channel("Fz").unwrap().data[0], eeg.channel("Fz").unwrap().data[1400]);
    }

    #[test]
    fn test_align_crops_eeg_when_aux_is_longer() {
        let eeg = eeg_stream(2_500, 500.0); // 5 s
        let aux = aux_stream(40_000, 2000.0); // 20 s
        let pair = align(&eeg, &aux, 3.0, 1.0, 0.2).unwrap();
        // eeg keeps 2.2 s
        assert_eq!(pair.eeg.n_samples(), 1100);
        assert_eq!(pair.aux.n_samples(), 1100);
    }

    #[test]
    fn test_align_is_deterministic() {
        let eeg = eeg_stream(10_000, 500.0);
        let aux = aux_stream(30_000, 2000.0);
        let first = align(&eeg, &aux, 3.0, 1.0, 0.2).unwrap();
        let second = align(&eeg, &aux, 3.0, 1.0, 0.2).unwrap();

        assert_eq!(first.eeg.channels(), second.eeg.channels());
        assert_eq!(first.aux.channels(), second.aux.channels());
        assert_eq!(first.eeg.first_sample(), second.eeg.first_sample());
    }

    #[test]
    fn test_preroll_boundary() {
        let eeg = eeg_stream(10_000, 500.0);
        let aux = aux_stream(30_000, 2000.0);

        let err = align(&eeg, &aux, 0.19, 1.0, 0.2).unwrap_err();
        assert!(matches!(
            err,
            SyncError::InsufficientPreRoll { ref stream, .. } if stream == "eeg"
        ));

        let err = align(&eeg, &aux, 3.0, 0.1, 0.2).unwrap_err();
        assert!(matches!(
            err,
            SyncError::InsufficientPreRoll { ref stream, .. } if stream == "biopac"
        ));

        let pair = align(&eeg, &aux, 0.2, 0.2, 0.2).unwrap();
        assert_eq!(pair.eeg.first_sample(), 0);
        assert_eq!(pair.aux.first_sample(), 0);
    }

    #[test]
    fn test_onset_past_end_fails() {
        let eeg = eeg_stream(1_000, 500.0); // 2 s
        let aux = aux_stream(30_000, 2000.0);
        let err = align(&eeg, &aux, 2.5, 1.0, 0.2).unwrap_err();
        assert!(matches!(err, SyncError::Alignment { .. }));
    }

    #[test]
    fn test_aux_crop_too_short_to_resample() {
        let eeg = eeg_stream(10_000, 500.0);
        // cropping at 0.5 s leaves one 2000 Hz sample, a quarter sample at 500 Hz
        let aux = aux_stream(1_001, 2000.0);
        let err = align(&eeg, &aux, 3.0, 0.7, 0.2).unwrap_err();
        assert!(matches!(err, SyncError::Alignment { .. }), "{err:?}");
    }

    #[test]
    fn test_inputs_untouched() {
        let eeg = eeg_stream(10_000, 500.0);
        let aux = aux_stream(30_000, 2000.0);
        let _ = align(&eeg, &aux, 3.0, 1.0, 0.2).unwrap();
        assert_eq!(eeg.n_samples(), 10_000);
        assert_eq!(aux.n_samples(), 30_000);
        assert_eq!(aux.sampling_rate(), 2000.0);
    }

    #[test]
    fn test_negative_preroll_rejected() {
        assert!(AlignmentEngine::new(-0.1).is_err());
        assert_eq!(AlignmentEngine::default().preroll(), DEFAULT_PREROLL);
    }
}
