//! Deterministic waveform shapes for synthetic physiological channels

use std::f64::consts::PI;

/// Noise-free waveform evaluated at a time in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalPattern {
    /// Constant level
    Constant { level: f64 },
    /// Single sinusoid (EEG rhythms, EGG slow wave)
    Sinusoidal {
        frequency: f64,
        amplitude: f64,
        phase: f64,
    },
    /// Narrow Gaussian spike repeating at a fixed rate (QRS-like)
    Heartbeat {
        rate_bpm: f64,
        amplitude: f64,
        width: f64,
    },
    /// Sum of alpha and theta rhythms
    Eeg {
        alpha_amplitude: f64,
        theta_amplitude: f64,
        phase: f64,
    },
}

impl SignalPattern {
    /// Value of the pattern at `time`
    pub fn value_at(&self, time: f64) -> f64 {
        match *self {
            SignalPattern::Constant { level } => level,

            SignalPattern::Sinusoidal { frequency, amplitude, phase } => {
                amplitude * (2.0 * PI * frequency * time + phase).sin()
            }

            SignalPattern::Heartbeat { rate_bpm, amplitude, width } => {
                let period = 60.0 / rate_bpm;
                let offset = time % period - period / 2.0;
                amplitude * (-(offset * offset) / (2.0 * width * width)).exp()
            }

            SignalPattern::Eeg { alpha_amplitude, theta_amplitude, phase } => {
                alpha_amplitude * (2.0 * PI * 10.0 * time + phase).sin()
                    + theta_amplitude * (2.0 * PI * 6.0 * time + 0.5 * phase).sin()
            }
        }
    }

    /// Sample the pattern over `n` points at `rate` Hz
    pub fn sample(&self, n: usize, rate: f64) -> Vec<f64> {
        (0..n).map(|i| self.value_at(i as f64 / rate)).collect()
    }

    pub fn description(&self) -> &'static str {
        match self {
            SignalPattern::Constant { .. } => "Constant level",
            SignalPattern::Sinusoidal { .. } => "Sinusoid",
            SignalPattern::Heartbeat { .. } => "Heartbeat",
            SignalPattern::Eeg { .. } => "Alpha/theta EEG",
        }
    }

    /// Typical cortical EEG in Volts
    pub fn cortical(phase: f64) -> Self {
        SignalPattern::Eeg {
            alpha_amplitude: 20e-6,
            theta_amplitude: 8e-6,
            phase,
        }
    }

    /// ECG in millivolts
    pub fn ecg() -> Self {
        SignalPattern::Heartbeat {
            rate_bpm: 72.0,
            amplitude: 1.2,
            width: 0.012,
        }
    }

    /// Gastric slow wave (3 cycles per minute) in millivolts
    pub fn egg() -> Self {
        SignalPattern::Sinusoidal {
            frequency: 0.05,
            amplitude: 0.3,
            phase: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_peaks_once_per_period() {
        let pattern = SignalPattern::Heartbeat { rate_bpm: 60.0, amplitude: 1.0, width: 0.01 };
        let data = pattern.sample(2000, 1000.0);
        let peaks = data.iter().filter(|&&x| x > 0.999).count();
        assert_eq!(peaks, 2);
        assert!((pattern.value_at(0.5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sinusoid_amplitude() {
        let pattern = SignalPattern::egg();
        let data = pattern.sample(40_000, 2000.0); // one 20 s cycle
        let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!((max - 0.3).abs() < 1e-6);
    }
}
