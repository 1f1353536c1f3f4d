//! Sample rate conversion
//!
//! Continuous channels are resampled in the frequency domain: the FFT of
//! the whole channel is truncated or zero-padded to the new length and
//! transformed back. Stim channels hold codes, not signal, so their non-zero
//! samples are moved to the nearest output index instead.

use rustfft::{num_complex::Complex, FftPlanner};
use sync_core::{Channel, ChannelKind, StreamChannelSet, SyncError, SyncResult};
use tracing::debug;

/// Output length for `n` samples converted from `from` Hz to `to` Hz
pub fn resampled_len(n: usize, from: f64, to: f64) -> usize {
    (n as f64 * to / from).round() as usize
}

/// Resample every channel of a stream to `new_rate`.
///
/// The recording-start offset is rescaled; annotations are in seconds and
/// stay as they are.
pub fn resample_stream(stream: &StreamChannelSet, new_rate: f64) -> SyncResult<StreamChannelSet> {
    if !new_rate.is_finite() || new_rate <= 0.0 {
        return Err(SyncError::InvalidSamplingRate { rate: new_rate });
    }
    let old_rate = stream.sampling_rate();
    if old_rate == new_rate {
        return Ok(stream.clone());
    }
    if stream.is_empty() {
        return Err(SyncError::Resample {
            reason: format!("stream {} has no samples", stream.label),
        });
    }

    let mut planner = FftPlanner::<f64>::new();
    let channels = stream
        .channels()
        .iter()
        .map(|c| {
            let data = match c.kind {
                ChannelKind::Stim => resample_events(&c.data, old_rate, new_rate),
                _ => resample_fft(&mut planner, &c.data, old_rate, new_rate)?,
            };
            Ok(Channel::new(c.name.clone(), c.kind, data))
        })
        .collect::<SyncResult<Vec<_>>>()?;

    let first_sample = (stream.first_sample() as f64 * new_rate / old_rate).round() as i64;
    let resampled = stream.with_channels(new_rate, first_sample, channels)?;
    debug!(
        stream = %stream.label,
        from = old_rate,
        to = new_rate,
        samples_in = stream.n_samples(),
        samples_out = resampled.n_samples(),
        "stream resampled"
    );
    Ok(resampled)
}

/// Resample one continuous channel
pub fn resample_channel(data: &[f64], from: f64, to: f64) -> SyncResult<Vec<f64>> {
    let mut planner = FftPlanner::<f64>::new();
    resample_fft(&mut planner, data, from, to)
}

fn resample_fft(
    planner: &mut FftPlanner<f64>,
    data: &[f64],
    from: f64,
    to: f64,
) -> SyncResult<Vec<f64>> {
    let n = data.len();
    let m = resampled_len(n, from, to);
    if n == 0 || m == 0 {
        return Err(SyncError::Resample {
            reason: format!("cannot resample {} samples from {}Hz to {}Hz", n, from, to),
        });
    }
    if n == m {
        return Ok(data.to_vec());
    }

    let mut spectrum: Vec<Complex<f64>> = data.iter().map(|&x| Complex::new(x, 0.0)).collect();
    planner.plan_fft_forward(n).process(&mut spectrum);

    // Keep the bins both lengths share: DC and positive frequencies at the
    // front, negative frequencies at the back.
    let shared = n.min(m);
    let positive = shared / 2 + 1;
    let negative = shared - positive;
    let mut resized = vec![Complex::new(0.0, 0.0); m];
    resized[..positive].copy_from_slice(&spectrum[..positive]);
    if negative > 0 {
        resized[m - negative..].copy_from_slice(&spectrum[n - negative..]);
    }

    // An even shared length has a Nyquist bin: fold both halves into it when
    // shrinking, split it across +/- when growing.
    if shared % 2 == 0 {
        let half = shared / 2;
        if m < n {
            resized[half] += spectrum[n - half];
        } else {
            resized[half] *= 0.5;
            resized[m - half] = resized[half];
        }
    }

    planner.plan_fft_inverse(m).process(&mut resized);

    let scale = 1.0 / n as f64;
    Ok(resized.iter().map(|c| c.re * scale).collect())
}

/// Move every non-zero sample to its nearest index at the new rate
fn resample_events(data: &[f64], from: f64, to: f64) -> Vec<f64> {
    let m = resampled_len(data.len(), from, to);
    let mut out = vec![0.0; m];
    if m == 0 {
        return out;
    }
    for (i, &value) in data.iter().enumerate() {
        if value != 0.0 {
            let j = ((i as f64 * to / from).round() as usize).min(m - 1);
            if out[j] == 0.0 {
                out[j] = value;
            }
        }
    }
    out
}
