//! Channel merger: aligned EEG + auxiliary channels + synthetic trigger

use crate::synth::DEFAULT_TRIGGER_CHANNEL;
use serde::{Deserialize, Serialize};
use sync_core::{shape_error, Channel, ChannelKind, StreamChannelSet, SyncError, SyncResult};
use tracing::debug;

/// Relative tolerance when comparing sampling rates
const RATE_TOLERANCE: f64 = 1e-9;

/// Channel naming used while merging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOptions {
    /// Auxiliary trigger line to discard
    pub aux_placeholder_channel: String,
    /// Name of the synthetic trigger channel
    pub trigger_channel: String,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            aux_placeholder_channel: "STI-Biopac".to_string(),
            trigger_channel: DEFAULT_TRIGGER_CHANNEL.to_string(),
        }
    }
}

/// Combine aligned streams into one recording.
///
/// All inputs must share rate and sample count. Stim channels and the
/// placeholder trigger line are removed from `aux`; the output holds the EEG
/// channels, the remaining aux channels and `triggers`, in that order.
pub fn merge(
    eeg: &StreamChannelSet,
    aux: &StreamChannelSet,
    triggers: &Channel,
    options: &MergeOptions,
) -> SyncResult<StreamChannelSet> {
    check_rate(eeg, aux)?;
    if aux.n_samples() != eeg.n_samples() {
        return Err(shape_error!(
            "{} has {} channels x {} samples, {} has {} channels x {} samples",
            aux.label,
            aux.channel_count(),
            aux.n_samples(),
            eeg.label,
            eeg.channel_count(),
            eeg.n_samples()
        ));
    }
    if triggers.len() != eeg.n_samples() {
        return Err(shape_error!(
            "trigger channel {} has {} samples, {} has {} samples",
            triggers.name,
            triggers.len(),
            eeg.label,
            eeg.n_samples()
        ));
    }

    let kept_aux: Vec<&Channel> = aux
        .channels()
        .iter()
        .filter(|c| {
            c.kind != ChannelKind::Stim
                && c.name != options.aux_placeholder_channel
                && c.name != options.trigger_channel
        })
        .collect();

    let mut channels: Vec<Channel> = eeg.channels().to_vec();
    for channel in kept_aux {
        if eeg.channel(&channel.name).is_ok() {
            return Err(SyncError::InvalidChannel {
                reason: format!(
                    "channel '{}' exists in both {} and {}",
                    channel.name, eeg.label, aux.label
                ),
            });
        }
        channels.push(channel.clone());
    }
    if channels.iter().any(|c| c.name == triggers.name) {
        return Err(SyncError::InvalidChannel {
            reason: format!("trigger channel '{}' already exists", triggers.name),
        });
    }
    channels.push(triggers.clone());

    let mut merged = eeg.with_channels(eeg.sampling_rate(), eeg.first_sample(), channels)?;
    merged.clear_annotations();
    debug!(
        channels = merged.channel_count(),
        samples = merged.n_samples(),
        "streams merged"
    );
    Ok(merged)
}

fn check_rate(eeg: &StreamChannelSet, aux: &StreamChannelSet) -> SyncResult<()> {
    let (a, b) = (eeg.sampling_rate(), aux.sampling_rate());
    if (a - b).abs() > RATE_TOLERANCE * a.abs().max(b.abs()) {
        return Err(shape_error!("{} is sampled at {}Hz, {} at {}Hz", eeg.label, a, aux.label, b));
    }
    Ok(())
}
