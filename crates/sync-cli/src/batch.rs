//! Parallel synchronization of simulated recording pairs

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use sync_core::ChannelStats;
use sync_processing::{SyncPipeline, SyncSummary};
use sync_simulation::{RecordingConfig, RecordingSimulator};
use tracing::{error, info};

/// Outcome of one pair in a batch
#[derive(Debug, Serialize)]
pub struct PairReport {
    pub pair: usize,
    pub seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SyncSummary>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub channel_stats: BTreeMap<String, ChannelStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PairReport {
    fn failed(pair: usize, seed: u64, error: String) -> Self {
        Self {
            pair,
            seed,
            summary: None,
            channel_stats: BTreeMap::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub session: u32,
    pub succeeded: usize,
    pub failed: usize,
    pub pairs: Vec<PairReport>,
}

/// Simulate `pairs` recordings and synchronize each on a blocking worker.
///
/// A failing pair is reported and the batch carries on.
pub async fn run_batch(
    pipeline: Arc<SyncPipeline>,
    recording: RecordingConfig,
    session: u32,
    pairs: usize,
    base_seed: u64,
) -> Result<BatchReport> {
    let mut handles = Vec::with_capacity(pairs);
    for pair in 0..pairs {
        let pipeline = Arc::clone(&pipeline);
        let seed = base_seed + pair as u64;
        let config = RecordingConfig {
            seed: Some(seed),
            ..recording.clone()
        };
        let handle =
            tokio::task::spawn_blocking(move || sync_pair(&pipeline, config, session, pair, seed));
        handles.push((pair, seed, handle));
    }

    let mut reports = Vec::with_capacity(pairs);
    for (pair, seed, handle) in handles {
        reports.push(join_pair(pair, seed, handle).await);
    }

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    info!(session, succeeded = reports.len() - failed, failed, "batch finished");
    Ok(BatchReport {
        session,
        succeeded: reports.len() - failed,
        failed,
        pairs: reports,
    })
}

/// Wait for a worker; a panicked worker becomes a failed pair
async fn join_pair(pair: usize, seed: u64, handle: JoinHandle<PairReport>) -> PairReport {
    match handle.await {
        Ok(report) => report,
        Err(e) => {
            error!(pair, seed, error = %e, "synchronization worker panicked");
            PairReport::failed(pair, seed, format!("synchronization worker panicked: {}", e))
        }
    }
}

fn sync_pair(
    pipeline: &SyncPipeline,
    config: RecordingConfig,
    session: u32,
    pair: usize,
    seed: u64,
) -> PairReport {
    let result = RecordingSimulator::new(config)
        .and_then(|mut simulator| simulator.generate())
        .and_then(|recording| pipeline.run_session(&recording.eeg, &recording.aux, session));

    match result {
        Ok(output) => {
            let channel_stats = output
                .record
                .channels()
                .iter()
                .map(|c| (c.name.clone(), c.stats()))
                .collect();
            PairReport {
                pair,
                seed,
                summary: Some(output.summary()),
                channel_stats,
                error: None,
            }
        }
        Err(e) => {
            error!(pair, seed, error = %e, "pair failed");
            PairReport::failed(pair, seed, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_processing::SyncConfig;

    fn pipeline() -> Arc<SyncPipeline> {
        Arc::new(SyncPipeline::new(SyncConfig::default()).unwrap())
    }

    fn short_recording() -> RecordingConfig {
        RecordingConfig {
            eeg_duration: 6.0,
            aux_duration: 7.0,
            ..RecordingConfig::default()
        }
    }

    #[tokio::test]
    async fn test_batch_reports_every_pair() {
        let report = run_batch(pipeline(), short_recording(), 2, 3, 7).await.unwrap();

        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 0);
        let seeds: Vec<u64> = report.pairs.iter().map(|p| p.seed).collect();
        assert_eq!(seeds, vec![7, 8, 9]);
        assert!(report.pairs.iter().all(|p| p.summary.is_some()));
    }

    #[tokio::test]
    async fn test_failing_pairs_do_not_stop_the_batch() {
        // the auxiliary pulse comes before the pre-roll can fit
        let recording = RecordingConfig {
            aux_onset: 0.1,
            ..short_recording()
        };
        let report = run_batch(pipeline(), recording, 2, 2, 1).await.unwrap();

        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 2);
        assert!(report.pairs.iter().all(|p| p.error.is_some() && p.summary.is_none()));
    }

    #[tokio::test]
    async fn test_panicked_worker_becomes_failed_pair() {
        let handle = tokio::task::spawn_blocking(|| -> PairReport { panic!("worker died") });
        let report = join_pair(4, 46, handle).await;

        assert_eq!(report.pair, 4);
        assert_eq!(report.seed, 46);
        assert!(report.summary.is_none());
        assert!(report.error.unwrap().contains("panicked"));

        let handle =
            tokio::task::spawn_blocking(|| PairReport::failed(5, 47, "bad input".to_string()));
        let report = join_pair(5, 47, handle).await;
        assert_eq!(report.error.as_deref(), Some("bad input"));
    }
}
