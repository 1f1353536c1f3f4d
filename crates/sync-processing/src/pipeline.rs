//! End-to-end synchronization of one EEG/auxiliary recording pair

use crate::align::AlignedPair;
use crate::config::SyncConfig;
use crate::merge::merge;
use crate::onset::{find_onset, find_stim_onset, locate_onset, OnsetSource};
use crate::sequence::{sequence_file_name, SequenceTable};
use crate::synth::{synthesize, Schedule, ScheduleStatus};
use crate::triggers::{TriggerCodebook, TriggerDictionary, TriggerSchema};
use serde::Serialize;
use sync_core::{StreamChannelSet, SyncError, SyncResult};
use tracing::{debug, info};

/// What the synthetic channel should contain for a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPlan {
    /// Only the `start` code at the onset
    Baseline,
    /// One code per scheduled rotation segment
    Sequence(SequenceTable),
}

impl SessionPlan {
    /// Baseline for the configured baseline session, otherwise the session's
    /// schedule file from the sequence directory
    pub fn resolve(
        config: &SyncConfig,
        codebook: &TriggerCodebook,
        session: u32,
    ) -> SyncResult<Self> {
        if session == config.baseline_session {
            return Ok(SessionPlan::Baseline);
        }

        let dir = config.sequence_dir.as_ref().ok_or_else(|| SyncError::ConfigurationError {
            message: format!(
                "session {} needs a schedule but no sequence directory is set",
                session
            ),
        })?;
        let path = dir.join(sequence_file_name(session, codebook.axes()));
        debug!(session, path = %path.display(), "loading rotation schedule");
        Ok(SessionPlan::Sequence(SequenceTable::load_with_codebook(&path, codebook)?))
    }
}

/// Result of one synchronization run
#[derive(Debug, Clone)]
pub struct SyncOutput {
    /// EEG, auxiliary and trigger channels on the EEG clock
    pub record: StreamChannelSet,
    pub status: ScheduleStatus,
    /// EEG onset in seconds from the stream start, before alignment
    pub eeg_onset: f64,
    /// Auxiliary onset in seconds from the stream start, before alignment
    pub aux_onset: f64,
    /// Sample of the onset in the merged record
    pub onset_sample: usize,
}

/// Compact description of a run, for reports
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub sampling_rate: f64,
    pub n_samples: usize,
    pub channels: Vec<String>,
    pub status: ScheduleStatus,
    pub eeg_onset: f64,
    pub aux_onset: f64,
    pub onset_sample: usize,
}

impl SyncOutput {
    pub fn summary(&self) -> SyncSummary {
        SyncSummary {
            sampling_rate: self.record.sampling_rate(),
            n_samples: self.record.n_samples(),
            channels: self.record.channel_names().into_iter().map(str::to_string).collect(),
            status: self.status,
            eeg_onset: self.eeg_onset,
            aux_onset: self.aux_onset,
            onset_sample: self.onset_sample,
        }
    }
}

/// Configured synchronization pipeline
#[derive(Debug, Clone)]
pub struct SyncPipeline {
    config: SyncConfig,
    dictionary: TriggerDictionary,
    codebook: TriggerCodebook,
}

impl SyncPipeline {
    /// Validate `config` and load its trigger definition (the built-in table
    /// when no path is configured)
    pub fn new(config: SyncConfig) -> SyncResult<Self> {
        let dictionary = match &config.triggers_path {
            Some(path) => TriggerDictionary::load(path, TriggerSchema::Stimulus)?,
            None => TriggerDictionary::builtin()?,
        };
        Self::with_dictionary(config, dictionary)
    }

    pub fn with_dictionary(config: SyncConfig, dictionary: TriggerDictionary) -> SyncResult<Self> {
        config.validate()?;
        let codebook = TriggerCodebook::new(&dictionary, &config.axes()?)?;
        Ok(Self {
            config,
            dictionary,
            codebook,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn dictionary(&self) -> &TriggerDictionary {
        &self.dictionary
    }

    pub fn codebook(&self) -> &TriggerCodebook {
        &self.codebook
    }

    /// Plan for a session number; see [`SessionPlan::resolve`]
    pub fn plan(&self, session: u32) -> SyncResult<SessionPlan> {
        SessionPlan::resolve(&self.config, &self.codebook, session)
    }

    /// Synchronize a recording pair for a session number
    pub fn run_session(
        &self,
        eeg: &StreamChannelSet,
        aux: &StreamChannelSet,
        session: u32,
    ) -> SyncResult<SyncOutput> {
        let plan = self.plan(session)?;
        self.run(eeg, aux, &plan)
    }

    /// Align the pair, synthesize the trigger channel and merge everything
    pub fn run(
        &self,
        eeg: &StreamChannelSet,
        aux: &StreamChannelSet,
        plan: &SessionPlan,
    ) -> SyncResult<SyncOutput> {
        let eeg = self.prepare_eeg(eeg);
        let aux = self.prepare_aux(aux);

        let eeg_onset = locate_onset(&eeg, &self.config.eeg_onset)?;
        let aux_onset = locate_onset(&aux, &self.config.aux_onset)?;
        info!(eeg_onset, aux_onset, "synchronization onsets located");

        let aligned = self.config.alignment_engine()?.align(&eeg, &aux, eeg_onset, aux_onset)?;
        let onset_sample = self.aligned_onset(&aligned)?;

        let schedule = match plan {
            SessionPlan::Baseline => Schedule::Baseline {
                code: self.dictionary.code("start")?,
            },
            SessionPlan::Sequence(table) => Schedule::Sequence(table),
        };
        let triggers = synthesize(&aligned, onset_sample, &schedule, &self.config.trigger_channel)?;

        let record =
            merge(&aligned.eeg, &aligned.aux, &triggers.channel, &self.config.merge_options())?;
        info!(
            channels = record.channel_count(),
            samples = record.n_samples(),
            status = ?triggers.status,
            "recording pair synchronized"
        );

        Ok(SyncOutput {
            record,
            status: triggers.status,
            eeg_onset,
            aux_onset,
            onset_sample,
        })
    }

    fn prepare_eeg(&self, eeg: &StreamChannelSet) -> StreamChannelSet {
        let mut eeg = eeg.clone();
        let drop = &self.config.eeg_drop_channels;
        let dropped = eeg.drop_channels_where(|c| drop.contains(&c.name));
        debug!(dropped, "EEG channels dropped");
        eeg
    }

    fn prepare_aux(&self, aux: &StreamChannelSet) -> StreamChannelSet {
        let mut aux = aux.clone();
        for (name, unit) in &self.config.aux_units {
            if let Ok(channel) = aux.channel_mut(name) {
                channel.scale_to_volts(unit);
            }
        }
        aux
    }

    /// Onset position inside the aligned EEG, read the same way as before
    /// alignment
    fn aligned_onset(&self, aligned: &AlignedPair) -> SyncResult<usize> {
        let rate = aligned.sampling_rate();
        let sample = match &self.config.eeg_onset {
            OnsetSource::Annotation { marker } => {
                find_onset(&aligned.eeg, marker, true)?.as_sample(rate)
            }
            OnsetSource::StimChannel { channel } => {
                (find_stim_onset(&aligned.eeg, channel)? * rate).round() as i64
            }
        };
        usize::try_from(sample).map_err(|_| SyncError::Alignment {
            reason: format!("onset sample {} precedes the aligned recording", sample),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::{Annotation, Channel, ChannelKind};

    fn eeg() -> StreamChannelSet {
        let n = 5000; // 10 s at 500 Hz
        StreamChannelSet::new(
            "eeg",
            500.0,
            vec![
                Channel::new("Fz", ChannelKind::Eeg, vec![1e-6; n]),
                Channel::new("M1", ChannelKind::Eeg, vec![0.0; n]),
                Channel::new("EOG", ChannelKind::Eog, vec![0.0; n]),
            ],
        )
        .unwrap()
        .with_annotations(vec![
            Annotation::new(0.0, 0.0, "New Segment/"),
            Annotation::new(1.0, 0.0, "Stimulus/s1"),
        ])
    }

    fn aux() -> StreamChannelSet {
        let n = 24_000; // 12 s at 2000 Hz
        let mut sti = vec![0.0; n];
        sti[5000..5020].iter_mut().for_each(|x| *x = 5.0);
        StreamChannelSet::new(
            "biopac",
            2000.0,
            vec![
                Channel::new("ECG", ChannelKind::Ecg, vec![1.0; n]),
                Channel::new("STI-Biopac", ChannelKind::Stim, sti),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_baseline_run() {
        let pipeline = SyncPipeline::new(SyncConfig::default()).unwrap();
        let output = pipeline.run(&eeg(), &aux(), &SessionPlan::Baseline).unwrap();

        assert_eq!(output.eeg_onset, 1.0);
        assert_eq!(output.aux_onset, 2.5);
        assert_eq!(output.onset_sample, 100);
        assert_eq!(output.status, ScheduleStatus::Complete);

        let record = &output.record;
        assert_eq!(record.channel_names(), vec!["Fz", "ECG", "STI"]);
        assert_eq!(record.sampling_rate(), 500.0);
        // eeg keeps 9.2 s, aux keeps 9.7 s
        assert_eq!(record.n_samples(), 4600);

        let sti = &record.channel("STI").unwrap().data;
        assert_eq!(sti[100], 1.0);
        assert_eq!(sti.iter().filter(|&&x| x != 0.0).count(), 1);

        // ECG arrives in mV and leaves in V
        let ecg = &record.channel("ECG").unwrap().data;
        assert!(ecg.iter().all(|x| (x - 1e-3).abs() < 1e-9));
    }

    #[test]
    fn test_eeg_with_recording_start_offset() {
        // recording starts 2 s before the file; the marker at 3 s recording time is 1 s in
        let eeg = eeg()
            .with_first_sample(1000)
            .with_annotations(vec![Annotation::new(3.0, 0.0, "Stimulus/s1")]);
        let pipeline = SyncPipeline::new(SyncConfig::default()).unwrap();
        let output = pipeline.run(&eeg, &aux(), &SessionPlan::Baseline).unwrap();

        assert_eq!(output.eeg_onset, 1.0);
        assert_eq!(output.onset_sample, 100);
        assert_eq!(output.record.n_samples(), 4600);
        assert_eq!(output.record.first_sample(), 1400);
        assert_eq!(output.record.channel("STI").unwrap().data[100], 1.0);
    }

    #[test]
    fn test_sequence_run() {
        let pipeline = SyncPipeline::new(SyncConfig::default()).unwrap();
        let table = SequenceTable::from_csv_str(
            "duration,AngleAmount,Pitch,Roll,Yaw\n2.0,30,1,0,0\n3.0,0,0,0,0\n",
            "inline",
            pipeline.codebook(),
        )
        .unwrap();
        let output = pipeline.run(&eeg(), &aux(), &SessionPlan::Sequence(table)).unwrap();

        let sti = &output.record.channel("STI").unwrap().data;
        assert_eq!(sti[100], 11.0);
        assert_eq!(sti[1100], 2.0);
        assert_eq!(output.status, ScheduleStatus::Complete);
    }

    #[test]
    fn test_missing_eeg_marker() {
        let pipeline = SyncPipeline::new(SyncConfig::default()).unwrap();
        let eeg = eeg().with_annotations(vec![]);
        let err = pipeline.run(&eeg, &aux(), &SessionPlan::Baseline).unwrap_err();
        assert!(matches!(err, SyncError::OnsetNotFound { .. }));
    }

    #[test]
    fn test_plan_resolution() {
        let pipeline = SyncPipeline::new(SyncConfig::default()).unwrap();
        assert_eq!(pipeline.plan(2).unwrap(), SessionPlan::Baseline);
        assert!(matches!(pipeline.plan(1), Err(SyncError::ConfigurationError { .. })));

        let pipeline = SyncPipeline::new(SyncConfig::with_sequence_dir("/nonexistent")).unwrap();
        assert!(matches!(pipeline.plan(3), Err(SyncError::Io { .. })));
    }

    #[test]
    fn test_summary_serializes() {
        let pipeline = SyncPipeline::new(SyncConfig::default()).unwrap();
        let output = pipeline.run(&eeg(), &aux(), &SessionPlan::Baseline).unwrap();
        let json = serde_json::to_value(output.summary()).unwrap();
        assert_eq!(json["status"]["status"], "complete");
        assert_eq!(json["onset_sample"], 100);
    }
}
