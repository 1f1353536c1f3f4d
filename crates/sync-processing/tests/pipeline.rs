use std::path::PathBuf;
use sync_processing::{
    create_epochs, find_events, Event, ScheduleStatus, SequenceRow, SequenceTable, SessionPlan,
    SyncConfig, SyncPipeline, TriggerDictionary, TriggerSchema,
};
use sync_core::{AxisCombo, SyncError};
use sync_simulation::{RecordingConfig, RecordingSimulator, SimulatedPair};

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("data")
}

fn pipeline() -> SyncPipeline {
    let config = SyncConfig {
        sequence_dir: Some(data_dir()),
        triggers_path: Some(data_dir().join("triggers.ini")),
        ..SyncConfig::default()
    };
    SyncPipeline::new(config).unwrap()
}

fn recording(seed: u64) -> SimulatedPair {
    let config = RecordingConfig {
        seed: Some(seed),
        ..RecordingConfig::default()
    };
    RecordingSimulator::new(config).unwrap().generate().unwrap()
}

#[test]
fn test_sequence_session() {
    let pair = recording(1);
    let output = pipeline().run_session(&pair.eeg, &pair.aux, 1).unwrap();

    assert_eq!(output.eeg_onset, 2.0);
    assert_eq!(output.aux_onset, 3.5);
    assert_eq!(output.onset_sample, 100);
    assert_eq!(output.status, ScheduleStatus::Complete);

    let record = &output.record;
    assert_eq!(record.sampling_rate(), 500.0);
    // EEG keeps 28.2 s after the pre-roll crop, the auxiliary stream 28.7 s
    assert_eq!(record.n_samples(), 14_100);
    assert_eq!(
        record.channel_names(),
        vec!["Fz", "Cz", "Pz", "Oz", "ECG", "EGG", "STI"]
    );

    let events = find_events(record, "STI").unwrap();
    assert_eq!(
        events,
        vec![
            Event { sample: 100, code: 2 },
            Event { sample: 2600, code: 10 },
            Event { sample: 4600, code: 60 },
            Event { sample: 6100, code: 70 },
            Event { sample: 8100, code: 2 },
        ]
    );
}

#[test]
fn test_baseline_session() {
    let pair = recording(2);
    let output = pipeline().run_session(&pair.eeg, &pair.aux, 2).unwrap();

    let events = find_events(&output.record, "STI").unwrap();
    assert_eq!(events, vec![Event { sample: 100, code: 1 }]);
    assert!(output.status.is_complete());
}

#[test]
fn test_runs_are_deterministic() {
    let pair = recording(3);
    let pipeline = pipeline();
    let first = pipeline.run_session(&pair.eeg, &pair.aux, 1).unwrap();
    let second = pipeline.run_session(&pair.eeg, &pair.aux, 1).unwrap();
    assert_eq!(first.record.channels(), second.record.channels());
}

#[test]
fn test_long_schedule_is_truncated() {
    let pair = recording(4);
    let rows = (0..4)
        .map(|_| SequenceRow {
            combo: AxisCombo::Yaw,
            duration_seconds: 10.0,
            trigger_code: 30,
        })
        .collect();
    let plan = SessionPlan::Sequence(SequenceTable::from_rows(rows));
    let output = pipeline().run(&pair.eeg, &pair.aux, &plan).unwrap();

    // 28.2 s fit two full segments and the start of a third
    assert_eq!(
        output.status,
        ScheduleStatus::Truncated { rows_written: 3, rows_total: 4 }
    );
    assert_eq!(find_events(&output.record, "STI").unwrap().len(), 3);
}

#[test]
fn test_aux_onset_too_early() {
    let config = RecordingConfig {
        seed: Some(5),
        aux_onset: 0.1,
        ..RecordingConfig::default()
    };
    let pair = RecordingSimulator::new(config).unwrap().generate().unwrap();
    let err = pipeline().run_session(&pair.eeg, &pair.aux, 2).unwrap_err();
    assert!(matches!(err, SyncError::InsufficientPreRoll { ref stream, .. } if stream == "biopac"));
}

#[test]
fn test_epochs_on_merged_record() {
    let pair = recording(6);
    let output = pipeline().run_session(&pair.eeg, &pair.aux, 1).unwrap();

    let labels = TriggerDictionary::from_pairs(
        [
            ("pitch", 10),
            ("roll", 20),
            ("yaw", 30),
            ("pitch_roll", 40),
            ("pitch_yaw", 50),
            ("yaw_roll", 60),
            ("pitch_yaw_roll", 70),
        ],
        TriggerSchema::Epochs,
    )
    .unwrap();
    let epochs = create_epochs(&output.record, "STI", &labels, 1.0, 0.0).unwrap();

    let count = |label: &str| epochs.iter().filter(|e| e.label == label).count();
    assert_eq!(count("pitch"), 4);
    assert_eq!(count("yaw_roll"), 3);
    assert_eq!(count("pitch_yaw_roll"), 4);
    assert_eq!(epochs.len(), 11);
}
