//! Rotation schedule: ordered (axis combination, duration) segments
//!
//! Schedules are delimited text tables with a header row. Each row carries a
//! `duration` in seconds, an `AngleAmount`, and one angle column per rotation
//! axis. Rows are resolved to trigger codes through a [`TriggerCodebook`].

use crate::triggers::{TriggerCodebook, TriggerDictionary};
use serde::{Deserialize, Serialize};
use std::path::Path;
use sync_core::{AxisCombo, RotationAxis, SyncError, SyncResult};

/// Angle amount column; the second spelling appears in older schedule exports
const ANGLE_COLUMNS: [&str; 2] = ["AngleAmount", "AngleAmout"];
const DURATION_COLUMN: &str = "duration";

/// One scheduled rotation segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequenceRow {
    pub combo: AxisCombo,
    pub duration_seconds: f64,
    pub trigger_code: i32,
}

/// Rotation segments in playback order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SequenceTable {
    rows: Vec<SequenceRow>,
}

impl SequenceTable {
    /// Load a schedule, resolving codes for the given axes
    pub fn load(
        path: impl AsRef<Path>,
        axes: &[RotationAxis],
        dictionary: &TriggerDictionary,
    ) -> SyncResult<Self> {
        let codebook = TriggerCodebook::new(dictionary, axes)?;
        Self::load_with_codebook(path, &codebook)
    }

    /// Load a schedule with an already resolved codebook
    pub fn load_with_codebook(
        path: impl AsRef<Path>,
        codebook: &TriggerCodebook,
    ) -> SyncResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        Self::from_csv_str(&text, &path.display().to_string(), codebook)
    }

    /// Parse a schedule table.
    ///
    /// Rows with a zero duration are dropped. Rows with a zero or empty
    /// angle amount, or with every considered axis at zero, map to `none`.
    pub fn from_csv_str(text: &str, source: &str, codebook: &TriggerCodebook) -> SyncResult<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        let (header_line, header) = lines.next().ok_or_else(|| SyncError::Parse {
            source: source.to_string(),
            line: 1,
            reason: "empty schedule".to_string(),
        })?;
        let delimiter = detect_delimiter(header);
        let columns: Vec<String> = split_fields(header, delimiter)
            .into_iter()
            .map(str::to_string)
            .collect();

        let find_column = |names: &[&str]| {
            columns
                .iter()
                .position(|c| names.iter().any(|n| c.eq_ignore_ascii_case(n)))
        };
        let missing = |name: &str| SyncError::Parse {
            source: source.to_string(),
            line: header_line,
            reason: format!("missing column '{}'", name),
        };

        let duration_col = find_column(&[DURATION_COLUMN]).ok_or_else(|| missing(DURATION_COLUMN))?;
        let angle_col = find_column(&ANGLE_COLUMNS).ok_or_else(|| missing(ANGLE_COLUMNS[0]))?;
        let axis_cols = codebook
            .axes()
            .iter()
            .map(|axis| {
                find_column(&[axis.name()])
                    .map(|col| (*axis, col))
                    .ok_or_else(|| missing(axis.name()))
            })
            .collect::<SyncResult<Vec<_>>>()?;

        let mut rows = Vec::new();
        for (line_no, line) in lines {
            let fields = split_fields(line, delimiter);
            if fields.len() < columns.len() {
                return Err(SyncError::Parse {
                    source: source.to_string(),
                    line: line_no,
                    reason: format!("expected {} fields, found {}", columns.len(), fields.len()),
                });
            }
            let value = |col: usize| parse_value(fields[col], &columns[col], source, line_no);

            let duration = value(duration_col)?.ok_or_else(|| SyncError::Parse {
                source: source.to_string(),
                line: line_no,
                reason: "duration is empty".to_string(),
            })?;
            if !duration.is_finite() || duration < 0.0 {
                return Err(SyncError::Parse {
                    source: source.to_string(),
                    line: line_no,
                    reason: format!("invalid duration {}", duration),
                });
            }
            if duration == 0.0 {
                continue;
            }

            let angle = value(angle_col)?.unwrap_or(0.0);
            let mut active = Vec::with_capacity(axis_cols.len());
            for &(axis, col) in &axis_cols {
                if value(col)?.unwrap_or(0.0) != 0.0 {
                    active.push(axis);
                }
            }

            let combo = if angle == 0.0 {
                AxisCombo::None
            } else {
                AxisCombo::from_axes(&active)
            };
            rows.push(SequenceRow {
                combo,
                duration_seconds: duration,
                trigger_code: codebook.code(combo)?,
            });
        }

        Ok(SequenceTable { rows })
    }

    /// Build a table from already resolved rows
    pub fn from_rows(rows: Vec<SequenceRow>) -> Self {
        SequenceTable { rows }
    }

    pub fn rows(&self) -> &[SequenceRow] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SequenceRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of all segment durations in seconds
    pub fn total_duration(&self) -> f64 {
        self.rows.iter().map(|r| r.duration_seconds).sum()
    }
}

impl<'a> IntoIterator for &'a SequenceTable {
    type Item = &'a SequenceRow;
    type IntoIter = std::slice::Iter<'a, SequenceRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Schedule file name for a session, e.g. `session1-Pitch-Yaw.csv`
pub fn sequence_file_name(session: u32, axes: &[RotationAxis]) -> String {
    let mut names: Vec<&str> = axes.iter().map(RotationAxis::name).collect();
    names.sort_unstable();
    names.dedup();
    format!("session{}-{}.csv", session, names.join("-"))
}

fn detect_delimiter(header: &str) -> char {
    [',', ';', '\t']
        .into_iter()
        .max_by_key(|d| (header.matches(*d).count(), *d == ','))
        .unwrap_or(',')
}

fn split_fields(line: &str, delimiter: char) -> Vec<&str> {
    line.split(delimiter)
        .map(|f| f.trim().trim_matches('"').trim())
        .collect()
}

/// Empty and `nan` fields are null
fn parse_value(field: &str, column: &str, source: &str, line: usize) -> SyncResult<Option<f64>> {
    if field.is_empty() || field.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    field.parse::<f64>().map(Some).map_err(|_| SyncError::Parse {
        source: source.to_string(),
        line,
        reason: format!("value '{}' in column '{}' is not a number", field, column),
    })
}
