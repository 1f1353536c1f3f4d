//! Trigger dictionary: symbolic event names to integer codes
//!
//! Definitions are INI files with a single `[events]` section. The codebook
//! derived from a dictionary maps every reachable [`AxisCombo`] to its code
//! so that schedule rows never look up keys by string at use time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use sync_core::{AxisCombo, RotationAxis, SyncError, SyncResult};

/// Section holding the trigger definitions
pub const EVENTS_SECTION: &str = "events";

const BUILTIN_TRIGGERS: &str = include_str!("../resources/triggers.ini");

/// Which set of keys a trigger definition must provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerSchema {
    /// Synthetic stimulus channel: start, none and every axis combination
    Stimulus,
    /// Epoch labeling of rotation segments
    Epochs,
}

impl TriggerSchema {
    /// Required keys, in the order they are checked
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            TriggerSchema::Stimulus => &[
                "start",
                "none",
                "pitch",
                "roll",
                "yaw",
                "pitch_roll",
                "pitch_yaw",
                "roll_yaw",
                "pitch_roll_yaw",
            ],
            TriggerSchema::Epochs => &[
                "pitch",
                "yaw",
                "roll",
                "pitch_yaw",
                "pitch_roll",
                "yaw_roll",
                "pitch_yaw_roll",
            ],
        }
    }
}

/// Immutable mapping from trigger name to code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerDictionary {
    codes: BTreeMap<String, i32>,
}

impl TriggerDictionary {
    /// Load a trigger definition file and check it against `schema`
    pub fn load(path: impl AsRef<Path>, schema: TriggerSchema) -> SyncResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        Self::from_ini_str(&text, &path.display().to_string(), schema)
    }

    /// Parse a trigger definition from INI text
    pub fn from_ini_str(text: &str, source: &str, schema: TriggerSchema) -> SyncResult<Self> {
        let codes = parse_events_section(text, source)?;
        let dictionary = TriggerDictionary { codes };
        dictionary.verify(schema)?;
        Ok(dictionary)
    }

    /// Trigger table shipped with the crate
    pub fn builtin() -> SyncResult<Self> {
        Self::from_ini_str(BUILTIN_TRIGGERS, "builtin triggers.ini", TriggerSchema::Stimulus)
    }

    /// Build a dictionary from explicit pairs, checked against `schema`
    pub fn from_pairs<I, S>(pairs: I, schema: TriggerSchema) -> SyncResult<Self>
    where
        I: IntoIterator<Item = (S, i32)>,
        S: Into<String>,
    {
        let codes = pairs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let dictionary = TriggerDictionary { codes };
        dictionary.verify(schema)?;
        Ok(dictionary)
    }

    fn verify(&self, schema: TriggerSchema) -> SyncResult<()> {
        match schema.required_keys().iter().find(|k| !self.codes.contains_key(**k)) {
            Some(key) => Err(SyncError::MissingKey { key: key.to_string() }),
            None => Ok(()),
        }
    }

    pub fn get(&self, name: &str) -> Option<i32> {
        self.codes.get(name).copied()
    }

    /// Code for `name`, failing with `MissingKey` if absent
    pub fn code(&self, name: &str) -> SyncResult<i32> {
        self.get(name)
            .ok_or_else(|| SyncError::MissingKey { key: name.to_string() })
    }

    /// First name mapped to `code`, if any
    pub fn name_of(&self, code: i32) -> Option<&str> {
        self.codes
            .iter()
            .find(|(_, &c)| c == code)
            .map(|(name, _)| name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.codes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.codes.iter().map(|(k, &v)| (k.as_str(), v))
    }
}

/// Parse the `[events]` section of an INI document.
///
/// Full-line comments start with `#` or `;`; inline comments need leading
/// whitespace. Keys keep their case and the last duplicate wins.
fn parse_events_section(text: &str, source: &str) -> SyncResult<BTreeMap<String, i32>> {
    let mut codes = BTreeMap::new();
    let mut section: Option<String> = None;

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') {
            let name = line
                .strip_prefix('[')
                .and_then(|l| l.split(']').next())
                .filter(|_| line.contains(']'))
                .ok_or_else(|| SyncError::Parse {
                    source: source.to_string(),
                    line: line_no,
                    reason: format!("malformed section header '{}'", line),
                })?;
            section = Some(name.trim().to_string());
            continue;
        }

        let current = section.as_deref().ok_or_else(|| SyncError::Parse {
            source: source.to_string(),
            line: line_no,
            reason: "entry before any section header".to_string(),
        })?;

        let split_at = line.find(|c: char| c == '=' || c == ':').ok_or_else(|| SyncError::Parse {
            source: source.to_string(),
            line: line_no,
            reason: format!("expected 'key = value', found '{}'", line),
        })?;
        if current != EVENTS_SECTION {
            continue;
        }

        let key = line[..split_at].trim();
        let value = strip_inline_comment(&line[split_at + 1..]).trim();
        let code = value.parse::<i32>().map_err(|_| SyncError::Parse {
            source: source.to_string(),
            line: line_no,
            reason: format!("value '{}' of '{}' is not an integer", value, key),
        })?;
        codes.insert(key.to_string(), code);
    }

    Ok(codes)
}

fn strip_inline_comment(value: &str) -> &str {
    let bytes = value.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if (b == b'#' || b == b';') && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return &value[..i];
        }
    }
    value
}

/// Axis combination to trigger code table.
///
/// Built once per rotation axis set; every combination reachable from those
/// axes is guaranteed to have a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerCodebook {
    axes: Vec<RotationAxis>,
    codes: BTreeMap<AxisCombo, i32>,
}

impl TriggerCodebook {
    /// Resolve every combination reachable from `axes`.
    ///
    /// Fails with `UnknownCombo` for the first combination whose key the
    /// dictionary does not define.
    pub fn new(dictionary: &TriggerDictionary, axes: &[RotationAxis]) -> SyncResult<Self> {
        let mut codes = BTreeMap::new();
        for combo in AxisCombo::reachable(axes) {
            let code = dictionary
                .get(combo.trigger_key())
                .ok_or_else(|| SyncError::UnknownCombo {
                    combo: combo.trigger_key().to_string(),
                })?;
            codes.insert(combo, code);
        }

        let mut axes = axes.to_vec();
        axes.sort();
        axes.dedup();
        Ok(Self { axes, codes })
    }

    /// Axes this codebook was built for, sorted
    pub fn axes(&self) -> &[RotationAxis] {
        &self.axes
    }

    /// Code for a combination; combinations outside the axis set are rejected
    pub fn code(&self, combo: AxisCombo) -> SyncResult<i32> {
        self.codes
            .get(&combo)
            .copied()
            .ok_or_else(|| SyncError::UnknownCombo {
                combo: combo.trigger_key().to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "\
[events]
start = 1010101
pitch = 101
yaw = 201
roll = 301
none = 401
question = 1  ; auxiliary code
pitch_roll = 102
pitch_yaw = 202
roll_yaw = 302
pitch_roll_yaw = 10101
";

    #[test]
    fn test_load_triggers() {
        let tdef = TriggerDictionary::from_ini_str(VALID, "test", TriggerSchema::Stimulus).unwrap();
        assert_eq!(tdef.get("start"), Some(1010101));
        assert_eq!(tdef.get("pitch"), Some(101));
        assert_eq!(tdef.get("yaw"), Some(201));
        assert_eq!(tdef.get("roll"), Some(301));
        assert_eq!(tdef.get("none"), Some(401));
        assert_eq!(tdef.get("question"), Some(1));
        assert_eq!(tdef.get("pitch_roll"), Some(102));
        assert_eq!(tdef.get("pitch_yaw"), Some(202));
        assert_eq!(tdef.get("roll_yaw"), Some(302));
        assert_eq!(tdef.get("pitch_roll_yaw"), Some(10101));
        assert_eq!(tdef.len(), 10);
    }

    #[test]
    fn test_missing_key_is_named() {
        let invalid = VALID.replace("start = 1010101\n", "");
        let err =
            TriggerDictionary::from_ini_str(&invalid, "test", TriggerSchema::Stimulus).unwrap_err();
        assert_eq!(err, SyncError::MissingKey { key: "start".to_string() });
        assert!(err.to_string().contains("Key 'start' is missing"));
    }

    #[test]
    fn test_first_missing_key_in_schema_order() {
        let text = "[events]\nstart = 1\npitch = 2\n";
        let err =
            TriggerDictionary::from_ini_str(text, "test", TriggerSchema::Stimulus).unwrap_err();
        assert_eq!(err, SyncError::MissingKey { key: "none".to_string() });
    }

    #[test]
    fn test_missing_section_reports_first_key() {
        let text = "[other]\nstart = 1\n";
        let err =
            TriggerDictionary::from_ini_str(text, "test", TriggerSchema::Stimulus).unwrap_err();
        assert_eq!(err, SyncError::MissingKey { key: "start".to_string() });
    }

    #[test]
    fn test_epoch_schema() {
        let text = "\
[events]
pitch = 101
yaw = 201
roll = 301
pitch_yaw = 102
pitch_roll = 202
yaw_roll = 302
pitch_yaw_roll = 10101
";
        let tdef = TriggerDictionary::from_ini_str(text, "test", TriggerSchema::Epochs).unwrap();
        assert_eq!(tdef.get("yaw_roll"), Some(302));

        let invalid = text.replace("pitch_yaw_roll = 10101\n", "");
        let err =
            TriggerDictionary::from_ini_str(&invalid, "test", TriggerSchema::Epochs).unwrap_err();
        assert_eq!(err, SyncError::MissingKey { key: "pitch_yaw_roll".to_string() });

        // the stimulus schema needs start/none on top
        assert!(TriggerDictionary::from_ini_str(text, "test", TriggerSchema::Stimulus).is_err());
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let text = format!("{}pitch = 999\n", VALID);
        let tdef = TriggerDictionary::from_ini_str(&text, "test", TriggerSchema::Stimulus).unwrap();
        assert_eq!(tdef.get("pitch"), Some(999));
    }

    #[test]
    fn test_keys_are_case_sensitive_and_colon_separated() {
        let text = format!("{}Pitch: 7\n", VALID);
        let tdef = TriggerDictionary::from_ini_str(&text, "test", TriggerSchema::Stimulus).unwrap();
        assert_eq!(tdef.get("Pitch"), Some(7));
        assert_eq!(tdef.get("pitch"), Some(101));
    }

    #[test]
    fn test_non_integer_value() {
        let text = VALID.replace("pitch = 101", "pitch = fast");
        let err = TriggerDictionary::from_ini_str(&text, "test.ini", TriggerSchema::Stimulus)
            .unwrap_err();
        match err {
            SyncError::Parse { source, line, .. } => {
                assert_eq!(source, "test.ini");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_builtin_table() {
        let tdef = TriggerDictionary::builtin().unwrap();
        assert_eq!(tdef.get("start"), Some(1));
        assert_eq!(tdef.get("question"), Some(100));
        assert_eq!(tdef.name_of(22), Some("pitch_yaw"));
    }

    #[test]
    fn test_codebook_resolves_reachable_combinations() {
        let tdef = TriggerDictionary::from_ini_str(VALID, "test", TriggerSchema::Stimulus).unwrap();
        let codebook =
            TriggerCodebook::new(&tdef, &[RotationAxis::Yaw, RotationAxis::Pitch]).unwrap();

        assert_eq!(codebook.axes(), &[RotationAxis::Pitch, RotationAxis::Yaw]);
        assert_eq!(codebook.code(AxisCombo::None).unwrap(), 401);
        assert_eq!(codebook.code(AxisCombo::PitchYaw).unwrap(), 202);
        assert!(matches!(
            codebook.code(AxisCombo::Roll),
            Err(SyncError::UnknownCombo { .. })
        ));
    }

    #[test]
    fn test_codebook_rejects_inexpressible_combination() {
        let tdef = TriggerDictionary::from_pairs(
            [("pitch", 1), ("yaw", 2), ("pitch_yaw", 3)],
            TriggerSchema::Epochs,
        );
        // the epoch schema itself is incomplete here
        assert!(tdef.is_err());

        let tdef = TriggerDictionary::from_ini_str(
            "[events]\npitch = 101\nyaw = 201\nroll = 301\npitch_yaw = 102\npitch_roll = 202\n\
             yaw_roll = 302\npitch_yaw_roll = 10101\n",
            "test",
            TriggerSchema::Epochs,
        )
        .unwrap();
        // "none" is not defined by the epoch table
        let err = TriggerCodebook::new(&tdef, &[RotationAxis::Pitch]).unwrap_err();
        assert_eq!(err, SyncError::UnknownCombo { combo: "none".to_string() });
    }
}
