//! Rotation axes and the finite set of axis combinations used by the schedules

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Motion rotation axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RotationAxis {
    Pitch,
    Roll,
    Yaw,
}

impl RotationAxis {
    /// All axes in alphabetical order
    pub const ALL: [RotationAxis; 3] = [RotationAxis::Pitch, RotationAxis::Roll, RotationAxis::Yaw];

    /// Capitalized name, as used in schedule column headers and file names
    pub fn name(&self) -> &'static str {
        match self {
            RotationAxis::Pitch => "Pitch",
            RotationAxis::Roll => "Roll",
            RotationAxis::Yaw => "Yaw",
        }
    }

    /// Lower-case name, as used in trigger keys
    pub fn key(&self) -> &'static str {
        match self {
            RotationAxis::Pitch => "pitch",
            RotationAxis::Roll => "roll",
            RotationAxis::Yaw => "yaw",
        }
    }

    fn bit(&self) -> u8 {
        match self {
            RotationAxis::Pitch => 0b001,
            RotationAxis::Roll => 0b010,
            RotationAxis::Yaw => 0b100,
        }
    }
}

impl FromStr for RotationAxis {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pitch" => Ok(RotationAxis::Pitch),
            "roll" => Ok(RotationAxis::Roll),
            "yaw" => Ok(RotationAxis::Yaw),
            other => Err(SyncError::InvalidRotationAxes {
                reason: format!("unknown axis '{}', expected Pitch, Yaw or Roll", other),
            }),
        }
    }
}

impl std::fmt::Display for RotationAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of axes active during one schedule segment.
///
/// The trigger key of a combination is the sorted lower-case axis names
/// joined by `_`, or `none` for the empty set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AxisCombo {
    None,
    Pitch,
    Roll,
    Yaw,
    PitchRoll,
    PitchYaw,
    RollYaw,
    PitchRollYaw,
}

impl AxisCombo {
    pub const ALL: [AxisCombo; 8] = [
        AxisCombo::None,
        AxisCombo::Pitch,
        AxisCombo::Roll,
        AxisCombo::Yaw,
        AxisCombo::PitchRoll,
        AxisCombo::PitchYaw,
        AxisCombo::RollYaw,
        AxisCombo::PitchRollYaw,
    ];

    /// Combination made of exactly these axes (duplicates are ignored)
    pub fn from_axes<'a, I: IntoIterator<Item = &'a RotationAxis>>(axes: I) -> Self {
        let mask = axes.into_iter().fold(0u8, |m, a| m | a.bit());
        Self::from_mask(mask)
    }

    fn from_mask(mask: u8) -> Self {
        match mask {
            0b000 => AxisCombo::None,
            0b001 => AxisCombo::Pitch,
            0b010 => AxisCombo::Roll,
            0b100 => AxisCombo::Yaw,
            0b011 => AxisCombo::PitchRoll,
            0b101 => AxisCombo::PitchYaw,
            0b110 => AxisCombo::RollYaw,
            _ => AxisCombo::PitchRollYaw,
        }
    }

    /// Axes making up this combination, alphabetically
    pub fn axes(&self) -> Vec<RotationAxis> {
        let mask = self.mask();
        RotationAxis::ALL
            .iter()
            .copied()
            .filter(|a| mask & a.bit() != 0)
            .collect()
    }

    fn mask(&self) -> u8 {
        match self {
            AxisCombo::None => 0b000,
            AxisCombo::Pitch => 0b001,
            AxisCombo::Roll => 0b010,
            AxisCombo::Yaw => 0b100,
            AxisCombo::PitchRoll => 0b011,
            AxisCombo::PitchYaw => 0b101,
            AxisCombo::RollYaw => 0b110,
            AxisCombo::PitchRollYaw => 0b111,
        }
    }

    /// Trigger dictionary key for this combination
    pub fn trigger_key(&self) -> &'static str {
        match self {
            AxisCombo::None => "none",
            AxisCombo::Pitch => "pitch",
            AxisCombo::Roll => "roll",
            AxisCombo::Yaw => "yaw",
            AxisCombo::PitchRoll => "pitch_roll",
            AxisCombo::PitchYaw => "pitch_yaw",
            AxisCombo::RollYaw => "roll_yaw",
            AxisCombo::PitchRollYaw => "pitch_roll_yaw",
        }
    }

    /// Every combination that can occur when only `axes` are considered,
    /// including `None`
    pub fn reachable(axes: &[RotationAxis]) -> Vec<AxisCombo> {
        let allowed = AxisCombo::from_axes(axes).mask();
        AxisCombo::ALL
            .iter()
            .copied()
            .filter(|c| c.mask() & !allowed == 0)
            .collect()
    }
}

impl std::fmt::Display for AxisCombo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.trigger_key())
    }
}

/// Validate and sort a list of rotation axis names.
///
/// The list must be non-empty and free of duplicates.
pub fn check_rotation_axes<S: AsRef<str>>(names: &[S]) -> SyncResult<Vec<RotationAxis>> {
    if names.is_empty() {
        return Err(SyncError::InvalidRotationAxes {
            reason: "at least one rotation axis is required".to_string(),
        });
    }

    let mut axes = names
        .iter()
        .map(|n| n.as_ref().parse::<RotationAxis>())
        .collect::<SyncResult<Vec<_>>>()?;
    axes.sort();

    if axes.windows(2).any(|w| w[0] == w[1]) {
        return Err(SyncError::InvalidRotationAxes {
            reason: "rotation axes contain duplicates".to_string(),
        });
    }

    Ok(axes)
}
