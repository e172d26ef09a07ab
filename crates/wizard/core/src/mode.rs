//! Game mode descriptors and their mode-specific configuration payloads.

/// Identifier of the classic mode as stored in [`crate::SessionSnapshot::mode_id`].
pub const CLASSIC_MODE_ID: &str = "classic";

/// Which side moves first in a classic match.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FirstPlayer {
    /// The local player opens.
    #[default]
    Host,
    /// The opponent (bot or human) opens.
    Opponent,
    /// Decided by a coin flip when the match launches.
    Random,
}

/// Settings for the classic mode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassicModeConfig {
    /// Per-turn time limit in seconds; `None` disables the turn timer.
    pub turn_time_limit_secs: Option<u32>,
    pub first_player: FirstPlayer,
}

impl ClassicModeConfig {
    pub fn new(turn_time_limit_secs: Option<u32>, first_player: FirstPlayer) -> Self {
        Self {
            turn_time_limit_secs,
            first_player,
        }
    }
}

/// Mode-specific configuration. New game modes add a variant here.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "mode", rename_all = "snake_case"))]
pub enum ModeConfig {
    Classic(ClassicModeConfig),
}

impl ModeConfig {
    /// Mode id this configuration belongs to.
    pub fn mode_id(&self) -> &'static str {
        match self {
            ModeConfig::Classic(_) => CLASSIC_MODE_ID,
        }
    }

    /// Default configuration for a known mode id.
    pub fn default_for(mode_id: &str) -> Option<Self> {
        match mode_id.trim() {
            id if id.eq_ignore_ascii_case(CLASSIC_MODE_ID) => {
                Some(ModeConfig::Classic(ClassicModeConfig::default()))
            }
            _ => None,
        }
    }
}

impl From<ClassicModeConfig> for ModeConfig {
    fn from(config: ClassicModeConfig) -> Self {
        ModeConfig::Classic(config)
    }
}
