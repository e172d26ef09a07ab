//! Opponent selection enums.
//!
//! The snapshot stores all three independently; normalization decides which
//! of them is live for a given [`OpponentType`] / [`HumanOpponentKind`] pair.

/// Who the local player faces.
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
pub enum OpponentType {
    #[default]
    Bot,
    Human,
}

/// How a human opponent is found. Only meaningful while the opponent type is
/// [`OpponentType::Human`], but kept across switches to `Bot` so the last
/// choice is restored when switching back.
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
pub enum HumanOpponentKind {
    /// Hot-seat on the same device.
    #[default]
    Local,
    /// Invite a specific player by id.
    DirectInvite,
    /// Public matchmaking queue.
    Matchmaking,
}

/// Progress of a matchmaking request. Recorded only; no search is performed.
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
pub enum MatchmakingState {
    #[default]
    Idle,
    Searching,
    Found,
    Failed,
    Cancelled,
}

impl MatchmakingState {
    /// True while a request is outstanding.
    pub const fn is_active(self) -> bool {
        matches!(self, MatchmakingState::Searching)
    }
}
