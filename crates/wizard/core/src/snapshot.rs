//! Immutable configuration snapshot and its pure reducers.
//!
//! A [`SessionSnapshot`] is never mutated in place once published: reducers
//! consume a clone and return the next value, and the owning session stamps
//! the version and runs [`SessionSnapshot::normalized`] before storing it.
use crate::launch::{LaunchConfig, build_launch_config};
use crate::mode::ModeConfig;
use crate::opponent::{HumanOpponentKind, MatchmakingState, OpponentType};
use crate::validation::{ValidationErrors, validate};

/// Monotonic mutation counter of a session.
pub type Version = u64;

/// Complete wizard configuration at one version.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionSnapshot {
    /// Selected mode id; empty until the player picks one.
    pub mode_id: String,
    pub mode_config: Option<ModeConfig>,
    pub opponent_type: OpponentType,
    /// Live only while `opponent_type` is `Bot`.
    pub bot_difficulty_id: Option<String>,
    /// Remembered across `Bot` selections; live only for `Human`.
    pub human_kind: HumanOpponentKind,
    /// Live only for `Human` + `DirectInvite`.
    pub target_player_id: Option<String>,
    /// Live only for `Human` + `Matchmaking`.
    pub matchmaking_state: MatchmakingState,
    pub version: Version,
}

impl SessionSnapshot {
    /// Select a mode together with its configuration.
    pub fn with_mode(mut self, config: ModeConfig) -> Self {
        self.mode_id = config.mode_id().to_owned();
        self.mode_config = Some(config);
        self
    }

    pub fn with_mode_id(mut self, mode_id: impl Into<String>) -> Self {
        self.mode_id = mode_id.into();
        self
    }

    pub fn with_mode_config(mut self, config: ModeConfig) -> Self {
        self.mode_config = Some(config);
        self
    }

    pub fn with_opponent_type(mut self, opponent_type: OpponentType) -> Self {
        self.opponent_type = opponent_type;
        self
    }

    pub fn with_bot_difficulty(mut self, difficulty_id: impl Into<String>) -> Self {
        self.bot_difficulty_id = Some(difficulty_id.into());
        self
    }

    pub fn with_human_kind(mut self, kind: HumanOpponentKind) -> Self {
        self.human_kind = kind;
        self
    }

    pub fn with_target_player(mut self, player_id: impl Into<String>) -> Self {
        self.target_player_id = Some(player_id.into());
        self
    }

    pub fn with_matchmaking_state(mut self, state: MatchmakingState) -> Self {
        self.matchmaking_state = state;
        self
    }

    /// Overwrite the version stamp. Sessions call this after every reducer.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Enforce the cross-field invariants so only the fields relevant to the
    /// current opponent selection carry values.
    ///
    /// The rules look only at the final opponent type/kind, never at which
    /// field a reducer touched, so the result is deterministic and applying
    /// it twice equals applying it once.
    pub fn normalized(mut self) -> Self {
        match self.opponent_type {
            OpponentType::Human => {
                self.bot_difficulty_id = None;
                if self.human_kind != HumanOpponentKind::DirectInvite {
                    self.target_player_id = None;
                }
                if self.human_kind != HumanOpponentKind::Matchmaking {
                    self.matchmaking_state = MatchmakingState::Idle;
                }
            }
            OpponentType::Bot => {
                // human_kind is left untouched on purpose.
                self.target_player_id = None;
                self.matchmaking_state = MatchmakingState::Idle;
            }
        }
        self
    }

    /// Validation errors for this snapshot, recomputed on every call.
    pub fn validate(&self) -> ValidationErrors {
        validate(self)
    }

    /// True when the snapshot has no validation errors.
    pub fn is_start_ready(&self) -> bool {
        self.validate().is_empty()
    }

    /// Build the terminal launch configuration, or every validation error.
    pub fn launch_config(&self) -> Result<LaunchConfig, ValidationErrors> {
        build_launch_config(self)
    }
}
