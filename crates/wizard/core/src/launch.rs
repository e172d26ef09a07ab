//! Terminal launch configuration handed to the game once the wizard finishes.
use crate::mode::ModeConfig;
use crate::opponent::{HumanOpponentKind, OpponentType};
use crate::snapshot::SessionSnapshot;
use crate::validation::{ValidationError, ValidationErrors, ValidationField, keys, validate};

/// Concrete opponent setup. Matchmaking has no variant until the feature ships.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum OpponentConfig {
    Bot { difficulty_id: String },
    LocalHuman,
    DirectInvite { target_player_id: String },
}

/// Fully validated match configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaunchConfig {
    pub mode_id: String,
    pub mode_config: ModeConfig,
    pub opponent: OpponentConfig,
}

impl TryFrom<&SessionSnapshot> for LaunchConfig {
    type Error = ValidationErrors;

    fn try_from(snapshot: &SessionSnapshot) -> Result<Self, Self::Error> {
        build_launch_config(snapshot)
    }
}

/// Build a [`LaunchConfig`] from a snapshot with zero validation errors.
///
/// Validation is recomputed here rather than trusted from a caller, and on
/// failure every accumulated error is returned, not just the first.
pub fn build_launch_config(snapshot: &SessionSnapshot) -> Result<LaunchConfig, ValidationErrors> {
    let errors = validate(snapshot);
    if !errors.is_empty() {
        return Err(errors);
    }

    let mode_config = snapshot.mode_config.clone().ok_or(ValidationError::new(
        ValidationField::ModeConfig,
        keys::MODE_CONFIG_REQUIRED,
    ))?;

    Ok(LaunchConfig {
        mode_id: snapshot.mode_id.trim().to_owned(),
        mode_config,
        opponent: opponent_config(snapshot)?,
    })
}

fn opponent_config(snapshot: &SessionSnapshot) -> Result<OpponentConfig, ValidationError> {
    match (snapshot.opponent_type, snapshot.human_kind) {
        (OpponentType::Bot, _) => required(
            snapshot.bot_difficulty_id.as_deref(),
            ValidationField::BotDifficultyId,
            keys::BOT_DIFFICULTY_REQUIRED,
        )
        .map(|difficulty_id| OpponentConfig::Bot { difficulty_id }),
        (OpponentType::Human, HumanOpponentKind::Local) => Ok(OpponentConfig::LocalHuman),
        (OpponentType::Human, HumanOpponentKind::DirectInvite) => required(
            snapshot.target_player_id.as_deref(),
            ValidationField::TargetPlayerId,
            keys::TARGET_PLAYER_REQUIRED,
        )
        .map(|target_player_id| OpponentConfig::DirectInvite { target_player_id }),
        (OpponentType::Human, HumanOpponentKind::Matchmaking) => Err(ValidationError::new(
            ValidationField::Matchmaking,
            keys::MATCHMAKING_UNAVAILABLE,
        )),
    }
}

fn required(
    value: Option<&str>,
    field: ValidationField,
    message_key: &'static str,
) -> Result<String, ValidationError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .ok_or(ValidationError::new(field, message_key))
}
