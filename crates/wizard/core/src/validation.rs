//! Start-readiness validation.
//!
//! Validation is a pure function of a [`SessionSnapshot`]; nothing is cached
//! beyond the snapshot it was computed from. Errors are advisory: UI layers
//! use them to grey out the start affordance and resolve `message_key` into
//! localized text.
use std::fmt;

use crate::opponent::{HumanOpponentKind, OpponentType};
use crate::snapshot::SessionSnapshot;

/// Snapshot field a validation error is attached to.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::AsRefStr,
    strum::IntoStaticStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationField {
    ModeId,
    ModeConfig,
    BotDifficultyId,
    TargetPlayerId,
    Matchmaking,
}

/// Localization keys used by [`ValidationError::message_key`].
pub mod keys {
    pub const MODE_REQUIRED: &str = "wizard.validation.mode_required";
    pub const MODE_CONFIG_REQUIRED: &str = "wizard.validation.mode_config_required";
    pub const BOT_DIFFICULTY_REQUIRED: &str = "wizard.validation.bot_difficulty_required";
    pub const TARGET_PLAYER_REQUIRED: &str = "wizard.validation.target_player_required";
    pub const MATCHMAKING_UNAVAILABLE: &str = "wizard.validation.matchmaking_unavailable";
}

/// A single (field, message key) pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[error("{field}: {message_key}")]
pub struct ValidationError {
    pub field: ValidationField,
    pub message_key: &'static str,
}

impl ValidationError {
    pub const fn new(field: ValidationField, message_key: &'static str) -> Self {
        Self { field, message_key }
    }
}

/// Every validation error of one snapshot, in rule order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// True if any error is attached to `field`.
    pub fn contains(&self, field: ValidationField) -> bool {
        self.0.iter().any(|error| error.field == field)
    }

    pub fn as_slice(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }

    fn push(&mut self, field: ValidationField, message_key: &'static str) {
        self.0.push(ValidationError::new(field, message_key));
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "no validation errors");
        }
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Compute all validation errors of `snapshot`.
///
/// Human/Matchmaking always yields a `Matchmaking` error: matchmaking is
/// recorded as intent only and cannot launch yet.
pub fn validate(snapshot: &SessionSnapshot) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    if snapshot.mode_id.trim().is_empty() {
        errors.push(ValidationField::ModeId, keys::MODE_REQUIRED);
    }
    if snapshot.mode_config.is_none() {
        errors.push(ValidationField::ModeConfig, keys::MODE_CONFIG_REQUIRED);
    }

    match (snapshot.opponent_type, snapshot.human_kind) {
        (OpponentType::Bot, _) => {
            if is_blank(snapshot.bot_difficulty_id.as_deref()) {
                errors.push(
                    ValidationField::BotDifficultyId,
                    keys::BOT_DIFFICULTY_REQUIRED,
                );
            }
        }
        (OpponentType::Human, HumanOpponentKind::Local) => {}
        (OpponentType::Human, HumanOpponentKind::DirectInvite) => {
            if is_blank(snapshot.target_player_id.as_deref()) {
                errors.push(ValidationField::TargetPlayerId, keys::TARGET_PLAYER_REQUIRED);
            }
        }
        (OpponentType::Human, HumanOpponentKind::Matchmaking) => {
            errors.push(ValidationField::Matchmaking, keys::MATCHMAKING_UNAVAILABLE);
        }
    }

    errors
}
