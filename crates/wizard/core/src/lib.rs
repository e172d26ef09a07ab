//! Pure configuration model for the match setup wizard.
//!
//! `wizard-core` defines the immutable [`SessionSnapshot`], the reducers and
//! normalization pass that produce new snapshots, start-readiness validation,
//! and the terminal [`LaunchConfig`]. Nothing here suspends or performs I/O;
//! the async coordination lives in `wizard-runtime`.
pub mod flow;
pub mod launch;
pub mod mode;
pub mod opponent;
pub mod snapshot;
pub mod validation;

pub use flow::{AbortReason, Intent, WizardStep};
pub use launch::{LaunchConfig, OpponentConfig, build_launch_config};
pub use mode::{CLASSIC_MODE_ID, ClassicModeConfig, FirstPlayer, ModeConfig};
pub use opponent::{HumanOpponentKind, MatchmakingState, OpponentType};
pub use snapshot::{SessionSnapshot, Version};
pub use validation::{ValidationError, ValidationErrors, ValidationField, validate};
