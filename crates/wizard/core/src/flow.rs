//! Step, intent, and abort vocabulary shared by the coordinator and its hosts.

/// Screen the wizard currently shows. `None` is both initial and terminal.
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
pub enum WizardStep {
    #[default]
    None,
    ModeSelection,
    MatchSetup,
}

/// A discrete user action request.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Intent {
    Continue,
    Back,
    Start,
    /// Out-of-band: never occupies the mailbox slot and is accepted while busy.
    Cancel,
}

impl Intent {
    pub const fn is_cancel(self) -> bool {
        matches!(self, Intent::Cancel)
    }

    /// Step in which this intent has an effect, if any.
    pub const fn expected_step(self) -> Option<WizardStep> {
        match self {
            Intent::Continue => Some(WizardStep::ModeSelection),
            Intent::Back | Intent::Start => Some(WizardStep::MatchSetup),
            Intent::Cancel => None,
        }
    }
}

/// Why a wizard run was torn down. Diagnostic only: teardown is identical
/// for every reason.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AbortReason {
    UserCancel,
    SceneChange,
    StartCancelled,
    Error,
    GameStarted,
}
