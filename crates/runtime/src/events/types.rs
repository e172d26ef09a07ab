//! Event types for different topics.

use wizard_core::{AbortReason, Intent, LaunchConfig, ValidationErrors, WizardStep};

/// Identifier of one wizard run, increasing per coordinator.
pub type RunId = u64;

/// Wizard run lifecycle events.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum LifecycleEvent {
    /// The first screen opened and intents are accepted.
    Started { run: RunId },

    /// The run was torn down. `launch_config` is present only when the
    /// player started a game.
    Finished {
        run: RunId,
        reason: AbortReason,
        launch_config: Option<LaunchConfig>,
    },
}

/// Step transitions and intent handling inside a run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum NavigationEvent {
    StepChanged {
        run: RunId,
        from: WizardStep,
        to: WizardStep,
    },

    /// An intent reached the worker in a step where it has no effect.
    IntentDropped {
        run: RunId,
        intent: Intent,
        step: WizardStep,
    },

    /// `Start` was refused because the session is not start-ready.
    LaunchRejected { run: RunId, errors: ValidationErrors },
}
