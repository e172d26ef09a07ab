//! Host-implemented collaborators: screen navigation and UI-context hand-off.
//!
//! The coordinator drives a [`Navigator`] but the navigator never calls back
//! into the coordinator except by publishing intents. Every call is
//! cancellable through the [`NavigationContext`] token and reports
//! cancellation as [`NavigationError::Cancelled`], separate from failures.
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::errors::BoxError;
use crate::session::Session;

pub type NavigationResult = std::result::Result<(), NavigationError>;

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("navigation cancelled")]
    Cancelled,

    #[error(transparent)]
    Failed(BoxError),
}

impl NavigationError {
    pub fn failed(error: impl Into<BoxError>) -> Self {
        NavigationError::Failed(error.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, NavigationError::Cancelled)
    }
}

/// Navigator operations, used for error reporting and logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum NavigationOp {
    OpenModeSelection,
    CloseModeSelection,
    OpenMatchSetup,
    CloseMatchSetup,
    CloseAllWizardWindows,
}

/// Per-call context handed to the navigator.
#[derive(Clone, Debug)]
pub struct NavigationContext {
    session: Arc<Session>,
    cancel: CancellationToken,
}

impl NavigationContext {
    pub(crate) fn new(session: Arc<Session>, cancel: CancellationToken) -> Self {
        Self { session, cancel }
    }

    /// Session of the active run; views bind to it.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Fires when the run is aborted or the coordinator is disposed.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Opens and closes the two wizard screens.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn open_mode_selection(&self, ctx: &NavigationContext) -> NavigationResult;

    async fn close_mode_selection(&self, ctx: &NavigationContext) -> NavigationResult;

    async fn open_match_setup(&self, ctx: &NavigationContext) -> NavigationResult;

    async fn close_match_setup(&self, ctx: &NavigationContext) -> NavigationResult;

    /// Best-effort teardown of every wizard window. Called exactly once per
    /// aborted run, with a fresh token bounded by the teardown timeout.
    async fn close_all_wizard_windows(&self, ctx: &NavigationContext) -> NavigationResult;
}

/// Explicit execution-context hand-off.
///
/// Hosts whose windows must be touched from a specific context (a UI or
/// main thread) implement this to resolve once the following navigator
/// calls may run there. The coordinator awaits it before navigating and
/// bounds the wait during teardown.
#[async_trait]
pub trait UiDispatcher: Send + Sync {
    async fn switch_to_ui(&self, cancel: &CancellationToken) -> NavigationResult;
}

/// Dispatcher for hosts without a dedicated UI context.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineDispatcher;

#[async_trait]
impl UiDispatcher for InlineDispatcher {
    async fn switch_to_ui(&self, cancel: &CancellationToken) -> NavigationResult {
        if cancel.is_cancelled() {
            return Err(NavigationError::Cancelled);
        }
        Ok(())
    }
}
