//! Unified error types surfaced by the wizard runtime API.
//!
//! [`CoordinatorError`] is what fallible coordinator calls return.
//! [`WizardError`] is the observable, display-oriented record published on
//! the `current_error` signal when a run fails while the caller is gone.
use std::fmt;

use thiserror::Error;

use super::navigator::{NavigationError, NavigationOp};
use crate::session::SessionError;

/// Boxed error returned by host-implemented collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, CoordinatorError>;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("wizard coordinator already disposed")]
    Disposed,

    #[error("no wizard is active")]
    Inactive,

    #[error("wizard start cancelled")]
    Cancelled,

    #[error("session factory failed")]
    SessionFactory(#[source] BoxError),

    #[error("navigator {operation} failed")]
    Navigation {
        operation: NavigationOp,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("coordinator requires a navigator before building")]
    MissingNavigator,

    #[error("coordinator requires a session factory before building")]
    MissingSessionFactory,
}

impl CoordinatorError {
    /// Map a navigator result error; cancellation stays a first-class variant.
    pub(crate) fn from_navigation(operation: NavigationOp, error: NavigationError) -> Self {
        match error {
            NavigationError::Cancelled => CoordinatorError::Cancelled,
            NavigationError::Failed(source) => CoordinatorError::Navigation { operation, source },
        }
    }
}

/// How a host should present a [`WizardError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorDisplay {
    /// Pauses interaction until dismissed or the host navigates away.
    Modal,
}

/// Observable error state of the coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct WizardError {
    /// Stable machine-readable code.
    pub code: &'static str,
    pub blocking: bool,
    pub display: ErrorDisplay,
    /// Rendered cause chain, if any.
    pub cause: Option<String>,
}

impl WizardError {
    pub const UNHANDLED_EXCEPTION: &'static str = "wizard.unhandled_exception";

    /// Blocking modal error for an operational failure.
    pub fn unhandled(cause: &(dyn std::error::Error + 'static)) -> Self {
        Self {
            code: Self::UNHANDLED_EXCEPTION,
            blocking: true,
            display: ErrorDisplay::Modal,
            cause: Some(render_chain(cause)),
        }
    }
}

impl fmt::Display for WizardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.code, cause),
            None => write!(f, "{}", self.code),
        }
    }
}

fn render_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        rendered.push_str(": ");
        rendered.push_str(&inner.to_string());
        source = inner.source();
    }
    rendered
}
