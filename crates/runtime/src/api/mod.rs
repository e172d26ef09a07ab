//! Public wizard runtime API surface.
//!
//! This module gathers the types exposed to hosts of the coordinator so other
//! layers can stay focused on orchestration and the processing worker.

pub mod errors;
pub mod factory;
pub mod navigator;

pub use errors::{BoxError, CoordinatorError, ErrorDisplay, Result, WizardError};
pub use factory::{DefaultSessionFactory, SessionFactory};
pub use navigator::{
    InlineDispatcher, NavigationContext, NavigationError, NavigationOp, NavigationResult,
    Navigator, UiDispatcher,
};
