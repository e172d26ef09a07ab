//! Runtime orchestration for the match-setup wizard.
//!
//! This crate wires the session, the intent mailbox, and the per-run intent
//! worker into a coordinator API. Hosts embed [`WizardCoordinator`], provide
//! a [`Navigator`] for the two wizard screens, publish intents from any
//! thread, and observe progress through signals and the event bus.
//!
//! Modules are organized by responsibility:
//! - [`coordinator`] hosts the coordinator and builder
//! - [`api`] exposes the collaborator traits and error types hosts implement against
//! - [`session`] holds the reducer-driven configuration snapshot
//! - [`mailbox`] provides the single-slot intent handoff
//! - [`events`] provides topic-based event bus for lifecycle and navigation events
//! - [`workers`] keeps background tasks internal to the crate
pub mod api;
pub mod config;
pub mod coordinator;
pub mod events;
pub mod mailbox;
pub mod session;

mod run;
mod signals;
mod workers;

pub use api::{
    BoxError, CoordinatorError, DefaultSessionFactory, ErrorDisplay, InlineDispatcher,
    NavigationContext, NavigationError, NavigationOp, NavigationResult, Navigator, Result,
    SessionFactory, UiDispatcher, WizardError,
};
pub use config::WizardConfig;
pub use coordinator::{WizardCoordinator, WizardCoordinatorBuilder};
pub use events::{Event, EventBus, LifecycleEvent, NavigationEvent, RunId, Topic};
pub use mailbox::{IntentMailbox, MailboxRecv};
pub use run::AbortOutcome;
pub use session::{Session, SessionError, SessionResult};
