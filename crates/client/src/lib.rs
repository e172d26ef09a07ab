//! Terminal frontend for the match-setup wizard.
//!
//! # Architecture
//!
//! ```text
//! main (composition root)
//!   ├─→ ClientConfig + logging (environment, file tracing)
//!   ├─→ WizardCoordinator (wizard-runtime) with a ConsoleNavigator
//!   └─→ ConsoleApp (prompt loop: commands → session reducers / intents)
//! ```
//!
//! The app never mutates wizard step state directly: screen changes go
//! through intents, configuration through the active session.

pub mod command;
pub mod config;
pub mod logging;
pub mod navigator;

mod app;

pub use app::ConsoleApp;
pub use command::{Command, ParseError};
pub use config::ClientConfig;
pub use navigator::ConsoleNavigator;
