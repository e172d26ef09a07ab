//! Wizard client binary.
//!
//! Main entry point for the terminal match-setup wizard.
//!
//! # Examples
//!
//! ```bash
//! # Slow screens down to watch transitions and try cancelling mid-flight
//! WIZARD_NAV_DELAY_MS=750 cargo run -p wizard-client
//! ```

use std::sync::Arc;

use anyhow::Result;
use wizard_client::{ClientConfig, ConsoleApp, ConsoleNavigator, logging};
use wizard_runtime::{DefaultSessionFactory, WizardCoordinator};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    // 1. Load configuration from environment
    let config = ClientConfig::from_env();

    // 2. Setup logging
    let log_file = logging::setup_logging(config.session_id.as_deref())?;
    println!("logging to {}", log_file.display());

    tracing::info!(
        nav_delay_ms = config.nav_delay.as_millis() as u64,
        teardown_timeout_ms = config.wizard.teardown_timeout.as_millis() as u64,
        "starting wizard client"
    );

    // 3. Build coordinator
    let coordinator = WizardCoordinator::builder()
        .config(config.wizard.clone())
        .navigator(Arc::new(ConsoleNavigator::new(config.nav_delay)))
        .session_factory(DefaultSessionFactory)
        .build()?;

    // 4. Run the prompt until quit
    ConsoleApp::new(coordinator).run().await?;

    tracing::info!("client shutdown complete");
    Ok(())
}
