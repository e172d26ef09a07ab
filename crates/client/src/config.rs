//! Client configuration structures and loaders.
use std::env;
use std::time::Duration;

use wizard_runtime::WizardConfig;

/// Configuration required to bootstrap the terminal client.
#[derive(Clone, Debug, Default)]
pub struct ClientConfig {
    pub wizard: WizardConfig,
    /// Names the log directory; generated from the clock when unset.
    pub session_id: Option<String>,
    /// Simulated latency of every screen open/close.
    pub nav_delay: Duration,
}

impl ClientConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `WIZARD_SESSION_ID` - Log directory name (default: `session_<timestamp>`)
    /// - `WIZARD_NAV_DELAY_MS` - Simulated screen latency (default: 0)
    /// - plus everything [`WizardConfig::from_env`] reads
    pub fn from_env() -> Self {
        let mut config = Self {
            wizard: WizardConfig::from_env(),
            ..Self::default()
        };

        config.session_id = env::var("WIZARD_SESSION_ID")
            .ok()
            .filter(|id| !id.trim().is_empty());

        if let Some(millis) = read_env::<u64>("WIZARD_NAV_DELAY_MS") {
            config.nav_delay = Duration::from_millis(millis);
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.trim().parse().ok()
}
