//! Coordinator configuration and environment loader.
use std::env;
use std::time::Duration;

/// Tunables shared by the coordinator and its processing worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WizardConfig {
    /// Capacity of each event bus topic.
    pub event_buffer_size: usize,
    /// Bound on best-effort window teardown and on awaiting the processing
    /// worker during an abort.
    pub teardown_timeout: Duration,
    /// Bound on the UI-context hand-off performed during an abort.
    pub handoff_timeout: Duration,
}

impl WizardConfig {
    pub const DEFAULT_EVENT_BUFFER: usize = 64;
    pub const DEFAULT_TEARDOWN_TIMEOUT: Duration = Duration::from_millis(2_000);
    pub const DEFAULT_HANDOFF_TIMEOUT: Duration = Duration::from_millis(500);

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `WIZARD_EVENT_BUFFER` - Events buffered per topic (default: 64)
    /// - `WIZARD_TEARDOWN_TIMEOUT_MS` - Abort teardown bound (default: 2000)
    /// - `WIZARD_HANDOFF_TIMEOUT_MS` - UI hand-off bound during abort (default: 500)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(capacity) = parse::<usize>(lookup("WIZARD_EVENT_BUFFER")) {
            config.event_buffer_size = capacity.max(1);
        }
        if let Some(millis) = parse::<u64>(lookup("WIZARD_TEARDOWN_TIMEOUT_MS")) {
            config.teardown_timeout = Duration::from_millis(millis);
        }
        if let Some(millis) = parse::<u64>(lookup("WIZARD_HANDOFF_TIMEOUT_MS")) {
            config.handoff_timeout = Duration::from_millis(millis);
        }

        config
    }
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: Self::DEFAULT_EVENT_BUFFER,
            teardown_timeout: Self::DEFAULT_TEARDOWN_TIMEOUT,
            handoff_timeout: Self::DEFAULT_HANDOFF_TIMEOUT,
        }
    }
}

fn parse<T>(value: Option<String>) -> Option<T>
where
    T: std::str::FromStr,
{
    value?.trim().parse().ok()
}
