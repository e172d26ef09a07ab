//! Topic-based event bus for wizard events.
//!
//! Events are published to specific topics and consumers subscribe only to
//! the topics they need. The bus is best-effort: events published while
//! nobody listens are dropped.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{LifecycleEvent, NavigationEvent, RunId};
