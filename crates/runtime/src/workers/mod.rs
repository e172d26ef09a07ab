//! Worker tasks that back the coordinator.
//!
//! One intent worker runs per active wizard run. It is the only place step
//! transitions happen; producers only ever enqueue intents.

mod intent;

pub(crate) use intent::IntentWorker;
