//! Observable coordinator state for UI binding.
//!
//! These are the watch-channel counterparts of the atomic fast-path flags on
//! [`crate::run::ActiveRun`]. Senders are dropped when the coordinator is
//! disposed, which closes every outstanding receiver.
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use wizard_core::WizardStep;

use crate::api::WizardError;

struct Senders {
    transitioning: watch::Sender<bool>,
    submitting: watch::Sender<bool>,
    error: watch::Sender<Option<WizardError>>,
    step: watch::Sender<WizardStep>,
}

pub(crate) struct WizardSignals {
    senders: Mutex<Option<Senders>>,
}

impl WizardSignals {
    pub(crate) fn new() -> Self {
        Self {
            senders: Mutex::new(Some(Senders {
                transitioning: watch::channel(false).0,
                submitting: watch::channel(false).0,
                error: watch::channel(None).0,
                step: watch::channel(WizardStep::None).0,
            })),
        }
    }

    pub(crate) fn set_transitioning(&self, value: bool) {
        if let Some(senders) = self.lock().as_ref() {
            senders.transitioning.send_if_modified(|current| replace(current, value));
        }
    }

    pub(crate) fn set_submitting(&self, value: bool) {
        if let Some(senders) = self.lock().as_ref() {
            senders.submitting.send_if_modified(|current| replace(current, value));
        }
    }

    pub(crate) fn set_step(&self, step: WizardStep) {
        if let Some(senders) = self.lock().as_ref() {
            senders.step.send_if_modified(|current| replace(current, step));
        }
    }

    pub(crate) fn set_error(&self, error: Option<WizardError>) {
        if let Some(senders) = self.lock().as_ref() {
            senders.error.send_if_modified(|current| replace(current, error));
        }
    }

    /// Return every signal to its idle value.
    pub(crate) fn reset(&self) {
        self.set_transitioning(false);
        self.set_submitting(false);
        self.set_step(WizardStep::None);
    }

    pub(crate) fn transitioning(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|senders| *senders.transitioning.borrow())
    }

    pub(crate) fn submitting(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|senders| *senders.submitting.borrow())
    }

    pub(crate) fn step(&self) -> WizardStep {
        self.lock()
            .as_ref()
            .map_or(WizardStep::None, |senders| *senders.step.borrow())
    }

    pub(crate) fn error(&self) -> Option<WizardError> {
        self.lock()
            .as_ref()
            .and_then(|senders| senders.error.borrow().clone())
    }

    pub(crate) fn subscribe_transitioning(&self) -> Option<watch::Receiver<bool>> {
        self.lock()
            .as_ref()
            .map(|senders| senders.transitioning.subscribe())
    }

    pub(crate) fn subscribe_submitting(&self) -> Option<watch::Receiver<bool>> {
        self.lock()
            .as_ref()
            .map(|senders| senders.submitting.subscribe())
    }

    pub(crate) fn subscribe_step(&self) -> Option<watch::Receiver<WizardStep>> {
        self.lock().as_ref().map(|senders| senders.step.subscribe())
    }

    pub(crate) fn subscribe_error(&self) -> Option<watch::Receiver<Option<WizardError>>> {
        self.lock().as_ref().map(|senders| senders.error.subscribe())
    }

    /// Drop the senders; later writes are ignored.
    pub(crate) fn release(&self) {
        self.lock().take();
    }

    fn lock(&self) -> MutexGuard<'_, Option<Senders>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn replace<T: PartialEq>(current: &mut T, value: T) -> bool {
    if *current == value {
        return false;
    }
    *current = value;
    true
}
