//! State of one active wizard run.
//!
//! An [`ActiveRun`] is created by `start_wizard`, shared between the
//! coordinator façade, the intent worker, and teardown, and dropped once the
//! run is finished. Fast-path flags are atomics so producers can gate intents
//! without locking; the observable counterparts live in [`crate::signals`].
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use wizard_core::{AbortReason, LaunchConfig};

use crate::api::NavigationContext;
use crate::events::RunId;
use crate::mailbox::IntentMailbox;
use crate::session::Session;

/// Result of tearing down a run, shared by every abort caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbortOutcome {
    pub run: RunId,
    pub reason: AbortReason,
    /// Present only when the run ended with [`AbortReason::GameStarted`].
    pub launch_config: Option<LaunchConfig>,
}

/// Who is asking for the abort. The intent worker must never await itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AbortOrigin {
    Caller,
    ProcessingLoop,
}

#[derive(Debug)]
struct AbortRequest {
    reason: AbortReason,
    launch_config: Option<LaunchConfig>,
}

pub(crate) struct ActiveRun {
    pub(crate) id: RunId,
    pub(crate) session: Arc<Session>,
    pub(crate) cancel: CancellationToken,
    pub(crate) mailbox: IntentMailbox,
    ready: AtomicBool,
    transitioning: AtomicBool,
    submitting: AtomicBool,
    intent_in_flight: AtomicBool,
    teardown_started: AtomicBool,
    request: Mutex<Option<AbortRequest>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    finished: watch::Sender<Option<AbortOutcome>>,
}

impl ActiveRun {
    pub(crate) fn new(id: RunId, session: Arc<Session>, cancel: CancellationToken) -> Self {
        Self {
            id,
            session,
            cancel,
            mailbox: IntentMailbox::new(),
            ready: AtomicBool::new(false),
            transitioning: AtomicBool::new(false),
            submitting: AtomicBool::new(false),
            intent_in_flight: AtomicBool::new(false),
            teardown_started: AtomicBool::new(false),
            request: Mutex::new(None),
            worker: Mutex::new(None),
            finished: watch::channel(None).0,
        }
    }

    pub(crate) fn navigation_context(&self) -> NavigationContext {
        NavigationContext::new(Arc::clone(&self.session), self.cancel.clone())
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub(crate) fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.transitioning.load(Ordering::Acquire) || self.submitting.load(Ordering::Acquire)
    }

    pub(crate) fn set_transitioning(&self, value: bool) {
        self.transitioning.store(value, Ordering::Release);
    }

    pub(crate) fn set_submitting(&self, value: bool) {
        self.submitting.store(value, Ordering::Release);
    }

    /// Claim the single pending-or-in-flight intent slot.
    pub(crate) fn try_acquire_intent_slot(&self) -> bool {
        self.intent_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn release_intent_slot(&self) {
        self.intent_in_flight.store(false, Ordering::Release);
    }

    /// Record why the run should end and cancel it. The first recorded
    /// request wins; returns whether this call recorded it.
    pub(crate) fn request_abort(
        &self,
        reason: AbortReason,
        launch_config: Option<LaunchConfig>,
    ) -> bool {
        let recorded = {
            let mut request = self.lock_request();
            if request.is_some() {
                false
            } else {
                *request = Some(AbortRequest {
                    reason,
                    launch_config,
                });
                true
            }
        };
        self.cancel.cancel();
        recorded
    }

    pub(crate) fn requested_reason(&self) -> Option<AbortReason> {
        self.lock_request().as_ref().map(|request| request.reason)
    }

    /// Mark teardown as started. Returns `true` for exactly one caller.
    pub(crate) fn begin_teardown(&self, reason: AbortReason) -> bool {
        {
            let mut request = self.lock_request();
            if request.is_none() {
                *request = Some(AbortRequest {
                    reason,
                    launch_config: None,
                });
            }
        }
        !self.teardown_started.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn is_tearing_down(&self) -> bool {
        self.teardown_started.load(Ordering::Acquire)
    }

    /// Neither cancelled nor tearing down.
    pub(crate) fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && !self.is_tearing_down()
    }

    /// Outcome for the recorded request. Only meaningful after `begin_teardown`.
    pub(crate) fn outcome(&self) -> AbortOutcome {
        let request = self.lock_request();
        AbortOutcome {
            run: self.id,
            reason: request
                .as_ref()
                .map_or(AbortReason::SceneChange, |request| request.reason),
            launch_config: request
                .as_ref()
                .and_then(|request| request.launch_config.clone()),
        }
    }

    pub(crate) fn set_worker(&self, handle: JoinHandle<()>) {
        *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    pub(crate) fn take_worker(&self) -> Option<JoinHandle<()>> {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub(crate) fn finish(&self, outcome: AbortOutcome) {
        self.finished.send_replace(Some(outcome));
    }

    /// Wait until the run's teardown has completed.
    pub(crate) async fn wait_finished(&self) -> AbortOutcome {
        let mut finished = self.finished.subscribe();
        match finished.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().unwrap_or_else(|| self.outcome()),
            // The sender lives as long as `self`; treat closure as finished.
            Err(_) => self.outcome(),
        }
    }

    fn lock_request(&self) -> MutexGuard<'_, Option<AbortRequest>> {
        self.request.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
