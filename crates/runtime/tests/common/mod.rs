//! Shared fixtures for coordinator integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use wizard_core::{ClassicModeConfig, ModeConfig, OpponentType, WizardStep};
use wizard_runtime::{
    BoxError, Event, LifecycleEvent, NavigationContext, NavigationError, NavigationOp,
    NavigationResult, Navigator, Session, UiDispatcher, WizardConfig, WizardCoordinator,
};

/// Upper bound for any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(5);

pub const TEARDOWN_TIMEOUT: Duration = Duration::from_millis(500);
pub const HANDOFF_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, thiserror::Error)]
#[error("{0} unavailable")]
pub struct ScreenUnavailable(pub NavigationOp);

/// Navigator that records every call and can be told to fail, stall, or
/// slow down specific operations.
#[derive(Default)]
pub struct RecordingNavigator {
    calls: Mutex<Vec<NavigationOp>>,
    failing: Mutex<HashSet<NavigationOp>>,
    stalling: Mutex<HashSet<NavigationOp>>,
    delays: Mutex<HashMap<NavigationOp, Duration>>,
}

impl RecordingNavigator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_on(&self, op: NavigationOp) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Block `op` until the call is cancelled.
    pub fn stall_on(&self, op: NavigationOp) {
        self.stalling.lock().unwrap().insert(op);
    }

    pub fn delay(&self, op: NavigationOp, delay: Duration) {
        self.delays.lock().unwrap().insert(op, delay);
    }

    pub fn calls(&self) -> Vec<NavigationOp> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: NavigationOp) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| **call == op)
            .count()
    }

    /// Poll until `op` has been called at least once.
    pub async fn wait_for_call(&self, op: NavigationOp) {
        tokio::time::timeout(WAIT, async {
            while self.count(op) == 0 {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("navigator never saw {op}"));
    }

    async fn record(&self, op: NavigationOp, ctx: &NavigationContext) -> NavigationResult {
        self.calls.lock().unwrap().push(op);

        let delay = self.delays.lock().unwrap().get(&op).copied();
        if let Some(delay) = delay {
            tokio::select! {
                _ = ctx.cancellation().cancelled() => return Err(NavigationError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if self.stalling.lock().unwrap().contains(&op) {
            ctx.cancellation().cancelled().await;
            return Err(NavigationError::Cancelled);
        }

        if self.failing.lock().unwrap().contains(&op) {
            return Err(NavigationError::failed(ScreenUnavailable(op)));
        }

        Ok(())
    }
}

#[async_trait]
impl Navigator for RecordingNavigator {
    async fn open_mode_selection(&self, ctx: &NavigationContext) -> NavigationResult {
        self.record(NavigationOp::OpenModeSelection, ctx).await
    }

    async fn close_mode_selection(&self, ctx: &NavigationContext) -> NavigationResult {
        self.record(NavigationOp::CloseModeSelection, ctx).await
    }

    async fn open_match_setup(&self, ctx: &NavigationContext) -> NavigationResult {
        self.record(NavigationOp::OpenMatchSetup, ctx).await
    }

    async fn close_match_setup(&self, ctx: &NavigationContext) -> NavigationResult {
        self.record(NavigationOp::CloseMatchSetup, ctx).await
    }

    async fn close_all_wizard_windows(&self, ctx: &NavigationContext) -> NavigationResult {
        self.record(NavigationOp::CloseAllWizardWindows, ctx).await
    }
}

/// UI hand-off that resolves inline until told to hang.
#[derive(Clone, Default)]
pub struct GatedDispatcher {
    stalled: Arc<AtomicBool>,
}

impl GatedDispatcher {
    /// Make every later hand-off wait until its token is cancelled.
    pub fn stall(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl UiDispatcher for GatedDispatcher {
    async fn switch_to_ui(&self, cancel: &CancellationToken) -> NavigationResult {
        if self.stalled.load(Ordering::SeqCst) {
            cancel.cancelled().await;
        }
        if cancel.is_cancelled() {
            return Err(NavigationError::Cancelled);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("session store offline")]
pub struct SessionStoreOffline;

/// Counts sessions created by the factory and how many were disposed.
#[derive(Default)]
pub struct SessionCounters {
    pub created: AtomicUsize,
    pub disposed: AtomicUsize,
    refuse: AtomicBool,
}

impl SessionCounters {
    /// Make the factory fail until called again with `false`.
    pub fn refuse_creation(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

pub struct Harness {
    pub coordinator: WizardCoordinator,
    pub navigator: Arc<RecordingNavigator>,
    pub dispatcher: GatedDispatcher,
    pub sessions: Arc<SessionCounters>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_navigator(RecordingNavigator::new())
    }

    pub fn with_navigator(navigator: Arc<RecordingNavigator>) -> Self {
        let sessions = Arc::new(SessionCounters::default());
        let factory = {
            let sessions = Arc::clone(&sessions);
            move || -> Result<Session, BoxError> {
                if sessions.refuse.load(Ordering::SeqCst) {
                    return Err(SessionStoreOffline.into());
                }
                sessions.created.fetch_add(1, Ordering::SeqCst);
                let session = Session::new();
                let sessions = Arc::clone(&sessions);
                session.on_dispose(move || {
                    sessions.disposed.fetch_add(1, Ordering::SeqCst);
                })?;
                Ok(session)
            }
        };

        let config = WizardConfig {
            teardown_timeout: TEARDOWN_TIMEOUT,
            handoff_timeout: HANDOFF_TIMEOUT,
            ..WizardConfig::default()
        };
        let dispatcher = GatedDispatcher::default();

        let coordinator = WizardCoordinator::builder()
            .config(config)
            .navigator(Arc::clone(&navigator))
            .session_factory(factory)
            .dispatcher(dispatcher.clone())
            .build()
            .expect("coordinator should build");

        Self {
            coordinator,
            navigator,
            dispatcher,
            sessions,
        }
    }

    pub async fn start(&self) {
        self.coordinator
            .start_wizard(&CancellationToken::new())
            .await
            .expect("wizard should start");
    }
}

/// Receive events until a `Finished` lifecycle event arrives.
pub async fn next_finished(events: &mut broadcast::Receiver<Event>) -> LifecycleEvent {
    tokio::time::timeout(WAIT, async {
        loop {
            match events.recv().await {
                Ok(Event::Lifecycle(event @ LifecycleEvent::Finished { .. })) => return event,
                Ok(_) => continue,
                Err(err) => panic!("event stream failed: {err}"),
            }
        }
    })
    .await
    .expect("wizard should finish")
}

/// Receive navigation events until `matches` accepts one.
pub async fn next_event_matching(
    events: &mut broadcast::Receiver<Event>,
    matches: impl Fn(&Event) -> bool,
) -> Event {
    tokio::time::timeout(WAIT, async {
        loop {
            match events.recv().await {
                Ok(event) if matches(&event) => return event,
                Ok(_) => continue,
                Err(err) => panic!("event stream failed: {err}"),
            }
        }
    })
    .await
    .expect("expected event should arrive")
}

/// Wait until the coordinator's step signal reads `step`.
pub async fn wait_for_step(coordinator: &WizardCoordinator, step: WizardStep) {
    let mut steps = coordinator.subscribe_step().expect("step signal");
    tokio::time::timeout(WAIT, steps.wait_for(|current| *current == step))
        .await
        .unwrap_or_else(|_| panic!("wizard never reached {step}"))
        .map(|_| ())
        .expect("step signal closed");
}

/// A session that satisfies validation: classic mode against a bot.
pub fn make_start_ready(session: &Session) {
    session
        .select_mode(ModeConfig::Classic(ClassicModeConfig::default()))
        .expect("select mode");
    session
        .set_opponent_type(OpponentType::Bot)
        .expect("opponent type");
    session.set_bot_difficulty("hard").expect("difficulty");
}
