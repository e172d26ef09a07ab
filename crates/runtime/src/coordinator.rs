//! Wizard coordinator and its builder.
//!
//! [`WizardCoordinator`] is a cloneable façade over shared state. It owns the
//! session of the active run, gates producer intents through a single-slot
//! mailbox, and tears runs down exactly once. Step transitions happen only on
//! the intent worker spawned per run; see [`crate::workers`].
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use wizard_core::{AbortReason, Intent, WizardStep};

use crate::api::{
    CoordinatorError, InlineDispatcher, NavigationContext, NavigationError, NavigationOp,
    NavigationResult, Navigator, Result, SessionFactory, UiDispatcher, WizardError,
};
use crate::config::WizardConfig;
use crate::events::{Event, EventBus, LifecycleEvent, NavigationEvent, Topic};
use crate::run::{AbortOrigin, AbortOutcome, ActiveRun};
use crate::session::Session;
use crate::signals::WizardSignals;
use crate::workers::IntentWorker;

/// Orchestrates one wizard run at a time.
///
/// Cheap to clone; every clone drives the same coordinator.
#[derive(Clone)]
pub struct WizardCoordinator {
    inner: Arc<CoordinatorInner>,
}

pub(crate) struct CoordinatorInner {
    config: WizardConfig,
    navigator: Arc<dyn Navigator>,
    factory: Arc<dyn SessionFactory>,
    dispatcher: Arc<dyn UiDispatcher>,
    lifetime: CancellationToken,
    disposed: AtomicBool,
    start_lock: tokio::sync::Mutex<()>,
    active: Mutex<Option<Arc<ActiveRun>>>,
    next_run: AtomicU64,
    signals: WizardSignals,
    events: EventBus,
}

impl WizardCoordinator {
    pub fn builder() -> WizardCoordinatorBuilder {
        WizardCoordinatorBuilder::new()
    }

    /// Start a wizard run and open the mode selection screen.
    ///
    /// A no-op when a run is already active. A run that was cancelled but has
    /// not finished tearing down is awaited first, then a fresh run starts.
    /// `cancel` stays linked to the run: firing it before the first screen
    /// opens fails the start with [`CoordinatorError::Cancelled`]; firing it
    /// later aborts the run with [`AbortReason::StartCancelled`].
    pub async fn start_wizard(&self, cancel: &CancellationToken) -> Result<()> {
        let inner = &self.inner;
        inner.ensure_not_disposed()?;

        let _guard = inner.start_lock.lock().await;
        inner.ensure_not_disposed()?;

        if let Some(run) = inner.current_run() {
            if run.is_live() {
                debug!(target: "wizard::coordinator", "start ignored: wizard already active");
                return Ok(());
            }

            // A cancelled run still holds the slot until its teardown ends.
            debug!(target: "wizard::coordinator", run = run.id, "waiting for previous run to finish");
            let reason = run.requested_reason().unwrap_or(AbortReason::SceneChange);
            inner.abort_run(&run, reason, AbortOrigin::Caller).await;
            inner.ensure_not_disposed()?;
        }
        if cancel.is_cancelled() {
            return Err(CoordinatorError::Cancelled);
        }

        let session = inner
            .factory
            .create_session()
            .map_err(CoordinatorError::SessionFactory)?;

        let id = inner.next_run.fetch_add(1, Ordering::Relaxed) + 1;
        let run = Arc::new(ActiveRun::new(
            id,
            Arc::new(session),
            inner.lifetime.child_token(),
        ));
        *inner.lock_active() = Some(Arc::clone(&run));
        inner.signals.set_error(None);
        link_caller_token(cancel.clone(), Arc::clone(&run));

        info!(target: "wizard::coordinator", run = id, "starting wizard");

        match inner.navigate(NavigationOp::OpenModeSelection, &run).await {
            Ok(())
                if !run.cancel.is_cancelled()
                    && inner.update_signals(&run, |signals| {
                        signals.set_step(WizardStep::ModeSelection)
                    }) =>
            {
                inner.events.publish(NavigationEvent::StepChanged {
                    run: id,
                    from: WizardStep::None,
                    to: WizardStep::ModeSelection,
                });

                let worker = IntentWorker::new(Arc::clone(inner), Arc::clone(&run));
                run.set_worker(tokio::spawn(worker.run()));
                run.set_ready(true);

                inner.events.publish(LifecycleEvent::Started { run: id });
                info!(target: "wizard::coordinator", run = id, "wizard ready for intents");
                Ok(())
            }
            Ok(()) | Err(NavigationError::Cancelled) => {
                let reason = run
                    .requested_reason()
                    .unwrap_or(AbortReason::StartCancelled);
                debug!(target: "wizard::coordinator", run = id, %reason, "start cancelled");
                inner.abort_run(&run, reason, AbortOrigin::Caller).await;
                Err(CoordinatorError::Cancelled)
            }
            Err(NavigationError::Failed(source)) => {
                let err = CoordinatorError::Navigation {
                    operation: NavigationOp::OpenModeSelection,
                    source,
                };
                inner.raise_blocking_error(&err);
                inner.abort_run(&run, AbortReason::Error, AbortOrigin::Caller).await;
                Err(err)
            }
        }
    }

    /// Offer an intent to the active run.
    ///
    /// `Cancel` is accepted whenever a run is active and aborts it out of
    /// band. Any other intent is accepted only while the run is ready and
    /// idle and no other intent is pending or in flight. Rejections are
    /// `Ok(false)`; only a disposed coordinator returns an error.
    pub fn try_publish_intent(&self, intent: Intent) -> Result<bool> {
        let inner = &self.inner;
        inner.ensure_not_disposed()?;

        let Some(run) = inner.current_run() else {
            return Ok(false);
        };

        if intent.is_cancel() {
            if run.request_abort(AbortReason::UserCancel, None) {
                info!(target: "wizard::coordinator", run = run.id, "cancel requested");
            }
            return Ok(true);
        }

        if !run.is_ready() || run.is_busy() || !run.is_live() {
            return Ok(false);
        }
        if !run.try_acquire_intent_slot() {
            return Ok(false);
        }
        if !run.mailbox.try_enqueue(intent) {
            run.release_intent_slot();
            return Ok(false);
        }

        debug!(target: "wizard::coordinator", run = run.id, %intent, "intent accepted");
        Ok(true)
    }

    /// Abort the active run, if any, and wait for teardown to finish.
    ///
    /// Concurrent callers share one teardown and all receive the same
    /// outcome; its reason is whichever was recorded first.
    pub async fn abort_wizard(&self, reason: AbortReason) -> Option<AbortOutcome> {
        let run = self.inner.current_run()?;
        self.inner
            .abort_run(&run, reason, AbortOrigin::Caller)
            .await
    }

    /// Abort any active run and release the coordinator. Idempotent.
    pub async fn dispose(&self) {
        let inner = &self.inner;
        if inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(run) = inner.current_run() {
            inner
                .abort_run(&run, AbortReason::SceneChange, AbortOrigin::Caller)
                .await;
        }
        inner.lifetime.cancel();
        inner.signals.release();
        info!(target: "wizard::coordinator", "coordinator disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Whether a run is active and neither cancelled nor tearing down.
    pub fn is_active(&self) -> bool {
        self.inner.current_run().is_some_and(|run| run.is_live())
    }

    /// Session of the active run.
    pub fn session(&self) -> Result<Arc<Session>> {
        self.inner.ensure_not_disposed()?;
        match self.inner.current_run() {
            Some(run) if run.is_live() => Ok(Arc::clone(&run.session)),
            _ => Err(CoordinatorError::Inactive),
        }
    }

    pub fn current_step(&self) -> WizardStep {
        self.inner.signals.step()
    }

    pub fn is_transitioning(&self) -> bool {
        self.inner.signals.transitioning()
    }

    pub fn is_submitting(&self) -> bool {
        self.inner.signals.submitting()
    }

    pub fn current_error(&self) -> Option<WizardError> {
        self.inner.signals.error()
    }

    /// Clear the blocking error, typically after the host showed it.
    pub fn dismiss_error(&self) {
        self.inner.signals.set_error(None);
    }

    pub fn subscribe_transitioning(&self) -> Result<watch::Receiver<bool>> {
        self.inner
            .signals
            .subscribe_transitioning()
            .ok_or(CoordinatorError::Disposed)
    }

    pub fn subscribe_submitting(&self) -> Result<watch::Receiver<bool>> {
        self.inner
            .signals
            .subscribe_submitting()
            .ok_or(CoordinatorError::Disposed)
    }

    pub fn subscribe_error(&self) -> Result<watch::Receiver<Option<WizardError>>> {
        self.inner
            .signals
            .subscribe_error()
            .ok_or(CoordinatorError::Disposed)
    }

    pub fn subscribe_step(&self) -> Result<watch::Receiver<WizardStep>> {
        self.inner
            .signals
            .subscribe_step()
            .ok_or(CoordinatorError::Disposed)
    }

    /// Subscribe to lifecycle or navigation events.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe(topic)
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn config(&self) -> &WizardConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for WizardCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardCoordinator")
            .field("disposed", &self.is_disposed())
            .field("step", &self.current_step())
            .finish_non_exhaustive()
    }
}

impl CoordinatorInner {
    fn ensure_not_disposed(&self) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(CoordinatorError::Disposed);
        }
        Ok(())
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<Arc<ActiveRun>>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_run(&self) -> Option<Arc<ActiveRun>> {
        self.lock_active().clone()
    }

    pub(crate) fn events(&self) -> &EventBus {
        &self.events
    }

    /// Hand off to the UI context and perform one navigator call, racing the
    /// run's cancellation.
    pub(crate) async fn navigate(&self, op: NavigationOp, run: &ActiveRun) -> NavigationResult {
        let ctx = run.navigation_context();
        let cancel = ctx.cancellation().clone();

        let call = async {
            self.dispatcher.switch_to_ui(&cancel).await?;
            self.call_navigator(op, &ctx).await
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(NavigationError::Cancelled),
            result = call => result,
        }
    }

    async fn call_navigator(&self, op: NavigationOp, ctx: &NavigationContext) -> NavigationResult {
        match op {
            NavigationOp::OpenModeSelection => self.navigator.open_mode_selection(ctx).await,
            NavigationOp::CloseModeSelection => self.navigator.close_mode_selection(ctx).await,
            NavigationOp::OpenMatchSetup => self.navigator.open_match_setup(ctx).await,
            NavigationOp::CloseMatchSetup => self.navigator.close_match_setup(ctx).await,
            NavigationOp::CloseAllWizardWindows => {
                self.navigator.close_all_wizard_windows(ctx).await
            }
        }
    }

    /// Apply a signal update only while `run` is the live run. Teardown
    /// resets the signals under the same lock, so a late write from a
    /// finished run cannot outlive it.
    pub(crate) fn update_signals(
        &self,
        run: &Arc<ActiveRun>,
        update: impl FnOnce(&WizardSignals),
    ) -> bool {
        let active = self.lock_active();
        let live = active
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, run))
            && !run.is_tearing_down();
        if live {
            update(&self.signals);
        }
        live
    }

    pub(crate) fn set_transitioning(&self, run: &Arc<ActiveRun>, value: bool) {
        run.set_transitioning(value);
        self.update_signals(run, |signals| signals.set_transitioning(value));
    }

    pub(crate) fn set_submitting(&self, run: &Arc<ActiveRun>, value: bool) {
        run.set_submitting(value);
        self.update_signals(run, |signals| signals.set_submitting(value));
    }

    pub(crate) fn raise_blocking_error(&self, err: &CoordinatorError) {
        error!(target: "wizard::coordinator", error = %err, "wizard failed");
        self.signals.set_error(Some(WizardError::unhandled(err)));
    }

    /// Abort `run`. The first caller starts teardown on its own task so a
    /// dropped caller cannot leave it half done.
    ///
    /// Returns `None` only when the processing loop joins an abort started
    /// elsewhere; that teardown is waiting for the loop to exit.
    pub(crate) async fn abort_run(
        self: &Arc<Self>,
        run: &Arc<ActiveRun>,
        reason: AbortReason,
        origin: AbortOrigin,
    ) -> Option<AbortOutcome> {
        if run.begin_teardown(reason) {
            let inner = Arc::clone(self);
            let run = Arc::clone(run);
            tokio::spawn(async move { inner.teardown(run, origin).await });
        } else if origin == AbortOrigin::ProcessingLoop {
            return None;
        }

        Some(run.wait_finished().await)
    }

    async fn teardown(&self, run: Arc<ActiveRun>, origin: AbortOrigin) {
        let outcome = run.outcome();
        debug!(
            target: "wizard::coordinator",
            run = run.id,
            reason = %outcome.reason,
            ?origin,
            "tearing down wizard"
        );

        run.set_ready(false);
        run.cancel.cancel();
        if let Some(intent) = run.mailbox.close() {
            debug!(target: "wizard::coordinator", run = run.id, %intent, "discarded pending intent");
        }

        self.close_all_windows(&run).await;

        if origin == AbortOrigin::Caller {
            if let Some(mut worker) = run.take_worker() {
                if timeout(self.config.teardown_timeout, &mut worker).await.is_err() {
                    warn!(
                        target: "wizard::coordinator",
                        run = run.id,
                        "intent worker did not stop in time; aborting it"
                    );
                    worker.abort();
                }
            }
        }

        if run.session.dispose() {
            debug!(target: "wizard::coordinator", run = run.id, "session disposed");
        }

        {
            let mut active = self.lock_active();
            if active.as_ref().is_some_and(|current| Arc::ptr_eq(current, &run)) {
                *active = None;
            }
            self.signals.reset();
        }

        info!(
            target: "wizard::coordinator",
            run = run.id,
            reason = %outcome.reason,
            launched = outcome.launch_config.is_some(),
            "wizard finished"
        );
        self.events.publish(LifecycleEvent::Finished {
            run: outcome.run,
            reason: outcome.reason,
            launch_config: outcome.launch_config.clone(),
        });
        run.finish(outcome);
    }

    /// Best effort: failures and timeouts are logged, never raised.
    async fn close_all_windows(&self, run: &ActiveRun) {
        // The run token is already cancelled; cleanup gets its own.
        let cancel = CancellationToken::new();
        let ctx = NavigationContext::new(Arc::clone(&run.session), cancel.clone());

        match timeout(self.config.handoff_timeout, self.dispatcher.switch_to_ui(&cancel)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(
                    target: "wizard::coordinator",
                    run = run.id,
                    error = %err,
                    "UI hand-off failed; skipping window teardown"
                );
                return;
            }
            Err(_) => {
                cancel.cancel();
                warn!(
                    target: "wizard::coordinator",
                    run = run.id,
                    timeout_ms = self.config.handoff_timeout.as_millis() as u64,
                    "UI hand-off timed out; skipping window teardown"
                );
                return;
            }
        }

        let op = NavigationOp::CloseAllWizardWindows;
        match timeout(self.config.teardown_timeout, self.call_navigator(op, &ctx)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(target: "wizard::coordinator", run = run.id, error = %err, "{op} failed");
            }
            Err(_) => {
                cancel.cancel();
                warn!(target: "wizard::coordinator", run = run.id, "{op} timed out");
            }
        }
    }
}

/// Abort the run with `StartCancelled` if the caller's token fires first.
fn link_caller_token(caller: CancellationToken, run: Arc<ActiveRun>) {
    tokio::spawn(async move {
        tokio::select! {
            _ = run.cancel.cancelled() => {}
            _ = caller.cancelled() => {
                run.request_abort(AbortReason::StartCancelled, None);
            }
        }
    });
}

/// Builder for [`WizardCoordinator`].
pub struct WizardCoordinatorBuilder {
    config: WizardConfig,
    navigator: Option<Arc<dyn Navigator>>,
    factory: Option<Arc<dyn SessionFactory>>,
    dispatcher: Option<Arc<dyn UiDispatcher>>,
    parent: Option<CancellationToken>,
}

impl WizardCoordinatorBuilder {
    fn new() -> Self {
        Self {
            config: WizardConfig::default(),
            navigator: None,
            factory: None,
            dispatcher: None,
            parent: None,
        }
    }

    /// Override coordinator configuration
    pub fn config(mut self, config: WizardConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the required screen navigator
    pub fn navigator<N: Navigator + 'static>(mut self, navigator: Arc<N>) -> Self {
        self.navigator = Some(navigator as Arc<dyn Navigator>);
        self
    }

    /// Set the required session factory
    pub fn session_factory(mut self, factory: impl SessionFactory + 'static) -> Self {
        let factory: Arc<dyn SessionFactory> = Arc::new(factory);
        self.factory = Some(factory);
        self
    }

    /// Set the UI hand-off (default: [`InlineDispatcher`])
    pub fn dispatcher(mut self, dispatcher: impl UiDispatcher + 'static) -> Self {
        let dispatcher: Arc<dyn UiDispatcher> = Arc::new(dispatcher);
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Tie the coordinator's lifetime to a host token, e.g. a scene's.
    pub fn parent_token(mut self, token: CancellationToken) -> Self {
        self.parent = Some(token);
        self
    }

    pub fn build(self) -> Result<WizardCoordinator> {
        let navigator = self.navigator.ok_or(CoordinatorError::MissingNavigator)?;
        let factory = self.factory.ok_or(CoordinatorError::MissingSessionFactory)?;
        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| Arc::new(InlineDispatcher) as Arc<dyn UiDispatcher>);
        let lifetime = self
            .parent
            .map_or_else(CancellationToken::new, |parent| parent.child_token());

        let events = EventBus::with_capacity(self.config.event_buffer_size);

        Ok(WizardCoordinator {
            inner: Arc::new(CoordinatorInner {
                config: self.config,
                navigator,
                factory,
                dispatcher,
                lifetime,
                disposed: AtomicBool::new(false),
                start_lock: tokio::sync::Mutex::new(()),
                active: Mutex::new(None),
                next_run: AtomicU64::new(0),
                signals: WizardSignals::new(),
                events,
            }),
        })
    }
}
