//! Intent worker that owns step transitions for one wizard run.
//!
//! Drains the run's mailbox one intent at a time, drives the navigator, and
//! hands off to the coordinator's abort path when the run ends.

use std::sync::Arc;

use tracing::{debug, info};

use wizard_core::{AbortReason, Intent, WizardStep};

use crate::api::{CoordinatorError, NavigationOp};
use crate::coordinator::CoordinatorInner;
use crate::events::NavigationEvent;
use crate::mailbox::MailboxRecv;
use crate::run::{AbortOrigin, ActiveRun};
use crate::session::SessionError;

/// Whether the worker keeps draining intents after handling one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

pub(crate) struct IntentWorker {
    inner: Arc<CoordinatorInner>,
    run: Arc<ActiveRun>,
    step: WizardStep,
}

impl IntentWorker {
    /// The first screen is already open when the worker is created.
    pub(crate) fn new(inner: Arc<CoordinatorInner>, run: Arc<ActiveRun>) -> Self {
        Self {
            inner,
            run,
            step: WizardStep::ModeSelection,
        }
    }

    /// Main worker loop.
    pub(crate) async fn run(mut self) {
        loop {
            let intent = match self.run.mailbox.recv(&self.run.cancel).await {
                MailboxRecv::Intent(intent) => intent,
                MailboxRecv::Cancelled => break,
            };

            let flow = self.handle_intent(intent).await;
            self.run.release_intent_slot();
            if flow == Flow::Stop {
                break;
            }
        }

        let reason = self
            .run
            .requested_reason()
            .unwrap_or(AbortReason::SceneChange);
        self.inner
            .abort_run(&self.run, reason, AbortOrigin::ProcessingLoop)
            .await;
        debug!(target: "wizard::worker", run = self.run.id, "intent worker stopped");
    }

    async fn handle_intent(&mut self, intent: Intent) -> Flow {
        match (intent, self.step) {
            (Intent::Continue, WizardStep::ModeSelection) => {
                self.transition(
                    NavigationOp::CloseModeSelection,
                    NavigationOp::OpenMatchSetup,
                    WizardStep::MatchSetup,
                )
                .await
            }
            (Intent::Back, WizardStep::MatchSetup) => {
                self.transition(
                    NavigationOp::CloseMatchSetup,
                    NavigationOp::OpenModeSelection,
                    WizardStep::ModeSelection,
                )
                .await
            }
            (Intent::Start, WizardStep::MatchSetup) => self.submit(),
            (intent, step) => {
                debug!(
                    target: "wizard::worker",
                    run = self.run.id,
                    %intent,
                    %step,
                    "intent has no effect in this step; dropped"
                );
                self.inner.events().publish(NavigationEvent::IntentDropped {
                    run: self.run.id,
                    intent,
                    step,
                });
                Flow::Continue
            }
        }
    }

    /// Close the current screen, then open the next one.
    async fn transition(&mut self, close: NavigationOp, open: NavigationOp, to: WizardStep) -> Flow {
        self.inner.set_transitioning(&self.run, true);

        let result = match self.inner.navigate(close, &self.run).await {
            Ok(()) => self
                .inner
                .navigate(open, &self.run)
                .await
                .map_err(|err| (open, err)),
            Err(err) => Err((close, err)),
        };

        self.inner.set_transitioning(&self.run, false);

        match result {
            Ok(()) => {
                let from = self.step;
                self.step = to;
                self.inner.events().publish(NavigationEvent::StepChanged {
                    run: self.run.id,
                    from,
                    to,
                });
                self.inner
                    .update_signals(&self.run, |signals| signals.set_step(to));
                debug!(target: "wizard::worker", run = self.run.id, %from, %to, "step changed");
                Flow::Continue
            }
            Err((operation, err)) => match CoordinatorError::from_navigation(operation, err) {
                CoordinatorError::Cancelled => Flow::Stop,
                err => {
                    self.inner.raise_blocking_error(&err);
                    self.run.request_abort(AbortReason::Error, None);
                    Flow::Stop
                }
            },
        }
    }

    /// Build the launch config and end the run with `GameStarted`, or reject
    /// the intent and stay in match setup.
    fn submit(&mut self) -> Flow {
        self.inner.set_submitting(&self.run, true);

        match self.run.session.build_launch_config() {
            Ok(launch_config) => {
                info!(
                    target: "wizard::worker",
                    run = self.run.id,
                    mode = %launch_config.mode_id,
                    "launch config built"
                );
                self.run
                    .request_abort(AbortReason::GameStarted, Some(launch_config));
                Flow::Stop
            }
            Err(SessionError::Validation(errors)) => {
                debug!(
                    target: "wizard::worker",
                    run = self.run.id,
                    %errors,
                    "start rejected: session not start-ready"
                );
                self.inner.set_submitting(&self.run, false);
                self.inner.events().publish(NavigationEvent::LaunchRejected {
                    run: self.run.id,
                    errors,
                });
                Flow::Continue
            }
            Err(err) => {
                debug!(target: "wizard::worker", run = self.run.id, error = %err, "start aborted");
                self.inner.set_submitting(&self.run, false);
                Flow::Stop
            }
        }
    }
}
