//! Prompt loop driving a coordinator from stdin.
use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use wizard_core::{MatchmakingState, OpponentType};
use wizard_runtime::{
    Event, LifecycleEvent, NavigationEvent, Session, Topic, WizardCoordinator, WizardError,
};

use crate::command::{Command, HELP};
use crate::navigator::describe_opponent;

pub struct ConsoleApp {
    coordinator: WizardCoordinator,
    shutdown: CancellationToken,
}

impl ConsoleApp {
    pub fn new(coordinator: WizardCoordinator) -> Self {
        Self {
            coordinator,
            shutdown: CancellationToken::new(),
        }
    }

    /// Read commands until `quit` or end of input, then dispose the coordinator.
    pub async fn run(self) -> Result<()> {
        let printer = tokio::spawn(print_events(
            self.coordinator.subscribe(Topic::Lifecycle),
            self.coordinator.subscribe(Topic::Navigation),
            self.coordinator.subscribe_error()?,
        ));

        println!("{HELP}");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let command = match line.parse::<Command>() {
                Ok(Command::Quit) => break,
                Ok(command) => command,
                Err(err) => {
                    println!("{err}");
                    continue;
                }
            };

            debug!(?command, "executing command");
            if let Err(err) = self.execute(command) {
                println!("error: {err:#}");
            }
        }

        self.shutdown.cancel();
        self.coordinator.dispose().await;
        printer.abort();
        Ok(())
    }

    fn execute(&self, command: Command) -> Result<()> {
        match command {
            Command::Start => self.start(),
            Command::Intent(intent) => {
                if !self.coordinator.try_publish_intent(intent)? {
                    println!("`{intent}` ignored: wizard busy or inactive");
                }
            }
            Command::Mode(config) => {
                let session = self.session()?;
                session.select_mode(config)?;
                print_validation(&session);
            }
            Command::Bot(difficulty) => {
                let session = self.session()?;
                session.set_opponent_type(OpponentType::Bot)?;
                session.set_bot_difficulty(difficulty)?;
                print_validation(&session);
            }
            Command::Human(kind) => {
                let session = self.session()?;
                session.set_opponent_type(OpponentType::Human)?;
                session.set_human_kind(kind)?;
                print_validation(&session);
            }
            Command::Target(player) => {
                let session = self.session()?;
                session.set_target_player(player)?;
                print_validation(&session);
            }
            Command::Matchmake => {
                let session = self.session()?;
                let snapshot = session.request_matchmaking()?;
                if snapshot.matchmaking_state == MatchmakingState::Idle {
                    println!("matchmaking needs `human matchmaking` first");
                } else {
                    println!("matchmaking: {}", snapshot.matchmaking_state);
                }
                print_validation(&session);
            }
            Command::Reset => {
                let session = self.session()?;
                session.reset()?;
                print_validation(&session);
            }
            Command::Status => self.print_status()?,
            Command::Dismiss => self.coordinator.dismiss_error(),
            Command::Help => println!("{HELP}"),
            Command::Quit => {}
        }
        Ok(())
    }

    /// Start in the background so the prompt stays responsive while the
    /// first screen opens.
    fn start(&self) {
        let coordinator = self.coordinator.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            if let Err(err) = coordinator.start_wizard(&shutdown).await {
                println!("start failed: {err}");
            }
        });
    }

    fn session(&self) -> Result<Arc<Session>> {
        Ok(self.coordinator.session()?)
    }

    fn print_status(&self) -> Result<()> {
        println!("step: {}", self.coordinator.current_step());
        println!(
            "transitioning: {}, submitting: {}",
            self.coordinator.is_transitioning(),
            self.coordinator.is_submitting()
        );
        if let Some(error) = self.coordinator.current_error() {
            println!("error: {error}");
        }

        if let Ok(session) = self.coordinator.session() {
            let snapshot = session.snapshot();
            println!("opponent: {}", describe_opponent(&snapshot));
            println!("snapshot:\n{}", serde_json::to_string_pretty(&*snapshot)?);
            print_validation(&session);
        }
        Ok(())
    }
}

fn print_validation(session: &Session) {
    let errors = session.validation_errors();
    if errors.is_empty() {
        println!("ready to launch");
    } else {
        println!("not ready: {errors}");
    }
}

async fn print_events(
    mut lifecycle: broadcast::Receiver<Event>,
    mut navigation: broadcast::Receiver<Event>,
    mut errors: watch::Receiver<Option<WizardError>>,
) {
    loop {
        let event = tokio::select! {
            event = lifecycle.recv() => event,
            event = navigation.recv() => event,
            changed = errors.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(error) = errors.borrow_and_update().as_ref() {
                    println!("!! {error}");
                }
                continue;
            }
        };

        match event {
            Ok(event) => print_event(&event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "event printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_event(event: &Event) {
    match event {
        Event::Lifecycle(LifecycleEvent::Started { run }) => {
            println!("[run {run}] wizard started");
        }
        Event::Lifecycle(LifecycleEvent::Finished {
            run,
            reason,
            launch_config,
        }) => {
            println!("[run {run}] wizard finished: {reason}");
            if let Some(config) = launch_config {
                match serde_json::to_string_pretty(config) {
                    Ok(json) => println!("launch config:\n{json}"),
                    Err(err) => warn!(%err, "failed to render launch config"),
                }
            }
        }
        Event::Navigation(NavigationEvent::StepChanged { run, from, to }) => {
            println!("[run {run}] {from} -> {to}");
        }
        Event::Navigation(NavigationEvent::IntentDropped { run, intent, step }) => {
            println!("[run {run}] `{intent}` has no effect in {step}");
        }
        Event::Navigation(NavigationEvent::LaunchRejected { run, errors }) => {
            println!("[run {run}] cannot launch: {errors}");
        }
    }
}
