//! Reducer-driven holder of the current [`SessionSnapshot`].
//!
//! All mutations are serialized behind one lock: each call applies a reducer
//! to the current snapshot, normalizes the result, stamps `version + 1`, and
//! publishes it on the session's watch channels before the lock is released,
//! so observers see versions in order.
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, trace};

use wizard_core::{
    HumanOpponentKind, LaunchConfig, MatchmakingState, ModeConfig, OpponentType, SessionSnapshot,
    ValidationErrors, Version,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session already disposed")]
    Disposed,

    #[error("reducer returned no snapshot")]
    InvalidReducerResult,

    #[error("session is not start-ready: {0}")]
    Validation(#[from] ValidationErrors),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

type DisposeListener = Box<dyn FnOnce() + Send + 'static>;

struct SessionSignals {
    snapshot: watch::Sender<Arc<SessionSnapshot>>,
    validation: watch::Sender<ValidationErrors>,
    can_start: watch::Sender<bool>,
    on_dispose: Vec<DisposeListener>,
}

impl SessionSignals {
    fn new(initial: &Arc<SessionSnapshot>) -> Self {
        let errors = initial.validate();
        let can_start = errors.is_empty();
        Self {
            snapshot: watch::channel(Arc::clone(initial)).0,
            validation: watch::channel(errors).0,
            can_start: watch::channel(can_start).0,
            on_dispose: Vec::new(),
        }
    }

    fn publish(&self, snapshot: &Arc<SessionSnapshot>) {
        let errors = snapshot.validate();
        let can_start = errors.is_empty();
        self.snapshot.send_replace(Arc::clone(snapshot));
        self.validation.send_replace(errors);
        self.can_start.send_if_modified(|current| {
            let changed = *current != can_start;
            *current = can_start;
            changed
        });
    }
}

/// Wizard configuration session owned by one coordinator run.
pub struct Session {
    current: Mutex<Arc<SessionSnapshot>>,
    signals: Mutex<Option<SessionSignals>>,
    disposed: AtomicBool,
}

impl Session {
    /// Session starting from the default snapshot at version 0.
    pub fn new() -> Self {
        Self::with_snapshot(SessionSnapshot::default())
    }

    /// Session seeded with `initial`, normalized and keeping its version.
    pub fn with_snapshot(initial: SessionSnapshot) -> Self {
        let initial = Arc::new(initial.normalized());
        Self {
            signals: Mutex::new(Some(SessionSignals::new(&initial))),
            current: Mutex::new(initial),
            disposed: AtomicBool::new(false),
        }
    }

    /// Current snapshot. Remains readable after dispose.
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        Arc::clone(&self.lock_current())
    }

    pub fn version(&self) -> Version {
        self.lock_current().version
    }

    /// Apply `reducer` to the current snapshot.
    ///
    /// The reducer may return a snapshot or `None`; `None` fails with
    /// [`SessionError::InvalidReducerResult`] and leaves the session untouched.
    /// Whatever version the reducer wrote is replaced by the pre-update
    /// version plus one.
    pub fn update<F, R>(&self, reducer: F) -> SessionResult<Arc<SessionSnapshot>>
    where
        F: FnOnce(&SessionSnapshot) -> R,
        R: Into<Option<SessionSnapshot>>,
    {
        let mut current = self.lock_current();
        if self.is_disposed() {
            return Err(SessionError::Disposed);
        }

        let next = reducer(&current)
            .into()
            .ok_or(SessionError::InvalidReducerResult)?;
        let version = current.version + 1;
        let next = Arc::new(next.normalized().with_version(version));

        *current = Arc::clone(&next);
        if let Some(signals) = self.lock_signals().as_ref() {
            signals.publish(&next);
        }

        trace!(target: "wizard::session", version, "snapshot updated");
        Ok(next)
    }

    pub fn set_mode_config(&self, config: ModeConfig) -> SessionResult<Arc<SessionSnapshot>> {
        self.update(|current| current.clone().with_mode_config(config))
    }

    /// Select a mode id together with its configuration.
    pub fn select_mode(&self, config: ModeConfig) -> SessionResult<Arc<SessionSnapshot>> {
        self.update(|current| current.clone().with_mode(config))
    }

    pub fn set_opponent_type(
        &self,
        opponent_type: OpponentType,
    ) -> SessionResult<Arc<SessionSnapshot>> {
        self.update(|current| current.clone().with_opponent_type(opponent_type))
    }

    pub fn set_bot_difficulty(
        &self,
        difficulty_id: impl Into<String>,
    ) -> SessionResult<Arc<SessionSnapshot>> {
        let difficulty_id = difficulty_id.into();
        self.update(|current| current.clone().with_bot_difficulty(difficulty_id))
    }

    pub fn set_human_kind(&self, kind: HumanOpponentKind) -> SessionResult<Arc<SessionSnapshot>> {
        self.update(|current| current.clone().with_human_kind(kind))
    }

    pub fn set_target_player(
        &self,
        player_id: impl Into<String>,
    ) -> SessionResult<Arc<SessionSnapshot>> {
        let player_id = player_id.into();
        self.update(|current| current.clone().with_target_player(player_id))
    }

    /// Record the intent to matchmake. Only a Human/Matchmaking selection
    /// keeps the `Searching` state; normalization resets it otherwise.
    pub fn request_matchmaking(&self) -> SessionResult<Arc<SessionSnapshot>> {
        self.update(|current| {
            current
                .clone()
                .with_matchmaking_state(MatchmakingState::Searching)
        })
    }

    /// Replace the snapshot with the default one. Bumps the version like
    /// any other update.
    pub fn reset(&self) -> SessionResult<Arc<SessionSnapshot>> {
        self.update(|_| SessionSnapshot::default())
    }

    /// Validation errors of the current snapshot.
    pub fn validation_errors(&self) -> ValidationErrors {
        self.snapshot().validate()
    }

    pub fn can_start(&self) -> bool {
        self.validation_errors().is_empty()
    }

    /// Recompute validation and build the launch configuration.
    pub fn build_launch_config(&self) -> SessionResult<LaunchConfig> {
        if self.is_disposed() {
            return Err(SessionError::Disposed);
        }
        Ok(self.snapshot().launch_config()?)
    }

    pub fn subscribe(&self) -> SessionResult<watch::Receiver<Arc<SessionSnapshot>>> {
        self.with_signals(|signals| signals.snapshot.subscribe())
    }

    pub fn subscribe_validation(&self) -> SessionResult<watch::Receiver<ValidationErrors>> {
        self.with_signals(|signals| signals.validation.subscribe())
    }

    pub fn subscribe_can_start(&self) -> SessionResult<watch::Receiver<bool>> {
        self.with_signals(|signals| signals.can_start.subscribe())
    }

    /// Register a callback run exactly once when the session is disposed.
    pub fn on_dispose(&self, listener: impl FnOnce() + Send + 'static) -> SessionResult<()> {
        let mut signals = self.lock_signals();
        match signals.as_mut() {
            Some(signals) => {
                signals.on_dispose.push(Box::new(listener));
                Ok(())
            }
            None => Err(SessionError::Disposed),
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Dispose the session's signals. Idempotent; returns `true` only for the
    /// call that actually performed the disposal.
    pub fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }

        let signals = self.lock_signals().take();
        if let Some(signals) = signals {
            let SessionSignals { on_dispose, .. } = signals;
            for listener in on_dispose {
                listener();
            }
        }

        debug!(target: "wizard::session", version = self.version(), "session disposed");
        true
    }

    fn with_signals<T>(&self, f: impl FnOnce(&SessionSignals) -> T) -> SessionResult<T> {
        self.lock_signals()
            .as_ref()
            .map(f)
            .ok_or(SessionError::Disposed)
    }

    fn lock_current(&self) -> MutexGuard<'_, Arc<SessionSnapshot>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_signals(&self) -> MutexGuard<'_, Option<SessionSignals>> {
        self.signals.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("snapshot", &*self.lock_current())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use wizard_core::{ClassicModeConfig, ValidationField};

    #[test]
    fn concurrent_updates_bump_version_once_each() {
        let session = Arc::new(Session::new());

        let threads: Vec<_> = (0..20)
            .map(|_| {
                let session = Arc::clone(&session);
                thread::spawn(move || session.update(|s| s.clone()).unwrap().version)
            })
            .collect();

        let mut versions: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        versions.sort_unstable();

        assert_eq!(session.version(), 20);
        assert_eq!(versions, (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn reducer_version_is_overwritten() {
        let session = Session::new();
        let next = session.update(|s| s.clone().with_version(99)).unwrap();
        assert_eq!(next.version, 1);
    }

    #[test]
    fn empty_reducer_result_is_rejected() {
        let session = Session::new();

        let result = session.update(|_| None::<SessionSnapshot>);

        assert!(matches!(result, Err(SessionError::InvalidReducerResult)));
        assert_eq!(session.version(), 0);
    }

    #[test]
    fn updates_are_normalized() {
        let session = Session::new();
        session.set_bot_difficulty("easy").unwrap();

        let snapshot = session.set_opponent_type(OpponentType::Human).unwrap();

        assert_eq!(snapshot.bot_difficulty_id, None);
        assert_eq!(snapshot.version, 2);
    }

    #[test]
    fn reset_restores_defaults_and_bumps_version() {
        let session = Session::new();
        session
            .select_mode(ModeConfig::Classic(ClassicModeConfig::default()))
            .unwrap();

        let snapshot = session.reset().unwrap();

        assert!(snapshot.mode_id.is_empty());
        assert_eq!(snapshot.opponent_type, OpponentType::Bot);
        assert_eq!(snapshot.bot_difficulty_id, None);
        assert_eq!(snapshot.human_kind, HumanOpponentKind::Local);
        assert_eq!(snapshot.matchmaking_state, MatchmakingState::Idle);
        assert_eq!(snapshot.version, 2);
    }

    #[test]
    fn matchmaking_request_only_sticks_for_matchmaking_kind() {
        let session = Session::new();
        assert_eq!(
            session.request_matchmaking().unwrap().matchmaking_state,
            MatchmakingState::Idle
        );

        session.set_opponent_type(OpponentType::Human).unwrap();
        session.set_human_kind(HumanOpponentKind::Matchmaking).unwrap();
        assert_eq!(
            session.request_matchmaking().unwrap().matchmaking_state,
            MatchmakingState::Searching
        );
    }

    #[test]
    fn launch_config_reports_validation_errors() {
        let session = Session::new();
        session
            .select_mode(ModeConfig::Classic(ClassicModeConfig::default()))
            .unwrap();

        match session.build_launch_config() {
            Err(SessionError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(errors.contains(ValidationField::BotDifficultyId));
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        session.set_bot_difficulty("normal").unwrap();
        assert!(session.build_launch_config().is_ok());
    }

    #[test]
    fn signals_follow_updates() {
        let session = Session::new();
        let snapshots = session.subscribe().unwrap();
        let can_start = session.subscribe_can_start().unwrap();
        assert!(!*can_start.borrow());

        session
            .select_mode(ModeConfig::Classic(ClassicModeConfig::default()))
            .unwrap();
        session.set_bot_difficulty("easy").unwrap();

        assert_eq!(snapshots.borrow().version, 2);
        assert!(*can_start.borrow());
        assert!(session.subscribe_validation().unwrap().borrow().is_empty());
    }

    #[test]
    fn dispose_is_idempotent_and_runs_listeners_once() {
        let session = Arc::new(Session::new());
        let disposals = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&disposals);
        session
            .on_dispose(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        let snapshots = session.subscribe().unwrap();

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let session = Arc::clone(&session);
                thread::spawn(move || session.dispose())
            })
            .collect();
        let performed = threads
            .into_iter()
            .map(|t| t.join().unwrap())
            .filter(|performed| *performed)
            .count();

        assert_eq!(performed, 1);
        assert_eq!(disposals.load(Ordering::SeqCst), 1);
        assert!(snapshots.has_changed().is_err());
        assert!(matches!(
            session.update(|s| s.clone()),
            Err(SessionError::Disposed)
        ));
        assert!(matches!(session.subscribe(), Err(SessionError::Disposed)));
    }
}
