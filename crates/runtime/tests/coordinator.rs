//! Concurrency and teardown properties of the wizard coordinator.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Barrier;
use tokio_util::sync::CancellationToken;

use common::{
    HANDOFF_TIMEOUT, Harness, RecordingNavigator, TEARDOWN_TIMEOUT, WAIT, next_finished,
    wait_for_step,
};
use wizard_core::{AbortReason, Intent, WizardStep};
use wizard_runtime::{CoordinatorError, LifecycleEvent, NavigationOp, Topic, WizardError};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exactly_one_concurrent_intent_is_accepted() {
    let navigator = RecordingNavigator::new();
    // Keep the accepted intent in flight while the others race for the slot.
    navigator.delay(NavigationOp::CloseModeSelection, Duration::from_millis(300));
    let harness = Harness::with_navigator(navigator);
    harness.start().await;

    let publishers = 32;
    let barrier = Arc::new(Barrier::new(publishers));
    let tasks: Vec<_> = (0..publishers)
        .map(|_| {
            let coordinator = harness.coordinator.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                coordinator.try_publish_intent(Intent::Continue).unwrap()
            })
        })
        .collect();

    let mut accepted = 0;
    for task in tasks {
        if task.await.unwrap() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 1);
    wait_for_step(&harness.coordinator, WizardStep::MatchSetup).await;
    assert_eq!(harness.navigator.count(NavigationOp::OpenMatchSetup), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_wins_while_busy_and_closes_windows_once() {
    let navigator = RecordingNavigator::new();
    navigator.stall_on(NavigationOp::OpenMatchSetup);
    navigator.delay(NavigationOp::CloseAllWizardWindows, Duration::from_millis(50));
    let harness = Harness::with_navigator(navigator);
    harness.start().await;
    let mut lifecycle = harness.coordinator.subscribe(Topic::Lifecycle);

    assert!(harness.coordinator.try_publish_intent(Intent::Continue).unwrap());
    harness
        .navigator
        .wait_for_call(NavigationOp::OpenMatchSetup)
        .await;
    assert!(harness.coordinator.is_transitioning());
    assert!(!harness.coordinator.try_publish_intent(Intent::Back).unwrap());

    let cancels: Vec<_> = (0..8)
        .map(|_| {
            let coordinator = harness.coordinator.clone();
            tokio::spawn(async move { coordinator.try_publish_intent(Intent::Cancel).unwrap() })
        })
        .collect();
    let aborts: Vec<_> = (0..4)
        .map(|_| {
            let coordinator = harness.coordinator.clone();
            tokio::spawn(async move { coordinator.abort_wizard(AbortReason::SceneChange).await })
        })
        .collect();

    for cancel in cancels {
        assert!(cancel.await.unwrap());
    }
    for abort in aborts {
        abort.await.unwrap();
    }

    let LifecycleEvent::Finished { launch_config, .. } = next_finished(&mut lifecycle).await
    else {
        unreachable!()
    };
    assert!(launch_config.is_none());
    assert_eq!(
        harness.navigator.count(NavigationOp::CloseAllWizardWindows),
        1
    );
    assert_eq!(harness.sessions.disposed(), 1);
    assert!(harness.coordinator.current_error().is_none());
    assert!(!harness.coordinator.is_transitioning());
    assert_eq!(harness.coordinator.current_step(), WizardStep::None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_aborts_tear_down_once() {
    let navigator = RecordingNavigator::new();
    navigator.delay(NavigationOp::CloseAllWizardWindows, Duration::from_millis(100));
    let harness = Harness::with_navigator(navigator);
    harness.start().await;

    let callers = 16;
    let barrier = Arc::new(Barrier::new(callers));
    let aborts: Vec<_> = (0..callers)
        .map(|_| {
            let coordinator = harness.coordinator.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                coordinator.abort_wizard(AbortReason::UserCancel).await
            })
        })
        .collect();

    let mut outcomes = Vec::new();
    for abort in aborts {
        outcomes.push(abort.await.unwrap().expect("run was active"));
    }

    assert!(outcomes.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(outcomes[0].reason, AbortReason::UserCancel);
    assert_eq!(harness.sessions.disposed(), 1);
    assert_eq!(
        harness.navigator.count(NavigationOp::CloseAllWizardWindows),
        1
    );
    assert!(!harness.coordinator.is_active());
}

#[tokio::test]
async fn failed_first_open_leaves_no_zombie_state() {
    let navigator = RecordingNavigator::new();
    navigator.fail_on(NavigationOp::OpenModeSelection);
    let harness = Harness::with_navigator(navigator);

    let err = harness
        .coordinator
        .start_wizard(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoordinatorError::Navigation {
            operation: NavigationOp::OpenModeSelection,
            ..
        }
    ));
    assert_eq!(harness.sessions.created(), 1);
    assert_eq!(harness.sessions.disposed(), 1);
    assert!(matches!(
        harness.coordinator.session(),
        Err(CoordinatorError::Inactive)
    ));
    assert_eq!(harness.coordinator.current_step(), WizardStep::None);

    let error = harness.coordinator.current_error().expect("blocking error");
    assert_eq!(error.code, WizardError::UNHANDLED_EXCEPTION);
    assert!(error.blocking);

    // A later start succeeds and clears the stale error.
    harness.navigator.clear_failures();
    harness.start().await;
    assert!(harness.coordinator.current_error().is_none());
    assert_eq!(harness.coordinator.current_step(), WizardStep::ModeSelection);
    assert_eq!(harness.sessions.created(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_starts_create_one_session() {
    let navigator = RecordingNavigator::new();
    navigator.delay(NavigationOp::OpenModeSelection, Duration::from_millis(50));
    let harness = Harness::with_navigator(navigator);

    let starts: Vec<_> = (0..8)
        .map(|_| {
            let coordinator = harness.coordinator.clone();
            tokio::spawn(async move { coordinator.start_wizard(&CancellationToken::new()).await })
        })
        .collect();
    for start in starts {
        start.await.unwrap().expect("start should succeed");
    }

    assert_eq!(harness.sessions.created(), 1);
    assert_eq!(harness.navigator.count(NavigationOp::OpenModeSelection), 1);
    assert!(harness.coordinator.is_active());
}

#[tokio::test]
async fn cancelling_start_disposes_session_without_navigating_further() {
    let navigator = RecordingNavigator::new();
    navigator.stall_on(NavigationOp::OpenModeSelection);
    let harness = Harness::with_navigator(navigator);
    let token = CancellationToken::new();

    let start = {
        let coordinator = harness.coordinator.clone();
        let token = token.clone();
        tokio::spawn(async move { coordinator.start_wizard(&token).await })
    };
    harness
        .navigator
        .wait_for_call(NavigationOp::OpenModeSelection)
        .await;
    token.cancel();

    let err = start.await.unwrap().unwrap_err();
    assert!(matches!(err, CoordinatorError::Cancelled));
    assert_eq!(harness.sessions.disposed(), 1);
    assert_eq!(harness.navigator.count(NavigationOp::OpenMatchSetup), 0);
    assert!(harness.coordinator.current_error().is_none());
    assert!(matches!(
        harness.coordinator.session(),
        Err(CoordinatorError::Inactive)
    ));
}

#[tokio::test]
async fn pre_cancelled_token_never_creates_a_session() {
    let harness = Harness::new();
    let token = CancellationToken::new();
    token.cancel();

    let err = harness.coordinator.start_wizard(&token).await.unwrap_err();

    assert!(matches!(err, CoordinatorError::Cancelled));
    assert_eq!(harness.sessions.created(), 0);
    assert!(harness.navigator.calls().is_empty());
}

#[tokio::test]
async fn intents_wait_for_first_open_but_cancel_does_not() {
    let navigator = RecordingNavigator::new();
    navigator.stall_on(NavigationOp::OpenModeSelection);
    let harness = Harness::with_navigator(navigator);
    let mut lifecycle = harness.coordinator.subscribe(Topic::Lifecycle);

    let start = {
        let coordinator = harness.coordinator.clone();
        tokio::spawn(async move { coordinator.start_wizard(&CancellationToken::new()).await })
    };
    harness
        .navigator
        .wait_for_call(NavigationOp::OpenModeSelection)
        .await;

    assert!(!harness.coordinator.try_publish_intent(Intent::Continue).unwrap());
    assert!(harness.coordinator.try_publish_intent(Intent::Cancel).unwrap());

    assert!(matches!(
        start.await.unwrap(),
        Err(CoordinatorError::Cancelled)
    ));
    let LifecycleEvent::Finished { reason, .. } = next_finished(&mut lifecycle).await else {
        unreachable!()
    };
    assert_eq!(reason, AbortReason::UserCancel);
    assert_eq!(harness.sessions.disposed(), 1);
}

#[tokio::test]
async fn inactive_coordinator_rejects_quietly() {
    let harness = Harness::new();

    assert!(!harness.coordinator.try_publish_intent(Intent::Continue).unwrap());
    assert!(!harness.coordinator.try_publish_intent(Intent::Cancel).unwrap());
    assert!(harness.coordinator.abort_wizard(AbortReason::UserCancel).await.is_none());
    assert!(matches!(
        harness.coordinator.session(),
        Err(CoordinatorError::Inactive)
    ));
}

#[tokio::test]
async fn dispose_aborts_and_then_refuses_everything() {
    let harness = Harness::new();
    harness.start().await;
    let mut lifecycle = harness.coordinator.subscribe(Topic::Lifecycle);
    let mut step = harness.coordinator.subscribe_step().unwrap();

    harness.coordinator.dispose().await;
    harness.coordinator.dispose().await;

    let LifecycleEvent::Finished { reason, .. } = next_finished(&mut lifecycle).await else {
        unreachable!()
    };
    assert_eq!(reason, AbortReason::SceneChange);
    assert_eq!(harness.sessions.disposed(), 1);
    assert_eq!(
        harness.navigator.count(NavigationOp::CloseAllWizardWindows),
        1
    );

    assert!(matches!(
        harness.coordinator.try_publish_intent(Intent::Continue),
        Err(CoordinatorError::Disposed)
    ));
    assert!(matches!(
        harness.coordinator.try_publish_intent(Intent::Cancel),
        Err(CoordinatorError::Disposed)
    ));
    assert!(matches!(
        harness
            .coordinator
            .start_wizard(&CancellationToken::new())
            .await,
        Err(CoordinatorError::Disposed)
    ));
    assert!(matches!(
        harness.coordinator.subscribe_step(),
        Err(CoordinatorError::Disposed)
    ));

    // Released signals close outstanding receivers.
    step.borrow_and_update();
    assert!(step.changed().await.is_err());
}

#[tokio::test]
async fn transition_failure_raises_blocking_error_and_aborts() {
    let navigator = RecordingNavigator::new();
    navigator.fail_on(NavigationOp::OpenMatchSetup);
    let harness = Harness::with_navigator(navigator);
    harness.start().await;
    let mut lifecycle = harness.coordinator.subscribe(Topic::Lifecycle);

    assert!(harness.coordinator.try_publish_intent(Intent::Continue).unwrap());

    let LifecycleEvent::Finished { reason, .. } = next_finished(&mut lifecycle).await else {
        unreachable!()
    };
    assert_eq!(reason, AbortReason::Error);

    let error = harness.coordinator.current_error().expect("blocking error");
    assert_eq!(error.code, "wizard.unhandled_exception");
    assert!(error.blocking);
    assert!(
        error
            .cause
            .as_deref()
            .is_some_and(|cause| cause.contains("open_match_setup"))
    );

    assert_eq!(
        harness.navigator.calls(),
        vec![
            NavigationOp::OpenModeSelection,
            NavigationOp::CloseModeSelection,
            NavigationOp::OpenMatchSetup,
            NavigationOp::CloseAllWizardWindows,
        ]
    );
    assert_eq!(harness.sessions.disposed(), 1);
    assert!(!harness.coordinator.is_transitioning());

    harness.coordinator.dismiss_error();
    assert!(harness.coordinator.current_error().is_none());
}

#[tokio::test]
async fn caller_token_keeps_governing_an_active_run() {
    let harness = Harness::new();
    let token = CancellationToken::new();
    harness.coordinator.start_wizard(&token).await.unwrap();
    let mut lifecycle = harness.coordinator.subscribe(Topic::Lifecycle);

    token.cancel();

    let LifecycleEvent::Finished { reason, .. } = next_finished(&mut lifecycle).await else {
        unreachable!()
    };
    assert_eq!(reason, AbortReason::StartCancelled);
    assert!(!harness.coordinator.is_active());
}

#[tokio::test]
async fn start_after_cancel_waits_for_teardown_then_opens_a_new_run() {
    let navigator = RecordingNavigator::new();
    navigator.delay(NavigationOp::CloseAllWizardWindows, Duration::from_millis(100));
    let harness = Harness::with_navigator(navigator);
    harness.start().await;
    let first = harness.coordinator.session().unwrap();

    assert!(harness.coordinator.try_publish_intent(Intent::Cancel).unwrap());
    assert!(!harness.coordinator.is_active());
    assert!(!harness.coordinator.try_publish_intent(Intent::Continue).unwrap());

    harness.start().await;

    assert!(harness.coordinator.is_active());
    assert!(first.is_disposed());
    let second = harness.coordinator.session().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(harness.sessions.created(), 2);
    assert_eq!(harness.sessions.disposed(), 1);
    assert_eq!(harness.navigator.count(NavigationOp::OpenModeSelection), 2);
    assert_eq!(
        harness.navigator.count(NavigationOp::CloseAllWizardWindows),
        1
    );
    assert_eq!(harness.coordinator.current_step(), WizardStep::ModeSelection);
}

#[tokio::test]
async fn failing_session_factory_leaves_nothing_behind() {
    let harness = Harness::new();
    harness.sessions.refuse_creation(true);

    let err = harness
        .coordinator
        .start_wizard(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CoordinatorError::SessionFactory(_)));
    assert!(harness.navigator.calls().is_empty());
    assert_eq!(harness.sessions.created(), 0);
    assert!(!harness.coordinator.is_active());
    assert!(matches!(
        harness.coordinator.session(),
        Err(CoordinatorError::Inactive)
    ));
    assert_eq!(harness.coordinator.current_step(), WizardStep::None);
    assert!(!harness.coordinator.try_publish_intent(Intent::Cancel).unwrap());

    harness.sessions.refuse_creation(false);
    harness.start().await;
    assert!(harness.coordinator.is_active());
    assert_eq!(harness.sessions.created(), 1);
    assert_eq!(harness.navigator.count(NavigationOp::OpenModeSelection), 1);
}

#[tokio::test]
async fn stalled_ui_handoff_skips_window_close_and_still_disposes() {
    let harness = Harness::new();
    harness.start().await;
    let session = harness.coordinator.session().unwrap();
    harness.dispatcher.stall();

    let started = Instant::now();
    let outcome = tokio::time::timeout(
        WAIT,
        harness.coordinator.abort_wizard(AbortReason::UserCancel),
    )
    .await
    .expect("abort should not hang on the UI hand-off")
    .expect("run was active");
    let elapsed = started.elapsed();

    assert_eq!(outcome.reason, AbortReason::UserCancel);
    assert!(elapsed >= HANDOFF_TIMEOUT, "abort took {elapsed:?}");
    assert!(
        elapsed < HANDOFF_TIMEOUT + TEARDOWN_TIMEOUT,
        "abort took {elapsed:?}"
    );
    assert_eq!(
        harness.navigator.count(NavigationOp::CloseAllWizardWindows),
        0
    );
    assert!(session.is_disposed());
    assert_eq!(harness.sessions.disposed(), 1);
    assert!(!harness.coordinator.is_active());
}
