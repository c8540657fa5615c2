//! Integration tests for Store action broadcasting
//!
//! Request/response callers subscribe to effect-produced actions and wait for
//! the answer carrying their correlation id.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use faith_connect_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use faith_connect_runtime::{Store, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

// ============================================================================
// Test Fixtures
// ============================================================================

/// A request that takes a few round trips before it is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RelayAction {
    /// Command carrying a correlation id
    Request { id: u64 },
    /// Intermediate hop
    Hop { id: u64, hop: u32 },
    /// Final answer
    Answered { id: u64 },
    /// Command answered after a delay
    Remind { id: u64 },
    /// Single-hop ping
    Ping,
    /// Answer to `Ping`
    Pong { count: u32 },
}

#[derive(Debug, Clone, Default)]
struct RelayState {
    pings: u32,
    hops: Vec<(u64, u32)>,
}

#[derive(Clone)]
struct RelayEnvironment;

#[derive(Clone)]
struct RelayReducer;

const HOPS: u32 = 3;

impl Reducer for RelayReducer {
    type State = RelayState;
    type Action = RelayAction;
    type Environment = RelayEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            RelayAction::Request { id } => smallvec![Effect::Future(Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Some(RelayAction::Hop { id, hop: 1 })
            }))],
            RelayAction::Hop { id, hop } => {
                state.hops.push((id, hop));
                let next = if hop < HOPS {
                    RelayAction::Hop { id, hop: hop + 1 }
                } else {
                    RelayAction::Answered { id }
                };
                smallvec![Effect::Future(Box::pin(async move { Some(next) }))]
            },
            RelayAction::Remind { id } => smallvec![Effect::Delay {
                duration: Duration::from_millis(10),
                action: Box::new(RelayAction::Answered { id }),
            }],
            RelayAction::Ping => {
                state.pings += 1;
                let count = state.pings;
                smallvec![Effect::Future(Box::pin(async move {
                    Some(RelayAction::Pong { count })
                }))]
            },
            RelayAction::Answered { .. } | RelayAction::Pong { .. } => smallvec![Effect::None],
        }
    }
}

fn store() -> Store<RelayState, RelayAction, RelayEnvironment, RelayReducer> {
    Store::new(RelayState::default(), RelayReducer, RelayEnvironment)
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<RelayAction>) -> (usize, bool) {
    let mut received = 0;
    let mut lagged = false;
    loop {
        match rx.try_recv() {
            Ok(_) => received += 1,
            Err(TryRecvError::Lagged(_)) => lagged = true,
            Err(_) => break,
        }
    }
    (received, lagged)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_wait_for_single_hop_answer() {
    let store = store();

    let answer = store
        .send_and_wait_for(
            RelayAction::Ping,
            |action| matches!(action, RelayAction::Pong { .. }),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_eq!(answer, RelayAction::Pong { count: 1 });
}

#[tokio::test]
async fn test_wait_for_multi_hop_answer() {
    let store = store();

    let answer = store
        .send_and_wait_for(
            RelayAction::Request { id: 42 },
            |action| matches!(action, RelayAction::Answered { id: 42 }),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_eq!(answer, RelayAction::Answered { id: 42 });
    let hops = store.state(|s| s.hops.clone()).await;
    assert_eq!(hops, vec![(42, 1), (42, 2), (42, 3)]);
}

#[tokio::test]
async fn test_wait_times_out_without_answer() {
    let store = store();

    let result = store
        .send_and_wait_for(
            RelayAction::Ping,
            |action| matches!(action, RelayAction::Answered { .. }),
            Duration::from_millis(50),
        )
        .await;

    assert!(matches!(result, Err(StoreError::Timeout)));
}

#[tokio::test]
async fn test_concurrent_waiters_get_their_own_answers() {
    let store = Arc::new(store());

    let handles: Vec<_> = (1..=5)
        .map(|id| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .send_and_wait_for(
                        RelayAction::Request { id },
                        move |action| matches!(action, RelayAction::Answered { id: answered } if *answered == id),
                        Duration::from_secs(2),
                    )
                    .await
            })
        })
        .collect();

    for (id, handle) in (1..=5).zip(handles) {
        let answer = handle.await.expect("task panicked").unwrap();
        assert_eq!(answer, RelayAction::Answered { id });
    }

    let hops = store.state(|s| s.hops.len()).await;
    assert_eq!(hops, 15);
}

#[tokio::test]
async fn test_subscribers_see_every_effect_action_in_order() {
    let store = store();
    let mut rx = store.subscribe_actions();

    store.send(RelayAction::Request { id: 7 }).await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..4 {
        let action = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        seen.push(action);
    }

    assert_eq!(
        seen,
        vec![
            RelayAction::Hop { id: 7, hop: 1 },
            RelayAction::Hop { id: 7, hop: 2 },
            RelayAction::Hop { id: 7, hop: 3 },
            RelayAction::Answered { id: 7 },
        ]
    );
}

#[tokio::test]
async fn test_sent_commands_are_not_broadcast() {
    let store = store();
    let mut rx = store.subscribe_actions();

    let mut handle = store.send(RelayAction::Ping).await.unwrap();
    handle.wait().await;

    let actions: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(actions, vec![RelayAction::Pong { count: 1 }]);
}

#[tokio::test]
async fn test_independent_subscribers() {
    let store = store();
    let mut first = store.subscribe_actions();
    let mut second = store.subscribe_actions();

    store.send(RelayAction::Ping).await.unwrap().wait().await;
    store.send(RelayAction::Ping).await.unwrap().wait().await;

    assert_eq!(drain(&mut first), (2, false));
    assert_eq!(drain(&mut second), (2, false));
}

#[tokio::test(start_paused = true)]
async fn test_delayed_actions_are_broadcast() {
    let store = store();

    let answer = store
        .send_and_wait_for(
            RelayAction::Remind { id: 3 },
            |action| matches!(action, RelayAction::Answered { id: 3 }),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_eq!(answer, RelayAction::Answered { id: 3 });
}

#[tokio::test]
async fn test_small_capacity_lags_slow_subscriber() {
    let store = Store::with_broadcast_capacity(
        RelayState::default(),
        RelayReducer,
        RelayEnvironment,
        2,
    );
    let mut rx = store.subscribe_actions();

    for _ in 0..10 {
        store.send(RelayAction::Ping).await.unwrap().wait().await;
    }

    let (received, lagged) = drain(&mut rx);
    assert!(lagged, "expected the subscriber to lag");
    assert!(received < 10);
}

#[tokio::test]
async fn test_dropping_store_closes_subscriptions() {
    let store = store();
    let mut rx = store.subscribe_actions();

    drop(store);

    assert!(matches!(rx.recv().await, Err(RecvError::Closed)));
}
