// Integration tests have relaxed clippy settings for stress scenarios.
// Production code (src/) must use strict zero-unwrap/panic patterns.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
    clippy::doc_markdown,
    clippy::significant_drop_tightening
)]
//! Concurrent waiter stress tests - Run with: cargo test -p locus-core --test concurrent_waiters
//!
//! These tests verify that:
//! - Every Ready waiter is released by a single qualifying update
//! - Cancelled waiters return false and do not disturb the others
//! - Init and Error waits complete on the first update of any kind

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use futures::future::join_all;
use locus_core::{
    CancellationToken, Location, LocationError, LocationStatus, SessionContext,
};
use tokio::sync::Barrier;

/// All Ready waiters are released by one publish
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stress_ready_fan_out() {
    let waiter_count: usize = 64;
    let ctx = Arc::new(SessionContext::new());
    let barrier = Arc::new(Barrier::new(waiter_count + 1));
    let released = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::with_capacity(waiter_count);
    for _ in 0..waiter_count {
        let ctx = Arc::clone(&ctx);
        let barrier = Arc::clone(&barrier);
        let released = Arc::clone(&released);
        handles.push(tokio::spawn(async move {
            let cancel = CancellationToken::new();
            barrier.wait().await;
            let ready = ctx.wait_location_info(&cancel, LocationStatus::Ready).await;
            if ready {
                released.fetch_add(1, Ordering::SeqCst);
            }
            ready
        }));
    }

    barrier.wait().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(ctx.set_current_location(Some(Location::region("gz")), None));

    let results = tokio::time::timeout(Duration::from_secs(5), join_all(handles))
        .await
        .expect("waiters should be released");
    assert!(results.into_iter().all(|r| r.unwrap()));
    assert_eq!(released.load(Ordering::SeqCst), waiter_count);
}

/// Waiters arriving after the publish return immediately
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn late_waiters_see_ready() {
    let ctx = Arc::new(SessionContext::new());
    ctx.set_current_location(Some(Location::region("gz")), None);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                ctx.wait_location_info(&CancellationToken::new(), LocationStatus::Ready)
                    .await
            })
        })
        .collect();

    for result in join_all(handles).await {
        assert!(result.unwrap());
    }
}

/// Cancelled waiters give up without affecting the rest
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancelled_waiters_are_independent() {
    let ctx = Arc::new(SessionContext::new());
    let shared_cancel = CancellationToken::new();

    let cancelled: Vec<_> = (0..8)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let cancel = shared_cancel.clone();
            tokio::spawn(async move { ctx.wait_location_info(&cancel, LocationStatus::Ready).await })
        })
        .collect();
    let patient: Vec<_> = (0..8)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                ctx.wait_location_info(&CancellationToken::new(), LocationStatus::Ready)
                    .await
            })
        })
        .collect();

    shared_cancel.cancel();
    for result in join_all(cancelled).await {
        assert!(!result.unwrap());
    }
    assert_eq!(ctx.current_location().status(), LocationStatus::Init);

    ctx.set_current_location(Some(Location::region("sh")), None);
    for result in join_all(patient).await {
        assert!(result.unwrap());
    }
}

/// A pre-cancelled token returns false without waiting
#[tokio::test]
async fn pre_cancelled_ready_wait_does_not_block() {
    let ctx = SessionContext::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = tokio::time::timeout(
        Duration::from_millis(100),
        ctx.wait_location_info(&cancel, LocationStatus::Ready),
    )
    .await;
    assert_eq!(result.ok(), Some(false));
}

/// With no update, a Ready wait bounded by a 50 ms deadline gives up
#[tokio::test]
async fn ready_wait_respects_deadline() {
    let ctx = SessionContext::new();
    assert_eq!(ctx.current_location().status(), LocationStatus::Init);

    let cancel = CancellationToken::new();
    let deadline = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        })
    };

    let started = Instant::now();
    let ready = ctx.wait_location_info(&cancel, LocationStatus::Ready).await;
    assert!(!ready);
    assert!(started.elapsed() >= Duration::from_millis(45));
    deadline.await.unwrap();
}

/// Init and Error waits park until the first update, then wake together
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn init_and_error_waits_wake_on_first_update() {
    let ctx = Arc::new(SessionContext::new());
    let cancel = CancellationToken::new();

    let init_wait = {
        let ctx = Arc::clone(&ctx);
        let cancel = cancel.clone();
        tokio::spawn(async move { ctx.wait_location_info(&cancel, LocationStatus::Init).await })
    };
    let error_wait = {
        let ctx = Arc::clone(&ctx);
        let cancel = cancel.clone();
        tokio::spawn(async move { ctx.wait_location_info(&cancel, LocationStatus::Error).await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!init_wait.is_finished());
    assert!(!error_wait.is_finished());

    ctx.set_current_location(None, Some(LocationError::new("TRANSPORT_ERROR", "refused")));

    assert!(init_wait.await.unwrap());
    assert!(error_wait.await.unwrap());
}

/// Readers running alongside the writer only ever see whole snapshots
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_torn_snapshots() {
    let ctx = Arc::new(SessionContext::new());
    let stop = CancellationToken::new();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let stop = stop.clone();
            tokio::spawn(async move {
                let mut observed = 0_usize;
                loop {
                    let snap = ctx.current_location();
                    match snap.status() {
                        LocationStatus::Ready => {
                            let loc = snap.location().unwrap();
                            assert_eq!(loc.region, loc.zone, "region and zone are written together");
                        }
                        LocationStatus::Error => assert!(snap.last_error().is_some()),
                        LocationStatus::Init | LocationStatus::Empty => {
                            assert!(snap.last_error().is_none());
                        }
                    }
                    observed += 1;
                    if stop.is_cancelled() {
                        break;
                    }
                    tokio::task::yield_now().await;
                }
                observed
            })
        })
        .collect();

    for i in 0..200 {
        let tag = format!("r{i}");
        if i % 3 == 0 {
            ctx.set_current_location(None, Some(LocationError::new("X", "flaky")));
        } else {
            ctx.set_current_location(Some(Location::new(tag.clone(), tag, "")), None);
        }
        tokio::task::yield_now().await;
    }
    stop.cancel();

    for reader in join_all(readers).await {
        assert!(reader.unwrap() > 0);
    }
    assert!(ctx.is_location_ready());
}
