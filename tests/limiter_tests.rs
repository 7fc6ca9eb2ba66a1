//! Behavioural tests for the fixed-window Admission Limiter.
//!
//! Run with: `cargo test --test limiter_tests`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use voice_agent_backend::limiter::{Admission, AdmissionLimiter, ManualClock};

fn limiter(limit: u32, window: Duration) -> (Arc<AdmissionLimiter>, ManualClock) {
    let clock = ManualClock::new();
    let limiter = AdmissionLimiter::with_clock(limit, window, Arc::new(clock.clone())).unwrap();
    (Arc::new(limiter), clock)
}

#[test]
fn test_concurrent_callers_never_exceed_limit() {
    const THREADS: usize = 64;
    const LIMIT: u32 = 20;

    let (limiter, _clock) = limiter(LIMIT, Duration::from_secs(60));
    let barrier = Barrier::new(THREADS);
    let allowed = AtomicU32::new(0);

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                barrier.wait();
                if limiter.check_and_record("key:abc123").is_allowed() {
                    allowed.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
    });

    assert_eq!(allowed.load(Ordering::SeqCst), LIMIT);
    assert_eq!(limiter.current_count("key:abc123"), Some(LIMIT));
}

#[test]
fn test_concurrent_identities_are_independent() {
    const IDENTITIES: usize = 8;
    const PER_IDENTITY: usize = 10;
    const LIMIT: u32 = 3;

    let (limiter, _clock) = limiter(LIMIT, Duration::from_secs(60));
    let barrier = Barrier::new(IDENTITIES * PER_IDENTITY);
    let allowed: Vec<AtomicU32> = (0..IDENTITIES).map(|_| AtomicU32::new(0)).collect();

    thread::scope(|scope| {
        for id in 0..IDENTITIES {
            for _ in 0..PER_IDENTITY {
                let (limiter, barrier, allowed) = (&limiter, &barrier, &allowed);
                scope.spawn(move || {
                    barrier.wait();
                    if limiter.check_and_record(&format!("addr:10.0.0.{id}")).is_allowed() {
                        allowed[id].fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        }
    });

    for count in &allowed {
        assert_eq!(count.load(Ordering::SeqCst), LIMIT);
    }
    assert_eq!(limiter.tracked_identities(), IDENTITIES);
}

#[test]
fn test_window_boundary_is_exclusive() {
    let (limiter, clock) = limiter(1, Duration::from_secs(60));

    assert!(limiter.check_and_record("a").is_allowed());

    clock.advance(Duration::from_millis(59_999));
    assert!(!limiter.check_and_record("a").is_allowed());

    // Exactly one window after the start the old window has expired
    clock.advance(Duration::from_millis(1));
    assert!(limiter.check_and_record("a").is_allowed());
}

#[test]
fn test_boundary_burst_allows_twice_the_limit() {
    let (limiter, clock) = limiter(3, Duration::from_secs(60));

    clock.advance(Duration::from_secs(59));
    for _ in 0..3 {
        assert!(limiter.check_and_record("a").is_allowed());
    }

    clock.advance(Duration::from_secs(60));
    for _ in 0..3 {
        assert!(limiter.check_and_record("a").is_allowed());
    }
    assert!(!limiter.check_and_record("a").is_allowed());
}

#[test]
fn test_any_call_sweeps_every_expired_identity() {
    let (limiter, clock) = limiter(5, Duration::from_secs(60));

    for i in 0..100 {
        limiter.check_and_record(&format!("addr:192.0.2.{i}"));
    }
    assert_eq!(limiter.tracked_identities(), 100);

    clock.advance(Duration::from_secs(61));
    limiter.check_and_record("key:fresh");

    assert_eq!(limiter.tracked_identities(), 1);
    assert_eq!(limiter.current_count("addr:192.0.2.0"), None);
}

#[test]
fn test_retry_after_counts_down() {
    let (limiter, clock) = limiter(1, Duration::from_secs(60));
    limiter.check_and_record("a");

    clock.advance(Duration::from_secs(45));
    assert_eq!(
        limiter.check_and_record("a"),
        Admission::Denied {
            retry_after: Duration::from_secs(15)
        }
    );
}

#[test]
fn test_remaining_counts_down_to_zero() {
    let (limiter, _clock) = limiter(3, Duration::from_secs(60));

    let remaining: Vec<u32> = (0..3)
        .map(|_| match limiter.check_and_record("a") {
            Admission::Allowed { remaining, .. } => remaining,
            Admission::Denied { .. } => panic!("unexpected denial"),
        })
        .collect();

    assert_eq!(remaining, [2, 1, 0]);
}
