//! Failure/backoff tracker transitions and timed recovery

mod common;

use common::{init_logger, network_error, server_error};
use std::time::Duration;
use voice_coach::{
    config::TrackerConfig,
    failure_tracker::{TrackerEvent, TrackerNotice},
    FailureTracker, ServiceStatus,
};

fn notices(events: &mut tokio::sync::broadcast::Receiver<TrackerEvent>) -> Vec<TrackerNotice> {
    let mut found = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let TrackerEvent::Notice(notice) = event {
            found.push(notice);
        }
    }
    found
}

#[tokio::test(start_paused = true)]
async fn test_disables_after_max_failures_and_recovers() {
    init_logger();
    let tracker = FailureTracker::new(TrackerConfig::default());
    let mut events = tracker.subscribe();
    let status = tracker.subscribe_status();

    for _ in 0..4 {
        tracker.handle_error(&server_error());
    }
    assert_eq!(tracker.status(), ServiceStatus::Degraded);
    assert!(tracker.is_available());

    tracker.handle_error(&network_error());
    assert_eq!(tracker.status(), ServiceStatus::Disabled);
    assert_eq!(*status.borrow(), ServiceStatus::Disabled);
    assert!(!tracker.is_available());
    assert_eq!(
        notices(&mut events),
        vec![TrackerNotice::Degraded, TrackerNotice::Disabled]
    );

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(tracker.status(), ServiceStatus::Disabled);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(tracker.status(), ServiceStatus::Enabled);
    assert_eq!(tracker.consecutive_failures(), 0);
    assert_eq!(*status.borrow(), ServiceStatus::Enabled);
    assert_eq!(notices(&mut events), vec![TrackerNotice::Restored]);
}

#[tokio::test(start_paused = true)]
async fn test_success_cancels_scheduled_recovery() {
    let tracker = FailureTracker::new(TrackerConfig::default());
    let mut events = tracker.subscribe();
    for _ in 0..5 {
        tracker.handle_error(&network_error());
    }

    tracker.on_success();
    assert_eq!(tracker.status(), ServiceStatus::Enabled);
    assert_eq!(
        notices(&mut events),
        vec![
            TrackerNotice::Degraded,
            TrackerNotice::Disabled,
            TrackerNotice::Restored
        ]
    );

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_manual_recovery_respects_quiet_period() {
    let tracker = FailureTracker::new(TrackerConfig {
        max_failures: 4,
        quiet_period: Duration::from_secs(10),
    });
    for _ in 0..4 {
        tracker.handle_error(&server_error());
    }
    assert_eq!(tracker.status(), ServiceStatus::Disabled);

    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(!tracker.attempt_recovery());
    assert_eq!(tracker.status(), ServiceStatus::Disabled);
    assert_eq!(tracker.consecutive_failures(), 4);

    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(tracker.attempt_recovery());
    assert_eq!(tracker.status(), ServiceStatus::Enabled);
}

#[tokio::test(start_paused = true)]
async fn test_errors_during_disabled_push_recovery_back() {
    let tracker = FailureTracker::new(TrackerConfig::default());
    for _ in 0..5 {
        tracker.handle_error(&network_error());
    }

    tokio::time::sleep(Duration::from_secs(20)).await;
    tracker.handle_error(&network_error());

    // 31s after the first disable, but only 11s after the latest error
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(tracker.status(), ServiceStatus::Disabled);

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(tracker.status(), ServiceStatus::Enabled);
}

#[test]
fn test_status_events_only_on_change() {
    let tracker = FailureTracker::new(TrackerConfig::default());
    let mut events = tracker.subscribe();

    tracker.handle_error(&server_error());
    tracker.handle_error(&server_error());
    tracker.handle_error(&server_error());

    let changes: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|event| matches!(event, TrackerEvent::StatusChanged { .. }))
        .collect();
    assert_eq!(
        changes,
        vec![TrackerEvent::StatusChanged {
            from: ServiceStatus::Enabled,
            to: ServiceStatus::Degraded
        }]
    );
    assert!(!TrackerNotice::Disabled.message().is_empty());
}
