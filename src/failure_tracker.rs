//! Consecutive-failure tracking for the text-generation and speech services.
//!
//! One tracker is shared by every component that talks to the services. It does
//! not intercept calls: callers report each outcome through `handle_error` or
//! `on_success`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use strum::Display;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::TrackerConfig;
use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ServiceStatus {
    Enabled,
    Degraded,
    Disabled,
}

/// User-facing notices raised on significant transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerNotice {
    Degraded,
    Disabled,
    Restored,
}

impl TrackerNotice {
    pub fn message(&self) -> &'static str {
        match self {
            TrackerNotice::Degraded => "Voice coaching is having trouble. Feedback may be limited.",
            TrackerNotice::Disabled => {
                "Voice coaching is temporarily unavailable. Keep dancing, we'll retry shortly."
            }
            TrackerNotice::Restored => "Voice coaching is back.",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    StatusChanged {
        from: ServiceStatus,
        to: ServiceStatus,
    },
    Notice(TrackerNotice),
}

struct TrackerState {
    consecutive_failures: u32,
    status: ServiceStatus,
    last_error: Option<Instant>,
    last_error_at: Option<DateTime<Utc>>,
    recovery: Option<CancellationToken>,
}

pub struct FailureTracker {
    config: TrackerConfig,
    state: Mutex<TrackerState>,
    status_tx: watch::Sender<ServiceStatus>,
    events: broadcast::Sender<TrackerEvent>,
}

impl FailureTracker {
    pub fn new(config: TrackerConfig) -> Arc<Self> {
        let (status_tx, _) = watch::channel(ServiceStatus::Enabled);
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            config,
            state: Mutex::new(TrackerState {
                consecutive_failures: 0,
                status: ServiceStatus::Enabled,
                last_error: None,
                last_error_at: None,
                recovery: None,
            }),
            status_tx,
            events,
        })
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> ServiceStatus {
        self.state().status
    }

    /// False once the tracker has disabled the services.
    pub fn is_available(&self) -> bool {
        self.status() != ServiceStatus::Disabled
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.state().consecutive_failures
    }

    pub fn last_error_at(&self) -> Option<DateTime<Utc>> {
        self.state().last_error_at
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ServiceStatus> {
        self.status_tx.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }

    /// Record a failed service call.
    pub fn handle_error(self: &Arc<Self>, error: &ServiceError) {
        let mut events = Vec::new();
        let schedule_recovery = {
            let mut state = self.state();
            state.consecutive_failures += 1;
            state.last_error = Some(Instant::now());
            state.last_error_at = Some(Utc::now());

            let failures = state.consecutive_failures;
            log::debug!("Service failure #{}: {}", failures, error);

            if failures >= self.config.max_failures {
                if Self::transition(&mut state, ServiceStatus::Disabled, &mut events) {
                    log::error!(
                        "❌ Voice services disabled after {} consecutive failures",
                        failures
                    );
                    events.push(TrackerEvent::Notice(TrackerNotice::Disabled));
                }
                true
            } else if failures >= self.config.degraded_threshold() {
                if Self::transition(&mut state, ServiceStatus::Degraded, &mut events) {
                    log::warn!("⚠️ Voice services degraded after {} failures", failures);
                    events.push(TrackerEvent::Notice(TrackerNotice::Degraded));
                }
                false
            } else {
                false
            }
        };

        if schedule_recovery {
            self.schedule_recovery();
        }
        self.emit(events);
    }

    /// Record a successful service call.
    pub fn on_success(&self) {
        let mut events = Vec::new();
        {
            let mut state = self.state();
            state.consecutive_failures = 0;
            if let Some(token) = state.recovery.take() {
                token.cancel();
            }
            Self::restore(&mut state, &mut events);
        }
        self.emit(events);
    }

    /// Re-enable the services if no error was recorded for at least the quiet period.
    pub fn attempt_recovery(&self) -> bool {
        let mut events = Vec::new();
        {
            let mut state = self.state();
            if let Some(last_error) = state.last_error {
                if last_error.elapsed() < self.config.quiet_period {
                    return false;
                }
            }
            state.consecutive_failures = 0;
            state.recovery = None;
            Self::restore(&mut state, &mut events);
        }
        if !events.is_empty() {
            log::info!("✅ Voice services recovered");
        }
        self.emit(events);
        true
    }

    fn restore(state: &mut TrackerState, events: &mut Vec<TrackerEvent>) {
        let previous = state.status;
        if Self::transition(state, ServiceStatus::Enabled, events)
            && previous == ServiceStatus::Disabled
        {
            events.push(TrackerEvent::Notice(TrackerNotice::Restored));
        }
    }

    fn transition(
        state: &mut TrackerState,
        to: ServiceStatus,
        events: &mut Vec<TrackerEvent>,
    ) -> bool {
        let from = state.status;
        if from == to {
            return false;
        }
        state.status = to;
        events.push(TrackerEvent::StatusChanged { from, to });
        true
    }

    fn schedule_recovery(self: &Arc<Self>) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                log::warn!("No async runtime available, recovery must be attempted manually");
                return;
            }
        };

        let token = CancellationToken::new();
        if let Some(previous) = self.state().recovery.replace(token.clone()) {
            previous.cancel();
        }

        let tracker: Weak<Self> = Arc::downgrade(self);
        let quiet_period = self.config.quiet_period;
        handle.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(quiet_period) => {
                    if let Some(tracker) = tracker.upgrade() {
                        if !tracker.attempt_recovery() {
                            log::debug!("Recovery check found recent errors, staying disabled");
                        }
                    }
                }
            }
        });
    }

    fn emit(&self, events: Vec<TrackerEvent>) {
        for event in events {
            if let TrackerEvent::StatusChanged { to, .. } = event {
                self.status_tx.send_replace(to);
            }
            // No subscribers is fine
            let _ = self.events.send(event);
        }
    }
}
