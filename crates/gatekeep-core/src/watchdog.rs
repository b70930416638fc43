//! Session watchdog
//!
//! Re-verifies the session on a fixed interval. A failed check is terminal:
//! the task chain is stopped and a fatal fault is published for the front end
//! to act on.

use crate::engine::ChainRunner;
use crate::error::CallError;
use crate::transport::ApiClient;
use gatekeep_types::{CoreEvent, Session, SessionField};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Payload of a healthy status check
pub const HEALTHY_SENTINEL: &str = "1";

/// Lifecycle of a watchdog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Idle,
    Polling,
    /// Authorization lost. Terminal.
    Fatal,
    /// Stopped by the owner. Terminal.
    Stopped,
}

/// Outcome of a single status check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Healthy,
    Fatal(String),
}

/// Interpret a status-check response
pub fn evaluate(outcome: &Result<String, CallError>) -> CheckOutcome {
    match outcome {
        Ok(payload) if payload == HEALTHY_SENTINEL => CheckOutcome::Healthy,
        Ok(payload) => CheckOutcome::Fatal(format!("unexpected status payload: {}", payload)),
        Err(e) => CheckOutcome::Fatal(e.to_string()),
    }
}

/// Periodic status checker for one session
pub struct Watchdog {
    api: ApiClient,
    session: Arc<Session>,
    interval: Duration,
    runner: ChainRunner,
    event_tx: broadcast::Sender<CoreEvent>,
}

impl Watchdog {
    pub fn new(
        api: ApiClient,
        session: Arc<Session>,
        interval: Duration,
        runner: ChainRunner,
        event_tx: broadcast::Sender<CoreEvent>,
    ) -> Self {
        Self {
            api,
            session,
            interval,
            runner,
            event_tx,
        }
    }

    /// Arm the timer and start polling in the background
    pub fn spawn(self) -> WatchdogHandle {
        let state = Arc::new(RwLock::new(WatchdogState::Idle));
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = {
            let state = Arc::clone(&state);
            tokio::spawn(async move { self.run(state, stop_rx).await })
        };

        WatchdogHandle {
            state,
            stop_tx,
            task,
        }
    }

    async fn run(self, state: Arc<RwLock<WatchdogState>>, mut stop_rx: watch::Receiver<bool>) {
        let period = self.interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        *state.write() = WatchdogState::Polling;
        info!(principal = %self.session.principal, interval = ?period, "Watchdog armed");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop_rx.changed() => {
                    *state.write() = WatchdogState::Stopped;
                    info!("Watchdog stopped");
                    return;
                }
            }

            let response = self
                .api
                .check_user_status(&self.session.principal, &self.session.token)
                .await;

            match evaluate(&response) {
                CheckOutcome::Healthy => {
                    debug!("Status check passed");
                    let _ = self.event_tx.send(CoreEvent::StatusCheck {
                        healthy: true,
                        detail: "status check passed".to_string(),
                    });
                    self.refresh_session_info().await;
                }
                CheckOutcome::Fatal(message) => {
                    *state.write() = WatchdogState::Fatal;
                    error!(error = %message, "Status check failed, authorization lost");

                    self.runner.stop();
                    let _ = self.event_tx.send(CoreEvent::StatusCheck {
                        healthy: false,
                        detail: message.clone(),
                    });
                    let _ = self.event_tx.send(CoreEvent::FatalFault { message });
                    return;
                }
            }
        }
    }

    async fn refresh_session_info(&self) {
        let principal = &self.session.principal;
        let credential = self.session.credential.as_deref();

        let expiry = field(self.api.get_expiry_time(principal, credential).await);
        let points = field(self.api.get_remaining_points(principal, credential).await);

        let _ = self.event_tx.send(CoreEvent::SessionInfo { expiry, points });
    }
}

fn field(outcome: Result<String, CallError>) -> SessionField {
    match outcome {
        Ok(value) => SessionField::Value(value),
        Err(e) => {
            warn!(error = %e, "Session detail unavailable");
            SessionField::Unavailable(e.to_string())
        }
    }
}

/// Owner's handle to a running watchdog. Dropping it stops the watchdog.
pub struct WatchdogHandle {
    state: Arc<RwLock<WatchdogState>>,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WatchdogHandle {
    pub fn state(&self) -> WatchdogState {
        *self.state.read()
    }

    /// Disarm the timer. A check already in flight completes first.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the polling task to exit
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!(error = %e, "Watchdog task ended abnormally");
        }
    }
}
