//! Background polling of a payment's status on behalf of a waiting payer.
//!
//! A [`StatusPoller`] fetches the status on a fixed interval and on demand,
//! publishes every result through a `watch` channel, and switches to the
//! complete view exactly once, shortly after the payment reads `completed`.
//! Fetches run one at a time on a single task; dropping the handle stops it.

use crate::application::engine::PaymentEngine;
use crate::domain::payment::{PaymentId, PaymentStatus, PaymentView};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_COMPLETION_DELAY: Duration = Duration::from_secs(2);

/// Anything that can report the current state of a payment.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self, id: PaymentId) -> Result<PaymentView>;
}

#[async_trait]
impl StatusSource for PaymentEngine {
    async fn fetch(&self, id: PaymentId) -> Result<PaymentView> {
        self.query(id).await
    }
}

#[async_trait]
impl<S: StatusSource + ?Sized> StatusSource for Arc<S> {
    async fn fetch(&self, id: PaymentId) -> Result<PaymentView> {
        (**self).fetch(id).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    /// Pause between observing `completed` and switching to the complete view.
    pub completion_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            completion_delay: DEFAULT_COMPLETION_DELAY,
        }
    }
}

/// What the consumer should currently display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollSnapshot {
    pub view: Option<PaymentView>,
    pub last_error: Option<String>,
    pub fetches: u64,
    /// Set once, after the completion delay; polling has stopped.
    pub complete: bool,
}

pub struct StatusPoller;

impl StatusPoller {
    pub fn spawn<S>(source: S, id: PaymentId, config: PollerConfig) -> PollerHandle
    where
        S: StatusSource + 'static,
    {
        let (state_tx, state_rx) = watch::channel(PollSnapshot::default());
        // Capacity 1: refresh requests made while one is queued coalesce.
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        let (stop_tx, stop_rx) = oneshot::channel();

        let task = tokio::spawn(run(source, id, config, state_tx, refresh_rx, stop_rx));

        PollerHandle {
            refresh_tx,
            state: state_rx,
            stop_tx: Some(stop_tx),
            task,
        }
    }
}

async fn run<S: StatusSource>(
    source: S,
    id: PaymentId,
    config: PollerConfig,
    state: watch::Sender<PollSnapshot>,
    mut refresh_rx: mpsc::Receiver<()>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => return,
            Some(()) = refresh_rx.recv() => ticker.reset(),
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            biased;
            _ = &mut stop_rx => return,
            result = source.fetch(id) => result,
        };

        let completed = match result {
            Ok(view) => {
                let completed = view.status == PaymentStatus::Completed;
                state.send_modify(|snapshot| {
                    snapshot.view = Some(view);
                    snapshot.last_error = None;
                    snapshot.fetches += 1;
                });
                completed
            }
            Err(e) => {
                tracing::warn!(payment_id = %id, error = %e, "Status poll failed");
                state.send_modify(|snapshot| {
                    snapshot.last_error = Some(e.to_string());
                    snapshot.fetches += 1;
                });
                false
            }
        };

        if completed {
            tokio::select! {
                biased;
                _ = &mut stop_rx => return,
                _ = tokio::time::sleep(config.completion_delay) => {}
            }
            state.send_modify(|snapshot| snapshot.complete = true);
            tracing::debug!(payment_id = %id, "Payment complete, polling stopped");
            return;
        }
    }
}

/// Controls a running poller. Dropping it stops polling.
pub struct PollerHandle {
    refresh_tx: mpsc::Sender<()>,
    state: watch::Receiver<PollSnapshot>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Requests an immediate fetch. A no-op if one is already queued.
    pub fn refresh(&self) {
        let _ = self.refresh_tx.try_send(());
    }

    pub fn snapshot(&self) -> PollSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot> {
        self.state.clone()
    }

    /// Waits for the complete view. Returns `None` if polling ended first.
    pub async fn wait_for_completion(&mut self) -> Option<PaymentView> {
        let snapshot = self.state.wait_for(|s| s.complete).await.ok()?;
        snapshot.view.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops polling and waits for the task to exit.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
        let _ = (&mut self.task).await;
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
    }
}
