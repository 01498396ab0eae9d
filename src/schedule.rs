//! Owned periodic tasks with an explicit start/stop lifecycle.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

struct Running {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// A periodic task slot. At most one timer runs per `Poller`.
///
/// Stopping guarantees no further tick starts. A tick already in flight is
/// allowed to finish, but the loop exits before scheduling the next one.
/// Dropping the poller stops it.
pub struct Poller {
    label: &'static str,
    running: Mutex<Option<Running>>,
}

impl Poller {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            running: Mutex::new(None),
        }
    }

    /// Start ticking every `period`, first tick one period from now.
    ///
    /// `tick` returns `false` to end the loop (e.g. its owner is gone).
    /// Returns `false` without spawning anything if a timer is already
    /// running or `period` is zero.
    pub fn start<F>(&self, period: Duration, mut tick: F) -> bool
    where
        F: FnMut() -> BoxFuture<'static, bool> + Send + 'static,
    {
        if period.is_zero() {
            tracing::warn!(label = self.label, "refusing to start poller with zero period");
            return false;
        }

        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return false;
        }

        let (stop, mut stopped) = watch::channel(false);
        let label = self.label;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stopped.changed() => break,
                }
                if *stopped.borrow() {
                    break;
                }
                if !tick().await {
                    tracing::debug!(label, "poller owner gone, exiting");
                    break;
                }
            }
        });

        tracing::info!(label, period_ms = period.as_millis() as u64, "poller started");
        *running = Some(Running { stop, handle });
        true
    }

    /// Cancel the timer. Returns whether one was running.
    pub fn stop(&self) -> bool {
        match self.running.lock().take() {
            Some(running) => {
                let _ = running.stop.send(true);
                tracing::info!(label = self.label, "poller stopped");
                !running.handle.is_finished()
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            let _ = running.stop.send(true);
        }
    }
}
