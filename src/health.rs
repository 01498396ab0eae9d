use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::api::{EventApi, HealthSnapshot};
use crate::schedule::Poller;

#[derive(Default)]
struct HealthState {
    snapshot: Option<HealthSnapshot>,
    checked_at: Option<DateTime<Utc>>,
}

struct HealthInner {
    api: Arc<dyn EventApi>,
    state: Mutex<HealthState>,
    poller: Poller,
}

/// Low-frequency poll of service liveness and counters.
///
/// Failed polls are ignored: the previous snapshot stays (or stays absent).
#[derive(Clone)]
pub struct HealthMonitor {
    inner: Arc<HealthInner>,
}

impl HealthMonitor {
    pub fn new(api: Arc<dyn EventApi>) -> Self {
        Self {
            inner: Arc::new(HealthInner {
                api,
                state: Mutex::new(HealthState::default()),
                poller: Poller::new("health"),
            }),
        }
    }

    /// Fetch once. Returns whether a fresh snapshot was stored.
    pub async fn poll_once(&self) -> bool {
        self.inner.poll().await
    }

    pub fn snapshot(&self) -> Option<HealthSnapshot> {
        self.inner.state.lock().snapshot.clone()
    }

    /// When the current snapshot was fetched.
    pub fn checked_at(&self) -> Option<DateTime<Utc>> {
        self.inner.state.lock().checked_at
    }

    pub fn start(&self, period: Duration) -> bool {
        let weak: Weak<HealthInner> = Arc::downgrade(&self.inner);
        self.inner.poller.start(period, move || {
            let weak = weak.clone();
            async move {
                let Some(inner) = weak.upgrade() else {
                    return false;
                };
                inner.poll().await;
                true
            }
            .boxed()
        })
    }

    pub fn stop(&self) -> bool {
        self.inner.poller.stop()
    }

    pub fn is_running(&self) -> bool {
        self.inner.poller.is_running()
    }
}

impl HealthInner {
    async fn poll(&self) -> bool {
        match self.api.get_health().await {
            Ok(snapshot) => {
                let mut state = self.state.lock();
                state.snapshot = Some(snapshot);
                state.checked_at = Some(Utc::now());
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "health poll failed, keeping previous snapshot");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::testing::FakeApi;

    fn healthy(events: u64) -> HealthSnapshot {
        HealthSnapshot {
            ok: true,
            events,
            sources: events * 3,
            last_source: None,
        }
    }

    #[tokio::test]
    async fn first_failure_leaves_snapshot_absent() {
        let api = Arc::new(FakeApi::new());
        api.set_health(Err(ApiError::Http { status: 500 }));
        let monitor = HealthMonitor::new(api);

        assert!(!monitor.poll_once().await);
        assert_eq!(monitor.snapshot(), None);
        assert_eq!(monitor.checked_at(), None);
    }

    #[tokio::test]
    async fn failure_keeps_previous_snapshot() {
        let api = Arc::new(FakeApi::new());
        api.set_health(Ok(healthy(10)));
        let monitor = HealthMonitor::new(api.clone());
        assert!(monitor.poll_once().await);
        let checked = monitor.checked_at().expect("timestamp after success");

        api.set_health(Err(ApiError::Http { status: 500 }));
        assert!(!monitor.poll_once().await);
        assert_eq!(monitor.snapshot(), Some(healthy(10)));
        assert_eq!(monitor.checked_at(), Some(checked));

        api.set_health(Err(ApiError::Transport("refused".into())));
        monitor.poll_once().await;
        assert_eq!(monitor.snapshot(), Some(healthy(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn polling_runs_on_its_own_timer() {
        let api = Arc::new(FakeApi::new());
        let monitor = HealthMonitor::new(api.clone());

        assert!(monitor.start(Duration::from_secs(60)));
        assert!(!monitor.start(Duration::from_secs(60)));

        api.set_health(Ok(healthy(1)));
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(monitor.snapshot(), Some(healthy(1)));

        assert!(monitor.stop());
        api.set_health(Ok(healthy(2)));
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(monitor.snapshot(), Some(healthy(1)));
        assert!(!monitor.is_running());
    }
}
