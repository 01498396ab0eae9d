//! Filtered event list kept in sync with the remote feed.
//!
//! Each `refresh()` replaces the whole list with what the server returned;
//! the server is authoritative for ranking and order. Every request is tagged
//! with a sequence number and only the most recently issued one may touch
//! state, so a slow older response can never overwrite a newer one.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::api::{CriteriaPatch, Event, EventApi, FilterCriteria};
use crate::error::ApiError;
use crate::schedule::Poller;
use crate::store::Bookmarks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedPhase {
    #[default]
    Idle,
    Loading,
}

/// Result of one `refresh()` call.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Loaded { count: usize },
    /// The previous list was kept; the error is also recorded in the status.
    Failed(ApiError),
    /// A newer refresh was issued while this one was in flight; discarded.
    Stale,
}

/// Everything the UI needs besides the list itself.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedStatus {
    pub phase: FeedPhase,
    pub error: Option<ApiError>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub auto_refresh: bool,
    /// Current criteria would produce a different server query than the last
    /// successful load.
    pub criteria_pending: bool,
}

#[derive(Default)]
struct FeedState {
    criteria: FilterCriteria,
    events: Vec<Event>,
    phase: FeedPhase,
    error: Option<ApiError>,
    loaded_at: Option<DateTime<Utc>>,
    applied: Option<FilterCriteria>,
    issued: u64,
}

struct FeedInner {
    api: Arc<dyn EventApi>,
    state: Mutex<FeedState>,
    auto_refresh: Poller,
}

/// Cheap to clone; clones share the same list and timer.
#[derive(Clone)]
pub struct FeedController {
    inner: Arc<FeedInner>,
}

impl FeedController {
    pub fn new(api: Arc<dyn EventApi>) -> Self {
        Self::with_criteria(api, FilterCriteria::default())
    }

    pub fn with_criteria(api: Arc<dyn EventApi>, criteria: FilterCriteria) -> Self {
        Self {
            inner: Arc::new(FeedInner {
                api,
                state: Mutex::new(FeedState {
                    criteria,
                    ..FeedState::default()
                }),
                auto_refresh: Poller::new("feed-auto-refresh"),
            }),
        }
    }

    pub fn criteria(&self) -> FilterCriteria {
        self.inner.state.lock().criteria.clone()
    }

    /// Merge `patch` into the current criteria. Never fetches: server-side
    /// criteria take effect on the next `refresh()`, while `starred_only`
    /// applies immediately to the loaded list.
    pub fn set_criteria(&self, patch: CriteriaPatch) {
        let mut state = self.inner.state.lock();
        state.criteria.apply(patch);
    }

    /// Issue a list request for the current criteria.
    ///
    /// The controller enters `Loading` before this returns; the returned
    /// future performs the request and applies the response if it is still
    /// the latest one issued.
    pub fn refresh(&self) -> impl Future<Output = RefreshOutcome> + Send + 'static {
        let (seq, criteria) = {
            let mut state = self.inner.state.lock();
            state.issued += 1;
            state.phase = FeedPhase::Loading;
            (state.issued, state.criteria.clone())
        };
        tracing::debug!(seq, "feed refresh issued");

        let inner = Arc::clone(&self.inner);
        async move { inner.complete_refresh(seq, criteria).await }
    }

    /// The list as last returned by the server, in server order.
    pub fn events(&self) -> Vec<Event> {
        self.inner.state.lock().events.clone()
    }

    /// The list to display: the server's list, narrowed to bookmarked ids
    /// when `starred_only` is set.
    pub fn visible_events(&self, bookmarks: &Bookmarks) -> Vec<Event> {
        let state = self.inner.state.lock();
        if !state.criteria.starred_only {
            return state.events.clone();
        }
        state
            .events
            .iter()
            .filter(|event| bookmarks.contains(&event.id))
            .cloned()
            .collect()
    }

    pub fn event(&self, id: &str) -> Option<Event> {
        self.inner
            .state
            .lock()
            .events
            .iter()
            .find(|event| event.id == id)
            .cloned()
    }

    pub fn status(&self) -> FeedStatus {
        let state = self.inner.state.lock();
        let criteria_pending = match &state.applied {
            Some(applied) => !applied.same_server_query(&state.criteria),
            None => false,
        };
        FeedStatus {
            phase: state.phase,
            error: state.error.clone(),
            loaded_at: state.loaded_at,
            auto_refresh: self.inner.auto_refresh.is_running(),
            criteria_pending,
        }
    }

    /// Splice a fresher copy of one event into the list without a full
    /// refresh. Returns `false` (and changes nothing) if the id is no longer
    /// in the list.
    pub fn patch_event(&self, event: Event) -> bool {
        let mut state = self.inner.state.lock();
        match state.events.iter_mut().find(|slot| slot.id == event.id) {
            Some(slot) => {
                *slot = slot.superseded_by(event);
                true
            }
            None => {
                tracing::debug!(id = %event.id, "patched event no longer in feed");
                false
            }
        }
    }

    /// Refresh every `period`. Idempotent: returns `false` if already running.
    pub fn start_auto_refresh(&self, period: Duration) -> bool {
        let weak: Weak<FeedInner> = Arc::downgrade(&self.inner);
        self.inner.auto_refresh.start(period, move || {
            let weak = weak.clone();
            async move {
                let Some(inner) = weak.upgrade() else {
                    return false;
                };
                FeedController { inner }.refresh().await;
                true
            }
            .boxed()
        })
    }

    pub fn stop_auto_refresh(&self) -> bool {
        self.inner.auto_refresh.stop()
    }

    /// Cancel every timer owned by the controller.
    pub fn shutdown(&self) {
        self.stop_auto_refresh();
    }
}

impl FeedInner {
    async fn complete_refresh(&self, seq: u64, criteria: FilterCriteria) -> RefreshOutcome {
        let result = self.api.list_events(&criteria).await;

        let mut state = self.state.lock();
        if seq != state.issued {
            tracing::debug!(seq, latest = state.issued, "discarding stale feed response");
            return RefreshOutcome::Stale;
        }

        state.phase = FeedPhase::Idle;
        match result {
            Ok(events) => {
                let events = dedup_by_id(events);
                let count = events.len();
                state.events = events;
                state.error = None;
                state.loaded_at = Some(Utc::now());
                state.applied = Some(criteria);
                tracing::debug!(seq, count, "feed refreshed");
                RefreshOutcome::Loaded { count }
            }
            Err(err) => {
                tracing::warn!(seq, error = %err, "feed refresh failed, keeping previous list");
                state.error = Some(err.clone());
                RefreshOutcome::Failed(err)
            }
        }
    }
}

/// Keep the first occurrence of every id, preserving server order.
fn dedup_by_id(events: Vec<Event>) -> Vec<Event> {
    let mut seen = HashSet::with_capacity(events.len());
    let total = events.len();
    let unique: Vec<Event> = events
        .into_iter()
        .filter(|event| seen.insert(event.id.clone()))
        .collect();
    if unique.len() != total {
        tracing::warn!(dropped = total - unique.len(), "server returned duplicate event ids");
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{event, with_draft, FakeApi};

    fn ids(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    fn query(q: &str) -> CriteriaPatch {
        CriteriaPatch {
            query: Some(q.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn refresh_replaces_list_in_server_order() {
        let api = Arc::new(FakeApi::new().on_list(
            "",
            Duration::ZERO,
            Ok(vec![event("b", 0.3, true), event("a", 0.9, true)]),
        ));
        let feed = FeedController::new(api);

        let outcome = feed.refresh().await;

        assert_eq!(outcome, RefreshOutcome::Loaded { count: 2 });
        assert_eq!(ids(&feed.events()), vec!["b", "a"]);
        let status = feed.status();
        assert_eq!(status.phase, FeedPhase::Idle);
        assert!(status.loaded_at.is_some());
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn refresh_enters_loading_before_the_request_resolves() {
        let api = Arc::new(FakeApi::new().on_list("", Duration::ZERO, Ok(vec![])));
        let feed = FeedController::new(api);

        let pending = feed.refresh();
        assert_eq!(feed.status().phase, FeedPhase::Loading);
        pending.await;
        assert_eq!(feed.status().phase, FeedPhase::Idle);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_list_and_records_error() {
        let api = Arc::new(FakeApi::new().on_list("", Duration::ZERO, Ok(vec![event("a", 0.9, true)])));
        let feed = FeedController::new(api.clone());
        feed.refresh().await;

        api.set_list("", Err(ApiError::Http { status: 503 }));
        let outcome = feed.refresh().await;

        assert_eq!(outcome, RefreshOutcome::Failed(ApiError::Http { status: 503 }));
        assert_eq!(ids(&feed.events()), vec!["a"]);
        assert_eq!(feed.status().error, Some(ApiError::Http { status: 503 }));
        assert_eq!(feed.status().phase, FeedPhase::Idle);

        api.set_list("", Ok(vec![event("c", 0.5, false)]));
        feed.refresh().await;
        assert!(feed.status().error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_refresh_wins_when_older_resolves_last() {
        let api = Arc::new(
            FakeApi::new()
                .on_list("older", Duration::from_millis(200), Ok(vec![event("old", 0.5, true)]))
                .on_list("newer", Duration::from_millis(10), Ok(vec![event("new", 0.7, true)])),
        );
        let feed = FeedController::new(api);

        feed.set_criteria(query("older"));
        let first = feed.refresh();
        feed.set_criteria(query("newer"));
        let second = feed.refresh();

        let (first, second) = tokio::join!(first, second);

        assert_eq!(first, RefreshOutcome::Stale);
        assert_eq!(second, RefreshOutcome::Loaded { count: 1 });
        assert_eq!(ids(&feed.events()), vec!["new"]);
        assert_eq!(feed.status().phase, FeedPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_failure_does_not_surface_an_error() {
        let api = Arc::new(
            FakeApi::new()
                .on_list("older", Duration::from_millis(200), Err(ApiError::Http { status: 500 }))
                .on_list("newer", Duration::from_millis(10), Ok(vec![event("new", 0.7, true)])),
        );
        let feed = FeedController::new(api);

        feed.set_criteria(query("older"));
        let first = feed.refresh();
        feed.set_criteria(query("newer"));
        let second = feed.refresh();
        tokio::join!(first, second);

        assert!(feed.status().error.is_none());
        assert_eq!(ids(&feed.events()), vec!["new"]);
    }

    #[tokio::test]
    async fn set_criteria_never_fetches() {
        let api = Arc::new(FakeApi::new().on_list("", Duration::ZERO, Ok(vec![event("a", 0.9, true)])));
        let feed = FeedController::new(api.clone());
        feed.refresh().await;

        feed.set_criteria(CriteriaPatch {
            min_hotness: Some(0.8),
            starred_only: Some(true),
            ..Default::default()
        });

        assert_eq!(api.list_calls(), 1);
        assert!(feed.status().criteria_pending);
        assert_eq!(feed.criteria().min_hotness, 0.8);
    }

    #[tokio::test]
    async fn starred_only_is_subset_of_last_fetch() {
        let api = Arc::new(FakeApi::new().on_list(
            "",
            Duration::ZERO,
            Ok(vec![event("a", 0.9, true), event("b", 0.6, false), event("c", 0.2, true)]),
        ));
        let feed = FeedController::new(api.clone());
        let mut bookmarks = Bookmarks::load(Arc::new(MemoryStore::new())).await;
        bookmarks.toggle("c").await.unwrap();
        bookmarks.toggle("a").await.unwrap();
        bookmarks.toggle("gone").await.unwrap();
        feed.refresh().await;

        assert_eq!(ids(&feed.visible_events(&bookmarks)), vec!["a", "b", "c"]);

        feed.set_criteria(CriteriaPatch {
            starred_only: Some(true),
            ..Default::default()
        });
        assert_eq!(ids(&feed.visible_events(&bookmarks)), vec!["a", "c"]);
        assert!(!feed.status().criteria_pending);
        assert_eq!(api.list_calls(), 1);

        // Orphaned bookmarks survive refreshes.
        feed.refresh().await;
        assert!(bookmarks.contains("gone"));
    }

    #[tokio::test]
    async fn duplicate_ids_are_collapsed() {
        let mut dup = event("a", 0.1, false);
        dup.headline = "second copy".into();
        let api = Arc::new(FakeApi::new().on_list(
            "",
            Duration::ZERO,
            Ok(vec![event("a", 0.9, true), event("b", 0.5, true), dup]),
        ));
        let feed = FeedController::new(api);

        assert_eq!(feed.refresh().await, RefreshOutcome::Loaded { count: 2 });
        assert_eq!(feed.event("a").unwrap().hotness, 0.9);
    }

    #[tokio::test]
    async fn patch_event_replaces_by_id_or_does_nothing() {
        let api = Arc::new(FakeApi::new().on_list(
            "",
            Duration::ZERO,
            Ok(vec![event("a", 0.9, true), event("b", 0.5, true)]),
        ));
        let feed = FeedController::new(api);
        feed.refresh().await;

        assert!(feed.patch_event(with_draft(event("b", 0.5, true), "B")));
        assert!(feed.event("b").unwrap().has_draft());
        assert_eq!(ids(&feed.events()), vec!["a", "b"]);

        assert!(!feed.patch_event(with_draft(event("z", 0.5, true), "Z")));
        assert_eq!(feed.events().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_refresh_is_idempotent_and_fully_cancelled() {
        let api = Arc::new(FakeApi::new().on_list("", Duration::ZERO, Ok(vec![event("a", 0.9, true)])));
        let feed = FeedController::new(api.clone());

        assert!(feed.start_auto_refresh(Duration::from_secs(60)));
        assert!(!feed.start_auto_refresh(Duration::from_secs(60)));
        assert!(feed.status().auto_refresh);

        tokio::time::sleep(Duration::from_secs(150)).await;
        assert_eq!(api.list_calls(), 2);

        assert!(feed.stop_auto_refresh());
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(api.list_calls(), 2);
        assert!(!feed.status().auto_refresh);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_last_handle_cancels_auto_refresh() {
        let api = Arc::new(FakeApi::new().on_list("", Duration::ZERO, Ok(vec![])));
        {
            let feed = FeedController::new(api.clone());
            feed.start_auto_refresh(Duration::from_secs(60));
        }

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(api.list_calls(), 0);
    }
}
