//! Scripted in-process `EventApi` for controller tests.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::api::{Draft, Event, EventApi, FilterCriteria, HealthSnapshot, Source, SourceType};
use crate::error::ApiError;

type Scripted<T> = (Duration, Result<T, ApiError>);

/// Responses are keyed by the trimmed text query (lists) or the event id
/// (detail and generate) and resolve after their scripted delay. Anything
/// unscripted answers HTTP 404.
#[derive(Default)]
pub struct FakeApi {
    lists: Mutex<HashMap<String, Scripted<Vec<Event>>>>,
    details: Mutex<HashMap<String, Scripted<Event>>>,
    generated: Mutex<HashMap<String, Scripted<Event>>>,
    health: Mutex<Option<Result<HealthSnapshot, ApiError>>>,
    list_calls: AtomicUsize,
    generate_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_list(self, query: &str, delay: Duration, result: Result<Vec<Event>, ApiError>) -> Self {
        self.lists.lock().insert(query.to_string(), (delay, result));
        self
    }

    pub fn on_get(self, id: &str, delay: Duration, result: Result<Event, ApiError>) -> Self {
        self.details.lock().insert(id.to_string(), (delay, result));
        self
    }

    pub fn on_generate(self, id: &str, delay: Duration, result: Result<Event, ApiError>) -> Self {
        self.generated.lock().insert(id.to_string(), (delay, result));
        self
    }

    /// Replace a list script after construction.
    pub fn set_list(&self, query: &str, result: Result<Vec<Event>, ApiError>) {
        self.lists
            .lock()
            .insert(query.to_string(), (Duration::ZERO, result));
    }

    pub fn set_health(&self, result: Result<HealthSnapshot, ApiError>) {
        *self.health.lock() = Some(result);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    async fn play<T: Clone>(scripted: Option<Scripted<T>>) -> Result<T, ApiError> {
        match scripted {
            Some((delay, result)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => Err(ApiError::Http { status: 404 }),
        }
    }
}

#[async_trait]
impl EventApi for FakeApi {
    async fn list_events(&self, criteria: &FilterCriteria) -> Result<Vec<Event>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.lists.lock().get(criteria.query.trim()).cloned();
        Self::play(scripted).await
    }

    async fn get_event(&self, id: &str) -> Result<Event, ApiError> {
        let scripted = self.details.lock().get(id).cloned();
        Self::play(scripted).await
    }

    async fn generate_draft(&self, id: &str) -> Result<Event, ApiError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.generated.lock().get(id).cloned();
        Self::play(scripted).await
    }

    async fn get_health(&self) -> Result<HealthSnapshot, ApiError> {
        self.health
            .lock()
            .clone()
            .unwrap_or(Err(ApiError::Transport("connection refused".into())))
    }
}

pub fn event(id: &str, hotness: f64, confirmed: bool) -> Event {
    Event {
        id: id.to_string(),
        headline: format!("Headline {id}"),
        hotness,
        why_now: None,
        confirmed,
        sources: vec![Source {
            url: format!("https://news.example.com/{id}"),
            kind: SourceType::News,
            first_seen: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        }],
        draft: None,
        entities: Vec::new(),
        timeline: Vec::new(),
        event_type: None,
        materiality_ai: None,
        impact_side: None,
        risk_flags: Vec::new(),
        ai_entities: Vec::new(),
    }
}

pub fn draft(title: &str) -> Draft {
    Draft {
        title: title.to_string(),
        lede: format!("{title} lede."),
        bullets: vec!["First point".into(), "Second point".into()],
        quote: String::new(),
        attribution: vec!["https://news.example.com".into()],
    }
}

pub fn with_draft(mut event: Event, title: &str) -> Event {
    event.draft = Some(draft(title));
    event.why_now = Some(format!("{title} matters now"));
    event
}
