use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::timestamp;

/// Kind of outlet a source link was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Regulator,
    Ir,
    News,
    Exchange,
    Aggregator,
}

impl SourceType {
    pub const ALL: [SourceType; 5] = [
        SourceType::Regulator,
        SourceType::Ir,
        SourceType::News,
        SourceType::Exchange,
        SourceType::Aggregator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Regulator => "regulator",
            SourceType::Ir => "ir",
            SourceType::News => "news",
            SourceType::Exchange => "exchange",
            SourceType::Aggregator => "aggregator",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown source type '{}' (expected one of: regulator, ir, news, exchange, aggregator)",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: SourceType,
    #[serde(with = "timestamp")]
    pub first_seen: DateTime<Utc>,
}

impl Source {
    /// Host part of the link, or the raw URL when it does not parse.
    pub fn host(&self) -> String {
        Url::parse(&self.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| self.url.clone())
    }
}

/// Generated publishable summary. `quote` may legitimately be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub title: String,
    pub lede: String,
    #[serde(default)]
    pub bullets: Vec<String>,
    #[serde(default)]
    pub quote: String,
    #[serde(default)]
    pub attribution: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
}

impl Entity {
    /// `Name (TICKER)` when a ticker is known.
    pub fn label(&self) -> String {
        match self.ticker.as_deref().filter(|t| !t.is_empty()) {
            Some(ticker) if ticker != self.name => format!("{} ({})", self.name, ticker),
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineItem {
    #[serde(with = "timestamp")]
    pub t: DateTime<Utc>,
    pub what: String,
}

impl fmt::Display for TimelineItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.t.format("%Y-%m-%d %H:%M"), self.what)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub headline: String,
    pub hotness: f64, // [0, 1], computed server-side
    #[serde(default)]
    pub why_now: Option<String>,
    pub confirmed: bool,
    #[serde(default)]
    pub sources: Vec<Source>,
    /// `None` until a draft has been generated.
    #[serde(default)]
    pub draft: Option<Draft>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub timeline: Vec<TimelineItem>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub materiality_ai: Option<f64>,
    #[serde(default)]
    pub impact_side: Option<String>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
    /// Entities tagged by the AI enrichment pass, separate from `entities`.
    #[serde(default)]
    pub ai_entities: Vec<Entity>,
}

impl Event {
    pub fn has_draft(&self) -> bool {
        self.draft.is_some()
    }

    /// Replace this record with a fresher copy from the server.
    ///
    /// The fresher copy wins on every field, except that previously known
    /// sources are kept when it arrives without any.
    pub fn superseded_by(&self, mut fresher: Event) -> Event {
        if fresher.sources.is_empty() && !self.sources.is_empty() {
            fresher.sources = self.sources.clone();
        }
        fresher
    }

    pub fn hotness_display(&self) -> String {
        format!("{:.2}", self.hotness)
    }

    pub fn why_now_display(&self) -> &str {
        self.why_now
            .as_deref()
            .unwrap_or("Context will be available after draft generation.")
    }

    pub fn materiality_display(&self) -> Option<String> {
        self.materiality_ai.map(|score| format!("{:.2}", score))
    }

    /// Labels of the server entities followed by AI-tagged ones not already
    /// listed.
    pub fn entity_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for entity in self.entities.iter().chain(&self.ai_entities) {
            let label = entity.label();
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        labels
    }

    /// Hosts of the first `limit` sources, in feed order.
    pub fn source_hosts(&self, limit: usize) -> Vec<String> {
        self.sources.iter().take(limit).map(Source::host).collect()
    }
}

/// Service liveness and counters. Advisory only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub ok: bool,
    pub events: u64,
    pub sources: u64,
    #[serde(default, with = "timestamp::option")]
    pub last_source: Option<DateTime<Utc>>,
}

impl HealthSnapshot {
    pub fn last_source_display(&self) -> String {
        match self.last_source {
            Some(ts) => ts.format("%Y-%m-%d %H:%M UTC").to_string(),
            None => "—".to_string(),
        }
    }
}
