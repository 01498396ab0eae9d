use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::models::{Event, HealthSnapshot};
use super::query::FilterCriteria;
use crate::error::ApiError;

/// Request/response boundary to the event service.
///
/// No retries happen at this layer; retry policy belongs to the caller.
#[async_trait]
pub trait EventApi: Send + Sync {
    async fn list_events(&self, criteria: &FilterCriteria) -> Result<Vec<Event>, ApiError>;

    async fn get_event(&self, id: &str) -> Result<Event, ApiError>;

    async fn generate_draft(&self, id: &str) -> Result<Event, ApiError>;

    async fn get_health(&self) -> Result<HealthSnapshot, ApiError>;
}

pub struct ApiClient {
    client: Client,
    base_url: Url,
    lang: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid API URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("API URL cannot carry a path: {}", base_url);
        }

        Ok(Self {
            client,
            base_url,
            lang: None,
        })
    }

    /// Language forwarded as `lang` on detail and generate requests.
    pub fn with_lang(mut self, lang: Option<String>) -> Self {
        self.lang = lang.filter(|l| !l.trim().is_empty());
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn with_lang_param(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.lang {
            Some(lang) => request.query(&[("lang", lang.as_str())]),
            None => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl EventApi for ApiClient {
    async fn list_events(&self, criteria: &FilterCriteria) -> Result<Vec<Event>, ApiError> {
        let url = self.endpoint(&["events"]);
        let pairs = criteria.to_query_pairs();
        tracing::debug!(%url, params = ?pairs, "listing events");

        self.send_json(self.client.get(url).query(&pairs)).await
    }

    async fn get_event(&self, id: &str) -> Result<Event, ApiError> {
        let url = self.endpoint(&["events", id]);
        tracing::debug!(%url, "fetching event");

        self.send_json(self.with_lang_param(self.client.get(url))).await
    }

    async fn generate_draft(&self, id: &str) -> Result<Event, ApiError> {
        let url = self.endpoint(&["events", id, "generate"]);
        tracing::debug!(%url, "requesting draft generation");

        self.send_json(self.with_lang_param(self.client.post(url))).await
    }

    async fn get_health(&self) -> Result<HealthSnapshot, ApiError> {
        let url = self.endpoint(&["health"]);

        self.send_json(self.client.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_keep_base_path_and_encode_ids() {
        let client = ApiClient::new("http://localhost:8000/api/", 5).unwrap();
        assert_eq!(
            client.endpoint(&["events", "a b", "generate"]).as_str(),
            "http://localhost:8000/api/events/a%20b/generate"
        );

        let client = ApiClient::new("http://localhost:8000", 5).unwrap();
        assert_eq!(client.endpoint(&["health"]).as_str(), "http://localhost:8000/health");
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(ApiClient::new("not a url", 5).is_err());
        assert!(ApiClient::new("mailto:desk@example.com", 5).is_err());
    }
}
