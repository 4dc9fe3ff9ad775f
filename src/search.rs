//! Shopping search provider client
//!
//! Talks to the Oxylabs realtime queries endpoint: one POST per search with
//! HTTP basic auth, returning parsed google-shopping organic results.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::config::SearchConfig;
use crate::models::{SearchResult, SearchResults};
use crate::{Error, Result};

/// Seam between the request flow and the shopping search provider.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a shopping search for `query` in `country`.
    ///
    /// Returns the raw (unfiltered) result list; an empty list is a valid
    /// response, not an error.
    async fn search(&self, query: &str, country: &str) -> Result<SearchResults>;
}

/// Production [`SearchProvider`] backed by the Oxylabs realtime API.
pub struct OxylabsClient {
    client: Client,
    config: SearchConfig,
}

impl OxylabsClient {
    /// Create a client from the search provider configuration.
    pub fn new(config: SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Build the provider request payload for a google-shopping search.
    fn build_payload(query: &str, country: &str) -> Value {
        json!({
            "source": "google_shopping_search",
            "geo_location": country,
            "parse": true,
            "query": query,
            "context": [{"key": "results_language", "value": "en"}],
        })
    }

    /// Pull the organic result array out of the provider response and map
    /// each item into a [`SearchResult`]. Missing fields are tolerated.
    fn parse_response(body: &Value) -> SearchResults {
        let organic = body
            .pointer("/results/0/content/results/organic")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let results = organic
            .iter()
            .map(|item| SearchResult {
                title: item
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                price: item
                    .get("price_str")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                link: item
                    .pointer("/merchant/url")
                    .and_then(Value::as_str)
                    .map(String::from),
                currency: item
                    .get("currency")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                rating: item
                    .get("rating")
                    .filter(|v| !v.is_null())
                    .map(|r| match r {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    }),
                reviews_count: item.get("reviews_count").and_then(Value::as_u64),
            })
            .collect();

        SearchResults { results }
    }
}

#[async_trait]
impl SearchProvider for OxylabsClient {
    async fn search(&self, query: &str, country: &str) -> Result<SearchResults> {
        debug!(%query, %country, "querying search provider");

        let response = self
            .client
            .post(&self.config.api_url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&Self::build_payload(query, country))
            .send()
            .await
            .map_err(|e| Error::SearchProvider(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::SearchProvider(format!(
                "provider returned {status} for '{query}' in {country}: {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::SearchProvider(format!("invalid response body: {e}")))?;

        let results = Self::parse_response(&body);
        info!(%query, %country, count = results.len(), "search provider returned results");
        Ok(results)
    }
}
