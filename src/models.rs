//! Request and response data model

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Maximum accepted length of the `query` field, in characters.
pub const MAX_QUERY_LEN: usize = 200;

/// Maximum accepted length of the `country` field, in characters.
pub const MAX_COUNTRY_LEN: usize = 64;

/// Body of `POST /search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text product query.
    pub query: String,
    /// Country to run the shopping search in (provider geo_location).
    pub country: String,
    /// Whether to consult the result cache before hitting the provider.
    #[serde(default = "default_true")]
    pub use_cache: bool,
}

fn default_true() -> bool {
    true
}

impl SearchRequest {
    /// Validate the request fields before any provider or cache work.
    ///
    /// The query must be non-empty after trimming and at most
    /// [`MAX_QUERY_LEN`] characters. The country must be non-empty after
    /// trimming, at most [`MAX_COUNTRY_LEN`] characters, and consist of
    /// letters, spaces, and hyphens only — the provider is the final
    /// authority on which locations it recognizes.
    pub fn validate(&self) -> Result<()> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(Error::Validation("query must not be empty".into()));
        }
        if query.chars().count() > MAX_QUERY_LEN {
            return Err(Error::Validation(format!(
                "query must be at most {MAX_QUERY_LEN} characters"
            )));
        }

        let country = self.country.trim();
        if country.is_empty() {
            return Err(Error::Validation("country must not be empty".into()));
        }
        if country.chars().count() > MAX_COUNTRY_LEN {
            return Err(Error::Validation(format!(
                "country must be at most {MAX_COUNTRY_LEN} characters"
            )));
        }
        if !country
            .chars()
            .all(|c| c.is_alphabetic() || c == ' ' || c == '-')
        {
            return Err(Error::Validation(
                "country must contain letters, spaces, and hyphens only".into(),
            ));
        }

        Ok(())
    }
}

/// A single shopping search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Product title as listed by the merchant.
    pub title: String,
    /// Display price string (e.g. `"$129.99"`).
    pub price: String,
    /// Merchant URL, when the provider supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Price currency code.
    pub currency: String,
    /// Aggregate rating, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    /// Number of reviews behind the rating, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews_count: Option<u64>,
}

/// A list of shopping search results — the payload cached per
/// (query, country) and returned by `POST /search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// The results, in provider order.
    pub results: Vec<SearchResult>,
}

impl SearchResults {
    /// Whether the provider returned no results at all.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of results in the list.
    pub fn len(&self) -> usize {
        self.results.len()
    }
}
