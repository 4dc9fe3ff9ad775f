//! LLM relevance filter
//!
//! Sends the raw shopping results plus the user's query to an OpenAI
//! chat-completions endpoint and asks the model to drop clearly irrelevant
//! entries. Structured output (a strict JSON schema matching
//! [`SearchResults`]) keeps the response machine-parseable; result order is
//! preserved by the prompt contract.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::FilterConfig;
use crate::models::SearchResults;
use crate::{Error, Result};

/// System prompt for the relevance filter. `{user_query}` and
/// `{formatted_results}` are substituted before sending.
const FILTER_PROMPT: &str = r#"You are a product search relevance expert. Given a user's query and a list of product search results, your task is to **remove any results that are clearly irrelevant** to the query.

Do not reorder the results and maintain their original order. Simply filter out the entries that do not align with the user's intent.

Use the following criteria to assess relevance:
- Match with the user's keywords and intent
- Accuracy and completeness of the product information
- Trustworthiness of the source
    - Do not use the reviews count to determine trustworthiness, rely on your general knowledge of the domain or brand instead.
- Price or offering must be reasonably related to the query
- Overall usefulness of the result for satisfying the user's query

User query:
{user_query}

Search results:
{formatted_results}

Some examples on when to exclude results:
- The product is for a **different brand or model** not mentioned in the query.
  - Example: User searches for "iPhone 14" and the result is "Samsung Galaxy S22".
- The product is a **completely unrelated accessory**.
  - Example: Query is "MacBook Pro" but the result is a "laptop bag" or "keyboard protector".
- The listing contains **generic, misleading, or incomplete information**.
  - Example: A result that says "Best Laptop" without any specs or brand.
- The source is **untrustworthy or suspicious**.
  - Example: A link from a site known for scams or clickbait offers.
- The price or offering is **wildly inconsistent** with the typical product value.
  - Example: Query is "budget smartphones" and result is a $3000 flagship device.
"#;

/// Seam between the request flow and the LLM relevance filter.
#[async_trait]
pub trait ResultFilter: Send + Sync {
    /// Reduce `results` to the entries relevant to `user_query`.
    async fn filter(&self, results: &SearchResults, user_query: &str) -> Result<SearchResults>;
}

/// Production [`ResultFilter`] backed by an OpenAI chat-completions API.
pub struct OpenAiFilter {
    client: Client,
    config: FilterConfig,
}

/// Minimal view of a chat-completions response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiFilter {
    /// Create a filter client from the filter configuration.
    pub fn new(config: FilterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Render the numbered result listing embedded in the prompt.
    fn format_results(results: &SearchResults) -> String {
        results
            .results
            .iter()
            .enumerate()
            .map(|(i, r)| {
                format!(
                    "{}. Title: {}\n   Price: {} {}\n   Link: {}\n   Rating: {}\n   Reviews: {}",
                    i + 1,
                    r.title,
                    r.price,
                    r.currency,
                    r.link.as_deref().unwrap_or("-"),
                    r.rating.as_deref().unwrap_or("-"),
                    r.reviews_count
                        .map_or_else(|| "-".to_string(), |n| n.to_string()),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Build the system prompt from the query and the formatted listing.
    fn build_prompt(user_query: &str, formatted_results: &str) -> String {
        FILTER_PROMPT
            .replace("{user_query}", user_query)
            .replace("{formatted_results}", formatted_results)
    }

    /// Strict JSON schema the model must answer with, mirroring
    /// [`SearchResults`].
    fn response_schema() -> Value {
        json!({
            "type": "json_schema",
            "json_schema": {
                "name": "search_results",
                "strict": true,
                "schema": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["results"],
                    "properties": {
                        "results": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "additionalProperties": false,
                                "required": [
                                    "title", "price", "link",
                                    "currency", "rating", "reviews_count"
                                ],
                                "properties": {
                                    "title": {"type": "string"},
                                    "price": {"type": "string"},
                                    "link": {"type": ["string", "null"]},
                                    "currency": {"type": "string"},
                                    "rating": {"type": ["string", "null"]},
                                    "reviews_count": {"type": ["integer", "null"]}
                                }
                            }
                        }
                    }
                }
            }
        })
    }

    /// Parse the filtered list out of a chat-completions response body.
    fn parse_response(body: &ChatResponse) -> Result<SearchResults> {
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| Error::Filter("response contained no choices".into()))?;

        serde_json::from_str(content)
            .map_err(|e| Error::Filter(format!("model returned unparseable results: {e}")))
    }
}

#[async_trait]
impl ResultFilter for OpenAiFilter {
    async fn filter(&self, results: &SearchResults, user_query: &str) -> Result<SearchResults> {
        if results.is_empty() {
            warn!(%user_query, "no results to filter");
            return Ok(results.clone());
        }

        debug!(%user_query, count = results.len(), "filtering results");

        let system_prompt = Self::build_prompt(user_query, &Self::format_results(results));
        let request = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": "Remove the irrelevant results."},
            ],
            "response_format": Self::response_schema(),
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Filter(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Filter(format!("API returned {status}: {body}")));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Filter(format!("invalid response body: {e}")))?;

        let filtered = Self::parse_response(&body)?;
        info!(
            %user_query,
            before = results.len(),
            after = filtered.len(),
            "filtered results"
        );
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchResult;
    use pretty_assertions::assert_eq;

    fn sample_results() -> SearchResults {
        SearchResults {
            results: vec![
                SearchResult {
                    title: "iPhone 14".into(),
                    price: "$699".into(),
                    link: Some("https://shop.example/iphone".into()),
                    currency: "USD".into(),
                    rating: Some("4.6".into()),
                    reviews_count: Some(120),
                },
                SearchResult {
                    title: "Phone case".into(),
                    price: "$9".into(),
                    link: None,
                    currency: "USD".into(),
                    rating: None,
                    reviews_count: None,
                },
            ],
        }
    }

    #[test]
    fn listing_is_numbered_and_complete() {
        let listing = OpenAiFilter::format_results(&sample_results());
        assert!(listing.starts_with("1. Title: iPhone 14"));
        assert!(listing.contains("Price: $699 USD"));
        assert!(listing.contains("Link: https://shop.example/iphone"));
        assert!(listing.contains("2. Title: Phone case"));
        // Missing fields render as a dash, not "None".
        assert!(listing.contains("Rating: -"));
        assert!(listing.contains("Reviews: -"));
    }

    #[test]
    fn prompt_substitutes_query_and_listing() {
        let prompt = OpenAiFilter::build_prompt("iphone 14", "1. Title: x");
        assert!(prompt.contains("User query:\niphone 14"));
        assert!(prompt.contains("Search results:\n1. Title: x"));
        assert!(!prompt.contains("{user_query}"));
        assert!(!prompt.contains("{formatted_results}"));
    }

    #[test]
    fn schema_covers_every_result_field() {
        let schema = OpenAiFilter::response_schema();
        let props = &schema["json_schema"]["schema"]["properties"]["results"]["items"]
            ["properties"];
        for field in ["title", "price", "link", "currency", "rating", "reviews_count"] {
            assert!(props.get(field).is_some(), "schema missing {field}");
        }
        assert_eq!(schema["json_schema"]["strict"], true);
    }

    #[test]
    fn parse_extracts_filtered_list() {
        let body = ChatResponse {
            choices: vec![ChatChoice {
                message: ChatMessage {
                    content: r#"{"results":[{"title":"iPhone 14","price":"$699","link":null,"currency":"USD","rating":null,"reviews_count":null}]}"#
                        .into(),
                },
            }],
        };
        let filtered = OpenAiFilter::parse_response(&body).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.results[0].title, "iPhone 14");
    }

    #[test]
    fn parse_rejects_empty_choices_and_garbage() {
        let body = ChatResponse { choices: vec![] };
        assert!(matches!(
            OpenAiFilter::parse_response(&body),
            Err(Error::Filter(_))
        ));

        let body = ChatResponse {
            choices: vec![ChatChoice {
                message: ChatMessage {
                    content: "not json".into(),
                },
            }],
        };
        assert!(matches!(
            OpenAiFilter::parse_response(&body),
            Err(Error::Filter(_))
        ));
    }
}
