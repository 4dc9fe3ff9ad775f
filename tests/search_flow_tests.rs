//! End-to-end request flow through the router with mock collaborators

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

use shoplens::config::Config;
use shoplens::filter::ResultFilter;
use shoplens::models::{SearchResult, SearchResults};
use shoplens::search::SearchProvider;
use shoplens::server::{AppState, create_router};
use shoplens::{Error, Result};

/// Mock provider returning a fixed list and counting invocations.
struct MockSearch {
    results: Result<SearchResults>,
    calls: AtomicUsize,
}

impl MockSearch {
    fn returning(results: SearchResults) -> Self {
        Self {
            results: Ok(results),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            results: Err(Error::SearchProvider("connection refused".into())),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, _query: &str, _country: &str) -> Result<SearchResults> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.results {
            Ok(r) => Ok(r.clone()),
            Err(_) => Err(Error::SearchProvider("connection refused".into())),
        }
    }
}

/// Mock filter that keeps only the first result, or fails.
struct MockFilter {
    fail: bool,
}

#[async_trait]
impl ResultFilter for MockFilter {
    async fn filter(&self, results: &SearchResults, _user_query: &str) -> Result<SearchResults> {
        if self.fail {
            return Err(Error::Filter("model unavailable".into()));
        }
        Ok(SearchResults {
            results: results.results.iter().take(1).cloned().collect(),
        })
    }
}

fn two_results() -> SearchResults {
    SearchResults {
        results: vec![
            SearchResult {
                title: "iPhone 14".into(),
                price: "$699".into(),
                link: None,
                currency: "USD".into(),
                rating: None,
                reviews_count: None,
            },
            SearchResult {
                title: "Galaxy S22".into(),
                price: "$650".into(),
                link: None,
                currency: "USD".into(),
                rating: None,
                reviews_count: None,
            },
        ],
    }
}

fn state_with(search: Arc<MockSearch>, filter_fails: bool) -> Arc<AppState> {
    Arc::new(AppState::new(
        &Config::default(),
        search,
        Arc::new(MockFilter { fail: filter_fails }),
    ))
}

fn search_request(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/search")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn search_returns_filtered_results() {
    let search = Arc::new(MockSearch::returning(two_results()));
    let app = create_router(state_with(Arc::clone(&search), false), 1024 * 1024);

    let response = app
        .oneshot(search_request(&json!({"query": "iphone 14", "country": "US"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    // The filter kept only the first of the two raw results.
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["results"][0]["title"], "iPhone 14");
}

#[tokio::test]
async fn repeat_search_is_served_from_cache() {
    let search = Arc::new(MockSearch::returning(two_results()));
    let state = state_with(Arc::clone(&search), false);
    let request = json!({"query": "iphone 14", "country": "US"});

    let app = create_router(Arc::clone(&state), 1024 * 1024);
    let first = app.oneshot(search_request(&request)).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(search.calls.load(Ordering::SeqCst), 1);

    // Same key (modulo casing/whitespace) — no second provider call.
    let app = create_router(Arc::clone(&state), 1024 * 1024);
    let second = app
        .oneshot(search_request(
            &json!({"query": "  IPhone 14 ", "country": "us"}),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(search.calls.load(Ordering::SeqCst), 1);

    let body = body_json(second).await;
    assert_eq!(body["results"][0]["title"], "iPhone 14");
}

#[tokio::test]
async fn use_cache_false_bypasses_the_cache() {
    let search = Arc::new(MockSearch::returning(two_results()));
    let state = state_with(Arc::clone(&search), false);
    let request = json!({"query": "iphone 14", "country": "US", "use_cache": false});

    for expected_calls in 1..=2usize {
        let app = create_router(Arc::clone(&state), 1024 * 1024);
        let response = app.oneshot(search_request(&request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(search.calls.load(Ordering::SeqCst), expected_calls);
    }
}

#[tokio::test]
async fn zero_results_is_not_found() {
    let search = Arc::new(MockSearch::returning(SearchResults::default()));
    let app = create_router(state_with(search, false), 1024 * 1024);

    let response = app
        .oneshot(search_request(&json!({"query": "gibberish", "country": "US"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "No results found");
}

#[tokio::test]
async fn provider_failure_is_bad_gateway() {
    let search = Arc::new(MockSearch::failing());
    let app = create_router(state_with(search, false), 1024 * 1024);

    let response = app
        .oneshot(search_request(&json!({"query": "phone", "country": "US"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Search service unavailable");
}

#[tokio::test]
async fn filter_failure_is_bad_gateway() {
    let search = Arc::new(MockSearch::returning(two_results()));
    let state = state_with(Arc::clone(&search), true);
    let app = create_router(Arc::clone(&state), 1024 * 1024);

    let response = app
        .oneshot(search_request(&json!({"query": "phone", "country": "US"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Filtering service unavailable");
    // A failed filter run leaves nothing in the cache.
    assert!(state.cache.is_empty());
}

#[tokio::test]
async fn invalid_request_is_unprocessable() {
    let search = Arc::new(MockSearch::returning(two_results()));
    let app = create_router(state_with(Arc::clone(&search), false), 1024 * 1024);

    let response = app
        .oneshot(search_request(&json!({"query": "   ", "country": "US"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(search.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn health_reports_healthy() {
    let search = Arc::new(MockSearch::returning(two_results()));
    let app = create_router(state_with(search, false), 1024 * 1024);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}
