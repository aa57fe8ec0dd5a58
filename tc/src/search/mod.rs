//! Web-search collaborator and prompt-context assembly
//!
//! Generation and modification prompts are grounded with fresh search
//! results when the turn calls for them. `SearchProvider` is the boundary
//! (SerpAPI in production); `SearchContextBuilder` turns hits into the
//! plain-text blocks the prompts embed. Search is best-effort: a failed
//! lookup yields an empty context, never a pipeline error.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::SearchConfig;

mod heuristic;

pub use heuristic::needs_search;

/// Errors from the web-search collaborator
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search configuration error: {0}")]
    Configuration(String),

    #[error("Search request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Search returned {status}: {message}")]
    ApiError { status: u16, message: String },
}

/// One search result, normalized across result sections
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHit {
    pub name: String,
    pub address: Option<String>,
    pub snippet: Option<String>,
    pub rating: Option<f64>,
}

/// Web-search boundary
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<SearchHit>, SearchError>;
}

/// SerpAPI Google-search client
pub struct SerpSearchProvider {
    base_url: String,
    api_key: String,
    http: Client,
}

impl SerpSearchProvider {
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        debug!("SerpSearchProvider::from_config: called");
        let api_key = config
            .api_key()
            .map_err(|e| SearchError::Configuration(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            api_key,
            http: Client::new(),
        })
    }

    /// Flatten the result sections into hits
    ///
    /// Organic results carry name+snippet, local results carry name+address+
    /// rating, and the knowledge graph contributes at most one entry.
    fn parse_results(body: &Value, num_results: usize) -> Vec<SearchHit> {
        let mut hits = Vec::new();

        if let Some(organic) = body.get("organic_results").and_then(Value::as_array) {
            for result in organic {
                if let Some(title) = result.get("title").and_then(Value::as_str) {
                    hits.push(SearchHit {
                        name: title.to_string(),
                        snippet: result.get("snippet").and_then(Value::as_str).map(String::from),
                        ..Default::default()
                    });
                }
            }
        }

        if let Some(local) = body.get("local_results").and_then(Value::as_array) {
            for result in local {
                if let Some(title) = result.get("title").and_then(Value::as_str) {
                    hits.push(SearchHit {
                        name: title.to_string(),
                        address: result.get("address").and_then(Value::as_str).map(String::from),
                        rating: result.get("rating").and_then(Value::as_f64),
                        ..Default::default()
                    });
                }
            }
        }

        if let Some(kg) = body.get("knowledge_graph")
            && let Some(title) = kg.get("title").and_then(Value::as_str)
        {
            hits.push(SearchHit {
                name: title.to_string(),
                snippet: kg.get("description").and_then(Value::as_str).map(String::from),
                ..Default::default()
            });
        }

        hits.truncate(num_results);
        hits
    }
}

#[async_trait]
impl SearchProvider for SerpSearchProvider {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        debug!(%query, num_results, "SerpSearchProvider::search: called");

        let num = num_results.to_string();
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("num", num.as_str()),
                ("hl", "en"),
                ("gl", "us"),
            ])
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::ApiError { status, message });
        }

        let body: Value = response.json().await?;
        let hits = Self::parse_results(&body, num_results);
        debug!(hit_count = hits.len(), "search: parsed results");
        Ok(hits)
    }
}

/// Maximum hits rendered into any prompt context
const CONTEXT_CAP: usize = 10;

/// Assembles search-result context blocks for the stage prompts
pub struct SearchContextBuilder {
    provider: Arc<dyn SearchProvider>,
}

impl SearchContextBuilder {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        debug!("SearchContextBuilder::new: called");
        Self { provider }
    }

    /// Context for initial generation: one targeted query per interest
    /// (first three), plus general attractions for the destination.
    pub async fn for_interests(&self, destination: &str, interests: &str) -> String {
        debug!(%destination, %interests, "SearchContextBuilder::for_interests: called");
        let mut hits = Vec::new();

        for interest in interests.to_lowercase().split(',').map(str::trim).take(3) {
            if interest.is_empty() {
                continue;
            }
            let query = Self::interest_query(interest, destination);
            hits.extend(self.run_query(&query, 3).await);
        }

        let general = format!("top attractions must visit in {}", destination);
        hits.extend(self.run_query(&general, 4).await);

        format_search_context("CURRENT SEARCH RESULTS:", &hits)
    }

    /// Context for a modification turn
    ///
    /// Add-type edits search the instruction scoped hard to the destination;
    /// other edits search the instruction as-is with fewer results.
    pub async fn for_modification(&self, destination: &str, instruction: &str, adding: bool) -> String {
        debug!(%destination, adding, "SearchContextBuilder::for_modification: called");
        let (query, count, header) = if adding {
            (
                format!("{} in {}", instruction, destination),
                5,
                format!("CURRENT SEARCH RESULTS FOR NEW PLACES IN {}:", destination.to_uppercase()),
            )
        } else {
            (
                instruction.to_string(),
                3,
                "CURRENT SEARCH RESULTS FOR MODIFICATION:".to_string(),
            )
        };

        let hits = self.run_query(&query, count).await;
        format_search_context(&header, &hits)
    }

    /// Brief factual context for a question turn, truncated hard
    pub async fn travel_info(&self, question: &str, destination: &str) -> String {
        debug!(%destination, "SearchContextBuilder::travel_info: called");
        let query = format!("{} {}", question, destination);
        let hits = self.run_query(query.trim(), 3).await;

        let mut info = String::new();
        for hit in hits.iter().take(2) {
            if let Some(ref snippet) = hit.snippet {
                if !info.is_empty() {
                    info.push(' ');
                }
                info.push_str(&format!("{}: {}", hit.name, snippet));
            }
        }

        // Questions only want a sliver of grounding, not a results dump
        truncate_chars(&info, 100)
    }

    fn interest_query(interest: &str, destination: &str) -> String {
        if ["food", "restaurant", "dining"].iter().any(|k| interest.contains(k)) {
            format!("best {} restaurants in {}", interest, destination)
        } else if ["art", "museum", "culture"].iter().any(|k| interest.contains(k)) {
            format!("{} museum gallery attractions in {}", interest, destination)
        } else if ["shop", "market"].iter().any(|k| interest.contains(k)) {
            format!("{} shopping market in {}", interest, destination)
        } else {
            format!("{} attractions tourist places in {}", interest, destination)
        }
    }

    async fn run_query(&self, query: &str, count: usize) -> Vec<SearchHit> {
        match self.provider.search(query, count).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(%query, error = %e, "run_query: search failed, continuing without results");
                Vec::new()
            }
        }
    }
}

/// Render hits as a numbered block, capped at ten entries
///
/// Empty input renders as an empty string so prompt templates can treat the
/// whole block as conditional.
pub fn format_search_context(header: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return String::new();
    }

    let mut context = format!("{}\n", header);
    for (i, hit) in hits.iter().take(CONTEXT_CAP).enumerate() {
        let mut line = format!("{}. {}", i + 1, hit.name);
        if let Some(ref address) = hit.address {
            line.push_str(&format!(" - {}", address));
        }
        if let Some(ref snippet) = hit.snippet {
            line.push_str(&format!(" - {}", truncate_chars(snippet, 100)));
        }
        if let Some(rating) = hit.rating {
            line.push_str(&format!(" (Rating: {})", rating));
        }
        context.push_str(&line);
        context.push('\n');
    }
    context
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Scripted search provider for tests
    pub struct MockSearchProvider {
        hits: Vec<SearchHit>,
        fail: bool,
        queries: Mutex<Vec<String>>,
    }

    impl MockSearchProvider {
        pub fn returning(hits: Vec<SearchHit>) -> Self {
            Self {
                hits,
                fail: false,
                queries: Mutex::new(Vec::new()),
            }
        }

        pub fn empty() -> Self {
            Self::returning(Vec::new())
        }

        pub fn failing() -> Self {
            Self {
                hits: Vec::new(),
                fail: true,
                queries: Mutex::new(Vec::new()),
            }
        }

        pub fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchProvider for MockSearchProvider {
        async fn search(&self, query: &str, _num_results: usize) -> Result<Vec<SearchHit>, SearchError> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail {
                return Err(SearchError::ApiError {
                    status: 500,
                    message: "mock failure".to_string(),
                });
            }
            Ok(self.hits.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockSearchProvider;
    use super::*;
    use serde_json::json;

    fn hit(name: &str) -> SearchHit {
        SearchHit {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_results_flattens_sections() {
        let body = json!({
            "organic_results": [
                { "title": "Blue Tokai Coffee", "snippet": "Specialty roastery" }
            ],
            "local_results": [
                { "title": "Third Wave Coffee", "address": "Indiranagar", "rating": 4.5 }
            ],
            "knowledge_graph": { "title": "Bangalore", "description": "Capital of Karnataka" }
        });

        let hits = SerpSearchProvider::parse_results(&body, 10);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].name, "Blue Tokai Coffee");
        assert_eq!(hits[0].snippet.as_deref(), Some("Specialty roastery"));
        assert_eq!(hits[1].address.as_deref(), Some("Indiranagar"));
        assert_eq!(hits[1].rating, Some(4.5));
        assert_eq!(hits[2].name, "Bangalore");
    }

    #[test]
    fn test_parse_results_respects_limit() {
        let body = json!({
            "organic_results": [
                { "title": "A" }, { "title": "B" }, { "title": "C" }
            ]
        });
        let hits = SerpSearchProvider::parse_results(&body, 2);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_parse_results_empty_body() {
        assert!(SerpSearchProvider::parse_results(&json!({}), 5).is_empty());
    }

    #[test]
    fn test_format_search_context() {
        let hits = vec![
            SearchHit {
                name: "Tam Vi".to_string(),
                address: Some("4B Yen The".to_string()),
                rating: Some(4.7),
                ..Default::default()
            },
            hit("Hoan Kiem Lake"),
        ];

        let context = format_search_context("CURRENT SEARCH RESULTS:", &hits);
        assert!(context.starts_with("CURRENT SEARCH RESULTS:\n"));
        assert!(context.contains("1. Tam Vi - 4B Yen The (Rating: 4.7)"));
        assert!(context.contains("2. Hoan Kiem Lake"));
    }

    #[test]
    fn test_format_search_context_empty_is_empty_string() {
        assert_eq!(format_search_context("HEADER:", &[]), "");
    }

    #[test]
    fn test_format_search_context_caps_at_ten() {
        let hits: Vec<SearchHit> = (0..15).map(|i| hit(&format!("Place {}", i))).collect();
        let context = format_search_context("H:", &hits);
        assert!(context.contains("10. Place 9"));
        assert!(!context.contains("11. Place 10"));
    }

    #[tokio::test]
    async fn test_for_interests_buckets_queries() {
        let provider = Arc::new(MockSearchProvider::empty());
        let builder = SearchContextBuilder::new(provider.clone());

        builder.for_interests("Hanoi", "food, art, hiking, beaches").await;

        let queries = provider.queries();
        // Three interests plus the general attractions query; the fourth
        // interest is dropped.
        assert_eq!(queries.len(), 4);
        assert_eq!(queries[0], "best food restaurants in Hanoi");
        assert_eq!(queries[1], "art museum gallery attractions in Hanoi");
        assert_eq!(queries[2], "hiking attractions tourist places in Hanoi");
        assert_eq!(queries[3], "top attractions must visit in Hanoi");
    }

    #[tokio::test]
    async fn test_for_modification_add_scopes_to_destination() {
        let provider = Arc::new(MockSearchProvider::returning(vec![hit("Night Market")]));
        let builder = SearchContextBuilder::new(provider.clone());

        let context = builder.for_modification("Hanoi", "add a night market", true).await;

        assert_eq!(provider.queries(), vec!["add a night market in Hanoi"]);
        assert!(context.contains("NEW PLACES IN HANOI"));
        assert!(context.contains("Night Market"));
    }

    #[tokio::test]
    async fn test_search_failure_yields_empty_context() {
        let builder = SearchContextBuilder::new(Arc::new(MockSearchProvider::failing()));
        let context = builder.for_interests("Hanoi", "food").await;
        assert_eq!(context, "");
    }

    #[tokio::test]
    async fn test_travel_info_truncates() {
        let provider = Arc::new(MockSearchProvider::returning(vec![SearchHit {
            name: "Guide".to_string(),
            snippet: Some("x".repeat(300)),
            ..Default::default()
        }]));
        let builder = SearchContextBuilder::new(provider);

        let info = builder.travel_info("best time to visit", "Hanoi").await;
        assert_eq!(info.chars().count(), 100);
    }
}
