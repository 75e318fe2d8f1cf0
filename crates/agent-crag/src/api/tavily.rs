//! Tavily web search for the corrective path

use super::{SharedRateLimiter, USER_AGENT, per_minute_limiter};
use crate::error::{CragError, Result};
use crate::services::{CorrectiveSearchProvider, ServiceCheck};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const BASE_URL: &str = "https://api.tavily.com/search";
const USAGE_URL: &str = "https://api.tavily.com/usage";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    content: String,
}

/// Tavily search client
#[derive(Debug, Clone)]
pub struct TavilySearch {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
    max_results: usize,
}

impl TavilySearch {
    pub fn new(
        api_key: impl Into<String>,
        rate_limit: u32,
        max_results: usize,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: api_key.into(),
            rate_limiter: per_minute_limiter(rate_limit),
            max_results: max_results.max(1),
        }
    }
}

/// Web query for a question about `ticker`
pub fn corrective_query(ticker: &str, question: &str) -> String {
    format!("{ticker} stock {}", question.trim())
}

async fn checked(response: Response) -> Result<Response> {
    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CragError::Unauthorized {
            provider: "Tavily".to_string(),
        }),
        StatusCode::TOO_MANY_REQUESTS => Err(CragError::RateLimitExceeded {
            provider: "Tavily".to_string(),
        }),
        status if !status.is_success() => {
            let body = response.text().await.unwrap_or_default();
            Err(CragError::ApiError(format!("Tavily error {status}: {body}")))
        }
        _ => Ok(response),
    }
}

fn snippets(response: SearchResponse) -> Vec<String> {
    response
        .results
        .into_iter()
        .map(|r| r.content.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[async_trait]
impl CorrectiveSearchProvider for TavilySearch {
    #[instrument(skip(self, query), fields(max_results = self.max_results))]
    async fn search(&self, ticker: &str, query: &str) -> Result<Vec<String>> {
        self.rate_limiter.until_ready().await;

        let query = corrective_query(ticker, query);
        let body = SearchRequest {
            query: &query,
            max_results: self.max_results,
            search_depth: "basic",
        };
        let response = self
            .client
            .post(BASE_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let found = snippets(checked(response).await?.json().await?);
        debug!(count = found.len(), "Web search complete");
        Ok(found)
    }
}

#[async_trait]
impl ServiceCheck for TavilySearch {
    fn credential(&self) -> &'static str {
        "TAVILY_API_KEY"
    }

    /// Reads the key's usage, which spends no search credits
    async fn verify(&self) -> Result<()> {
        let response = self
            .client
            .get(USAGE_URL)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_corrective_query() {
        assert_eq!(
            corrective_query("NVDA", "  latest risks?  "),
            "NVDA stock latest risks?"
        );
    }

    #[test]
    fn test_request_body() {
        let body = SearchRequest {
            query: "AAPL stock outlook",
            max_results: 3,
            search_depth: "basic",
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({ "query": "AAPL stock outlook", "max_results": 3, "search_depth": "basic" })
        );
    }

    #[test]
    fn test_snippets_skip_blank_content() {
        let response: SearchResponse = serde_json::from_value(json!({
            "query": "AAPL stock outlook",
            "results": [
                {
                    "title": "a",
                    "url": "https://a.example",
                    "content": " Analysts expect growth. "
                },
                { "title": "b", "url": "https://b.example", "content": "" },
                { "title": "c", "url": "https://c.example" }
            ]
        }))
        .unwrap();
        assert_eq!(snippets(response), vec!["Analysts expect growth."]);
    }

    #[test]
    fn test_no_results_is_empty() {
        let response: SearchResponse = serde_json::from_value(json!({ "query": "x" })).unwrap();
        assert!(snippets(response).is_empty());
    }

    #[test]
    fn test_max_results_is_at_least_one() {
        let client = TavilySearch::new("key", 60, 0, Duration::from_secs(15));
        assert_eq!(client.max_results, 1);
    }
}
