//! NewsAPI headlines

use super::{NewsSource, SharedRateLimiter, USER_AGENT, per_minute_limiter};
use crate::error::{CragError, Result};
use crate::text::excerpt;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const BASE_URL: &str = "https://newsapi.org/v2/everything";
const SUMMARY_CHARS: usize = 200;
const REMOVED_MARKER: &str = "[Removed]";

/// A headline ready to be indexed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub published: Option<NaiveDate>,
    pub title: String,
    pub summary: String,
}

impl NewsItem {
    /// `[YYYY-MM-DD] title` followed by the summary on its own line
    pub fn render(&self) -> String {
        let date = self
            .published
            .map_or_else(|| "undated".to_string(), |d| d.format("%Y-%m-%d").to_string());
        if self.summary.is_empty() {
            format!("[{date}] {}", self.title)
        } else {
            format!("[{date}] {}\n{}", self.title, self.summary)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    published_at: Option<DateTime<Utc>>,
}

impl Article {
    fn into_item(self) -> Option<NewsItem> {
        let title = self.title.map(|t| t.trim().to_string())?;
        if title.is_empty() || title == REMOVED_MARKER {
            return None;
        }

        let clean = |field: Option<String>| {
            field
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && s != REMOVED_MARKER)
        };
        let summary = clean(self.description)
            .or_else(|| clean(self.content).map(|c| excerpt(&c, SUMMARY_CHARS).to_string()))
            .unwrap_or_default();

        Some(NewsItem {
            published: self.published_at.map(|t| t.date_naive()),
            title,
            summary,
        })
    }
}

/// NewsAPI `everything` client
#[derive(Debug, Clone)]
pub struct NewsApiClient {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
    window_days: i64,
    page_size: u32,
}

impl NewsApiClient {
    /// Client looking back 7 days, 10 articles per query
    pub fn new(api_key: impl Into<String>, rate_limit: u32) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: api_key.into(),
            rate_limiter: per_minute_limiter(rate_limit),
            window_days: 7,
            page_size: 10,
        }
    }

    pub fn with_window(mut self, days: i64, page_size: u32) -> Self {
        self.window_days = days.max(1);
        self.page_size = page_size.clamp(1, 100);
        self
    }

    /// Articles about `query` published within the window, most relevant first
    #[instrument(skip(self), fields(days = self.window_days))]
    pub async fn search(&self, query: &str) -> Result<Vec<NewsItem>> {
        self.rate_limiter.until_ready().await;

        let from = (Utc::now() - chrono::Duration::days(self.window_days))
            .format("%Y-%m-%d")
            .to_string();
        let page_size = self.page_size.to_string();
        let params = [
            ("q", query),
            ("from", from.as_str()),
            ("language", "en"),
            ("sortBy", "relevancy"),
            ("pageSize", page_size.as_str()),
        ];

        let response = self
            .client
            .get(BASE_URL)
            .header("X-Api-Key", &self.api_key)
            .query(&params)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                return Err(CragError::Unauthorized {
                    provider: "NewsAPI".to_string(),
                });
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(CragError::RateLimitExceeded {
                    provider: "NewsAPI".to_string(),
                });
            }
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(CragError::ApiError(format!("NewsAPI error {status}: {body}")));
            }
            _ => {}
        }

        let items = parse_articles(response.json().await?);
        debug!(count = items.len(), "News fetched");
        Ok(items)
    }
}

fn parse_articles(response: EverythingResponse) -> Vec<NewsItem> {
    response
        .articles
        .into_iter()
        .filter_map(Article::into_item)
        .collect()
}

#[async_trait]
impl NewsSource for NewsApiClient {
    async fn recent(&self, query: &str) -> Result<Vec<NewsItem>> {
        self.search(query).await
    }
}
