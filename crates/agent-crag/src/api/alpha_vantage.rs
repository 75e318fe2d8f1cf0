//! Alpha Vantage company fundamentals

use super::{SharedRateLimiter, per_minute_limiter};
use crate::error::{CragError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

const BASE_URL: &str = "https://www.alphavantage.co/query";

/// Alpha Vantage `OVERVIEW` client
#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

/// Company overview data
///
/// Alpha Vantage sends every value as a string and uses `"None"` or `"-"`
/// for missing ones; see [`CompanyOverview::value`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompanyOverview {
    pub symbol: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    #[serde(rename = "MarketCapitalization")]
    pub market_cap: Option<String>,
    #[serde(rename = "PERatio")]
    pub pe_ratio: Option<String>,
    #[serde(rename = "ForwardPE")]
    pub forward_pe: Option<String>,
    #[serde(rename = "PEGRatio")]
    pub peg_ratio: Option<String>,
    pub beta: Option<String>,
    #[serde(rename = "52WeekHigh")]
    pub week52_high: Option<String>,
    #[serde(rename = "52WeekLow")]
    pub week52_low: Option<String>,
}

impl CompanyOverview {
    /// A field's value, or `None` when Alpha Vantage marked it missing
    pub fn value(field: Option<&String>) -> Option<&str> {
        field
            .map(|v| v.trim())
            .filter(|v| !v.is_empty() && *v != "None" && *v != "-")
    }
}

impl AlphaVantageClient {
    /// Create a client; `rate_limit` is requests per minute (free tier: 5)
    pub fn new(api_key: impl Into<String>, rate_limit: u32) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            rate_limiter: per_minute_limiter(rate_limit),
        }
    }

    /// Get company overview and fundamental data
    #[instrument(skip(self))]
    pub async fn get_company_overview(&self, symbol: &str) -> Result<CompanyOverview> {
        self.rate_limiter.until_ready().await;

        let params = [
            ("function", "OVERVIEW"),
            ("symbol", symbol),
            ("apikey", self.api_key.as_str()),
        ];
        let response = self.client.get(BASE_URL).query(&params).send().await?;

        if !response.status().is_success() {
            return Err(CragError::ApiError(format!(
                "Alpha Vantage HTTP error: {}",
                response.status()
            )));
        }

        parse_overview(symbol, response.json().await?)
    }
}

fn parse_overview(symbol: &str, data: serde_json::Value) -> Result<CompanyOverview> {
    if let Some(error) = data.get("Error Message") {
        return Err(CragError::ApiError(format!("Alpha Vantage: {error}")));
    }

    if data.get("Note").is_some() || data.get("Information").is_some() {
        return Err(CragError::RateLimitExceeded {
            provider: "Alpha Vantage".to_string(),
        });
    }

    if data.as_object().is_none_or(serde_json::Map::is_empty) {
        return Err(CragError::data_unavailable(symbol, "no company overview"));
    }

    Ok(serde_json::from_value(data)?)
}
