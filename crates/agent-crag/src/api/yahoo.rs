//! Yahoo Finance price history

use crate::error::{CragError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::instrument;
use yahoo_finance_api as yahoo;

/// Yahoo Finance API client
#[derive(Debug, Clone)]
pub struct YahooFinanceClient {
    history_days: i64,
}

/// One daily bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub timestamp: DateTime<Utc>,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl YahooFinanceClient {
    /// Client fetching `history_days` of daily bars per request
    pub fn new(history_days: i64) -> Self {
        Self {
            history_days: history_days.max(1),
        }
    }

    /// Daily bars from `history_days` ago until now, oldest first
    #[instrument(skip(self), fields(days = self.history_days))]
    pub async fn get_recent_quotes(&self, symbol: &str) -> Result<Vec<Quote>> {
        let provider =
            yahoo::YahooConnector::new().map_err(|e| CragError::YahooFinanceError(e.to_string()))?;

        let end = Utc::now();
        let start = end - chrono::Duration::days(self.history_days);
        let start_odt = OffsetDateTime::from_unix_timestamp(start.timestamp())
            .map_err(|e| CragError::YahooFinanceError(format!("Invalid start timestamp: {e}")))?;
        let end_odt = OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| CragError::YahooFinanceError(format!("Invalid end timestamp: {e}")))?;

        let response = provider
            .get_quote_history(symbol, start_odt, end_odt)
            .await
            .map_err(|e| CragError::YahooFinanceError(e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| CragError::YahooFinanceError(e.to_string()))?;

        Ok(quotes
            .iter()
            .map(|q| Quote {
                timestamp: DateTime::from_timestamp(q.timestamp as i64, 0).unwrap_or_else(Utc::now),
                high: q.high,
                low: q.low,
                close: q.close,
                volume: q.volume,
            })
            .collect())
    }
}

impl Default for YahooFinanceClient {
    fn default() -> Self {
        Self::new(30)
    }
}
