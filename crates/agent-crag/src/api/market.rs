//! Market snapshot assembled from price history and fundamentals

use super::MarketDataSource;
use super::alpha_vantage::{AlphaVantageClient, CompanyOverview};
use super::yahoo::{Quote, YahooFinanceClient};
use crate::cache::SnapshotCache;
use crate::error::{CragError, Result};
use crate::text::excerpt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{info, instrument, warn};

const NOT_AVAILABLE: &str = "N/A";
const DESCRIPTION_CHARS: usize = 500;

/// Price statistics over the fetched window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub start: f64,
    pub current: f64,
    pub return_pct: f64,
    pub avg_volume: f64,
    pub low: f64,
    pub high: f64,
    pub sessions: usize,
}

impl PriceSummary {
    /// `None` when there are no usable bars
    pub fn from_quotes(quotes: &[Quote]) -> Option<Self> {
        let bars: Vec<&Quote> = quotes.iter().filter(|q| q.close > 0.0).collect();
        let (first, last) = (bars.first()?, bars.last()?);

        let avg_volume = bars.iter().map(|q| q.volume as f64).sum::<f64>() / bars.len() as f64;
        let low = bars.iter().map(|q| q.low).fold(f64::INFINITY, f64::min);
        let high = bars
            .iter()
            .map(|q| q.high)
            .fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            start: first.close,
            current: last.close,
            return_pct: (last.close / first.close - 1.0) * 100.0,
            avg_volume,
            low,
            high,
            sessions: bars.len(),
        })
    }
}

/// Everything setup knows about a ticker's market position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub ticker: String,
    pub price: PriceSummary,
    pub overview: Option<CompanyOverview>,
}

impl MarketSnapshot {
    /// Display name for news queries; falls back to the ticker
    pub fn company_name(&self) -> &str {
        self.overview_field(|o| o.name.as_ref()).unwrap_or(&self.ticker)
    }

    fn overview_field<'a>(
        &'a self,
        pick: impl Fn(&'a CompanyOverview) -> Option<&'a String>,
    ) -> Option<&'a str> {
        self.overview
            .as_ref()
            .and_then(|o| CompanyOverview::value(pick(o)))
    }

    fn or_na<'a>(&'a self, pick: impl Fn(&'a CompanyOverview) -> Option<&'a String>) -> &'a str {
        self.overview_field(pick).unwrap_or(NOT_AVAILABLE)
    }

    /// Text indexed as the ticker's market data document
    pub fn render(&self) -> String {
        let p = &self.price;
        let mut text = String::new();

        let name = self.or_na(|o| o.name.as_ref());
        let market_cap = self
            .overview_field(|o| o.market_cap.as_ref())
            .map_or_else(|| NOT_AVAILABLE.to_string(), |cap| format!("${}", group_digits(cap)));

        let _ = writeln!(text, "STOCK: {} - {name}", self.ticker);
        let _ = writeln!(
            text,
            "Sector: {} | Industry: {}",
            self.or_na(|o| o.sector.as_ref()),
            self.or_na(|o| o.industry.as_ref())
        );
        let _ = writeln!(text);
        let _ = writeln!(text, "CURRENT PRICE: ${:.2}", p.current);
        let _ = writeln!(text, "Market Cap: {market_cap}");
        let _ = writeln!(text, "P/E Ratio: {}", self.or_na(|o| o.pe_ratio.as_ref()));
        let _ = writeln!(text, "Forward P/E: {}", self.or_na(|o| o.forward_pe.as_ref()));
        let _ = writeln!(text, "PEG Ratio: {}", self.or_na(|o| o.peg_ratio.as_ref()));
        let _ = writeln!(text, "Beta: {}", self.or_na(|o| o.beta.as_ref()));
        let _ = writeln!(text);
        let _ = writeln!(
            text,
            "52-WEEK RANGE: ${} - ${}",
            self.or_na(|o| o.week52_low.as_ref()),
            self.or_na(|o| o.week52_high.as_ref())
        );
        let _ = writeln!(text);
        let _ = writeln!(text, "1-MONTH PERFORMANCE ({} sessions):", p.sessions);
        let _ = writeln!(text, "Start: ${:.2}", p.start);
        let _ = writeln!(text, "Current: ${:.2}", p.current);
        let _ = writeln!(text, "Return: {:.2}%", p.return_pct);
        let _ = writeln!(text, "Low/High: ${:.2} - ${:.2}", p.low, p.high);
        let _ = writeln!(text, "Avg Volume: {}", group_digits(&format!("{:.0}", p.avg_volume)));

        if let Some(description) = self.overview_field(|o| o.description.as_ref()) {
            let _ = writeln!(text);
            let _ = write!(text, "DESCRIPTION: {}", excerpt(description, DESCRIPTION_CHARS));
        }

        text.trim_end().to_string()
    }
}

/// Insert thousands separators into a run of digits; other input is returned as-is
fn group_digits(digits: &str) -> String {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return digits.to_string();
    }
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// [`MarketDataSource`] over Yahoo price history plus optional Alpha Vantage fundamentals
pub struct MarketDataService {
    yahoo: YahooFinanceClient,
    alpha_vantage: Option<AlphaVantageClient>,
    cache: SnapshotCache<MarketSnapshot>,
}

impl MarketDataService {
    pub fn new(
        yahoo: YahooFinanceClient,
        alpha_vantage: Option<AlphaVantageClient>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            yahoo,
            alpha_vantage,
            cache: SnapshotCache::new(cache_ttl),
        }
    }

    async fn fetch(&self, ticker: &str) -> Result<MarketSnapshot> {
        let quotes = self.yahoo.get_recent_quotes(ticker).await?;
        let price = PriceSummary::from_quotes(&quotes)
            .ok_or_else(|| CragError::data_unavailable(ticker, "no price history returned"))?;

        let overview = match &self.alpha_vantage {
            Some(client) => match client.get_company_overview(ticker).await {
                Ok(overview) => Some(overview),
                Err(e) => {
                    warn!(
                        ticker,
                        error = %e,
                        "Fundamentals unavailable, continuing with prices only"
                    );
                    None
                }
            },
            None => None,
        };

        Ok(MarketSnapshot {
            ticker: ticker.to_string(),
            price,
            overview,
        })
    }
}

#[async_trait]
impl MarketDataSource for MarketDataService {
    #[instrument(skip(self))]
    async fn snapshot(&self, ticker: &str) -> Result<MarketSnapshot> {
        let snapshot = self.cache.get_or_fetch(ticker, || self.fetch(ticker)).await?;
        info!(
            ticker,
            current = snapshot.price.current,
            fundamentals = snapshot.overview.is_some(),
            "Market snapshot ready"
        );
        Ok(snapshot)
    }
}
