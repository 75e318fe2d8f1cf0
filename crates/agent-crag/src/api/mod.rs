//! Data acquisition connectors
//!
//! Setup pulls market facts and headlines through [`MarketDataSource`] and
//! [`NewsSource`]; the corrective path searches the web through
//! [`TavilySearch`](tavily::TavilySearch).

pub mod alpha_vantage;
pub mod market;
pub mod newsapi;
pub mod tavily;
pub mod yahoo;

use crate::error::Result;
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

pub use alpha_vantage::{AlphaVantageClient, CompanyOverview};
pub use market::{MarketDataService, MarketSnapshot, PriceSummary};
pub use newsapi::{NewsApiClient, NewsItem};
pub use tavily::TavilySearch;
pub use yahoo::YahooFinanceClient;

pub(crate) type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

pub(crate) fn per_minute_limiter(requests: u32) -> SharedRateLimiter {
    let quota = Quota::per_minute(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

pub(crate) const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Current structured facts for a ticker
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn snapshot(&self, ticker: &str) -> Result<MarketSnapshot>;
}

/// Recent headlines matching a query
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn recent(&self, query: &str) -> Result<Vec<NewsItem>>;
}
