//! Per-ticker reader/writer leases
//!
//! A question holds a shared lease on its ticker for the whole run; setup
//! holds the exclusive lease while it re-indexes. Different tickers never
//! contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Shared lease on one ticker's index
pub type ReadLease = OwnedRwLockReadGuard<()>;

/// Exclusive lease on one ticker's index
pub type WriteLease = OwnedRwLockWriteGuard<()>;

/// Registry of per-ticker locks; clones share the same registry
#[derive(Debug, Clone, Default)]
pub struct TickerLocks {
    locks: Arc<Mutex<HashMap<String, Arc<RwLock<()>>>>>,
}

impl TickerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, ticker: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(ticker.to_string()).or_default())
    }

    /// Wait for a shared lease
    pub async fn read(&self, ticker: &str) -> ReadLease {
        self.lock_for(ticker).read_owned().await
    }

    /// Wait for the exclusive lease
    pub async fn write(&self, ticker: &str) -> WriteLease {
        self.lock_for(ticker).write_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_readers_share() {
        let locks = TickerLocks::new();
        let _a = locks.read("AAPL").await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.read("AAPL")).await;
        assert!(b.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_writer_waits_for_readers() {
        let locks = TickerLocks::new();
        let reader = locks.read("AAPL").await;

        let blocked = tokio::time::timeout(Duration::from_secs(1), locks.write("AAPL")).await;
        assert!(blocked.is_err());

        drop(reader);
        let acquired = tokio::time::timeout(Duration::from_secs(1), locks.write("AAPL")).await;
        assert!(acquired.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tickers_are_independent() {
        let locks = TickerLocks::new();
        let _writer = locks.write("AAPL").await;
        let other = tokio::time::timeout(Duration::from_secs(1), locks.read("MSFT")).await;
        assert!(other.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_registry() {
        let locks = TickerLocks::new();
        let clone = locks.clone();
        let _writer = locks.write("NVDA").await;
        let blocked = tokio::time::timeout(Duration::from_secs(1), clone.read("NVDA")).await;
        assert!(blocked.is_err());
    }
}
