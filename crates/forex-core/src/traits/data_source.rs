//! Market-data and news collaborator traits.

use crate::error::DataError;
use crate::types::{Bar, MarketContext};
use async_trait::async_trait;

/// Trait for price-bar providers.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch the most recent bars, ordered from oldest to newest.
    ///
    /// # Arguments
    /// * `instrument` - The instrument to fetch, e.g. `EUR/USD`
    /// * `count` - Maximum number of bars to return
    async fn recent_bars(&self, instrument: &str, count: usize) -> Result<Vec<Bar>, DataError>;

    /// Fetch the latest bar for an instrument.
    async fn latest_bar(&self, instrument: &str) -> Result<Bar, DataError> {
        self.recent_bars(instrument, 1)
            .await?
            .pop()
            .ok_or_else(|| DataError::NoDataAvailable(instrument.to_string()))
    }

    /// Get the data source name.
    fn name(&self) -> &str;
}

/// Trait for headline and sentiment providers.
///
/// A news source is advisory: callers treat errors as an empty context.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Fetch the current headline and sentiment for an instrument.
    async fn context(&self, instrument: &str) -> Result<MarketContext, DataError>;

    /// Get the source name.
    fn name(&self) -> &str;
}
