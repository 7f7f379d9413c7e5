pub mod lifi;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{SwapRequest, SwapRoute};

pub use lifi::LiFiQuotes;

/// Source of swap routes.
///
/// An empty list means no route exists for the pair. Callers decide whether
/// that is fatal.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn quote(&self, request: &SwapRequest) -> Result<Vec<SwapRoute>>;

    /// First route, if any.
    async fn best_route(&self, request: &SwapRequest) -> Result<Option<SwapRoute>> {
        Ok(self.quote(request).await?.into_iter().next())
    }
}
