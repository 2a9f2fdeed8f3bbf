pub mod client;
pub mod wire;

use async_trait::async_trait;

use crate::types::{OrderInfo, OrderLevel};

/// Order-entry capability consumed by the ladder manager.
///
/// The live implementation is [`client::ExchangeClient`]; tests substitute a
/// mock. Errors are strings; callers absorb them, so they never cross the
/// tick loop boundary.
#[async_trait]
pub trait OrderTransport: Send + Sync {
    /// Submit a new resting order and return its live mirror entry.
    async fn place_order(&self, level: &OrderLevel) -> Result<OrderInfo, String>;

    /// Cancel a live order.
    async fn cancel_order(&self, info: &OrderInfo) -> Result<(), String>;

    /// Cancel-then-place as one logical action.
    async fn replace_order(
        &self,
        existing: &OrderInfo,
        level: &OrderLevel,
    ) -> Result<OrderInfo, String> {
        self.cancel_order(existing).await?;
        self.place_order(level).await
    }
}
