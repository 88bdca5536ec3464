use crate::error::Result;
use crate::models::{DeliveryTarget, DisplayUnit};
use async_trait::async_trait;

/// Chat destination for change notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Looks up the configured target, failing when it is missing or the bot
    /// may not post there.
    async fn resolve_target(&self) -> Result<DeliveryTarget>;

    async fn deliver(&self, target: &DeliveryTarget, unit: &DisplayUnit) -> Result<()>;
}
