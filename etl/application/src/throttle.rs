use async_trait::async_trait;
use shaku::Interface;

/// Politeness pacing between calls to the rate provider. Not a correctness
/// requirement; the configured interval is a courtesy minimum.
#[async_trait]
pub trait RequestThrottle: Interface {
    async fn acquire(&self);
}
