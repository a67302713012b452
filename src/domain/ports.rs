use crate::domain::model::{Lookup, RoutingDecision, RoutingKey, Selector};
use crate::utils::error::{ProviderError, Result};
use async_trait::async_trait;

/// A backend able to fetch a customer by id (legacy, modern, ...).
///
/// Providers must not assume the caller retries or reorders their failures.
#[async_trait]
pub trait CustomerProvider: Send + Sync {
    async fn lookup(&self, key: &RoutingKey) -> std::result::Result<Lookup, ProviderError>;

    fn describe(&self) -> String;
}

/// Maps a routing key to the backend that owns it.
///
/// `decide` must be total and pure: every input, including the empty
/// string, yields one of the selectors reported by `selectors`.
pub trait RoutingPolicy: Send + Sync {
    fn decide(&self, key: &str) -> Selector;

    fn selectors(&self) -> Vec<Selector>;

    fn name(&self) -> &'static str;
}

/// Sink for routing decisions. Implementations must return quickly.
pub trait MigrationObserver: Send + Sync {
    fn record(&self, decision: &RoutingDecision) -> Result<()>;
}
