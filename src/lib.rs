pub mod adapters;
pub mod api;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::Application;
pub use config::RouterConfig;
pub use crate::core::{
    observer::{InMemoryObserver, MigrationProgress},
    policy::{AllowListPolicy, PercentagePolicy, PrefixPolicy},
    registry::ProviderRegistry,
    router::StranglerRouter,
};
pub use domain::model::{Customer, Lookup, RoutingDecision, RoutingKey, Selector};
pub use utils::error::{ProviderError, Result, RouterError};
