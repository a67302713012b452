pub mod observer;
pub mod policy;
pub mod registry;
pub mod router;

pub use crate::domain::model::{Customer, Lookup, RoutingDecision, RoutingKey, Selector};
pub use crate::domain::ports::{CustomerProvider, MigrationObserver, RoutingPolicy};
pub use crate::utils::error::Result;
