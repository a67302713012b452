use crate::domain::model::{Customer, Lookup, RoutingKey, Selector};
use crate::domain::ports::CustomerProvider;
use crate::utils::error::ProviderError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Serves customers from a fixed in-memory data set.
#[derive(Debug, Clone)]
pub struct FixtureProvider {
    selector: Selector,
    customers: HashMap<String, Customer>,
}

impl FixtureProvider {
    pub fn new(selector: Selector, customers: Vec<Customer>) -> Self {
        let customers = customers
            .into_iter()
            .map(|mut customer| {
                customer.source = Some(selector.clone());
                (customer.id.clone(), customer)
            })
            .collect();
        Self {
            selector,
            customers,
        }
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}

#[async_trait]
impl CustomerProvider for FixtureProvider {
    async fn lookup(&self, key: &RoutingKey) -> Result<Lookup, ProviderError> {
        Ok(self
            .customers
            .get(key.as_str())
            .cloned()
            .map(Lookup::Found)
            .unwrap_or(Lookup::NotFound))
    }

    fn describe(&self) -> String {
        format!("fixture({} customers for '{}')", self.customers.len(), self.selector)
    }
}
