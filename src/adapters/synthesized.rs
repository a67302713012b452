use crate::domain::model::{Customer, Lookup, RoutingKey, Selector};
use crate::domain::ports::CustomerProvider;
use crate::utils::error::ProviderError;
use async_trait::async_trait;

/// Answers every lookup with a customer carrying a fixed display name.
#[derive(Debug, Clone)]
pub struct SynthesizingProvider {
    selector: Selector,
    display_name: String,
}

impl SynthesizingProvider {
    pub fn new(selector: Selector, display_name: impl Into<String>) -> Self {
        Self {
            selector,
            display_name: display_name.into(),
        }
    }
}

#[async_trait]
impl CustomerProvider for SynthesizingProvider {
    async fn lookup(&self, key: &RoutingKey) -> Result<Lookup, ProviderError> {
        Ok(Lookup::Found(Customer::new(
            key.as_str(),
            Some(self.display_name.clone()),
            self.selector.clone(),
        )))
    }

    fn describe(&self) -> String {
        format!("synthesized(\"{}\")", self.display_name)
    }
}
