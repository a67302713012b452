use crate::domain::model::Selector;
use crate::domain::ports::{CustomerProvider, RoutingPolicy};
use crate::utils::error::{Result, RouterError};
use std::collections::HashMap;
use std::sync::Arc;

/// Selector → provider mapping, frozen once the router is built.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<Selector, Arc<dyn CustomerProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        selector: Selector,
        provider: Arc<dyn CustomerProvider>,
    ) -> Result<()> {
        if self.providers.contains_key(&selector) {
            return Err(RouterError::configuration(format!(
                "backend '{}' registered twice",
                selector
            )));
        }
        tracing::debug!("Registered backend '{}': {}", selector, provider.describe());
        self.providers.insert(selector, provider);
        Ok(())
    }

    pub fn with(mut self, selector: Selector, provider: Arc<dyn CustomerProvider>) -> Result<Self> {
        self.register(selector, provider)?;
        Ok(self)
    }

    pub fn get(&self, selector: &Selector) -> Option<&Arc<dyn CustomerProvider>> {
        self.providers.get(selector)
    }

    pub fn selectors(&self) -> Vec<Selector> {
        let mut selectors: Vec<Selector> = self.providers.keys().cloned().collect();
        selectors.sort();
        selectors
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Fails unless every selector the policy can produce has a provider.
    pub fn validate_against(&self, policy: &dyn RoutingPolicy) -> Result<()> {
        let reachable = policy.selectors();
        let missing: Vec<String> = reachable
            .iter()
            .filter(|selector| !self.providers.contains_key(selector))
            .map(ToString::to_string)
            .collect();

        if !missing.is_empty() {
            return Err(RouterError::configuration(format!(
                "policy '{}' can select unregistered backend(s): {}",
                policy.name(),
                missing.join(", ")
            )));
        }

        // 遷移完成後舊後端仍可能留在註冊表中，只發出警告
        for selector in self.selectors() {
            if !reachable.contains(&selector) {
                tracing::warn!(
                    "Backend '{}' is registered but unreachable under policy '{}'",
                    selector,
                    policy.name()
                );
            }
        }

        Ok(())
    }
}
