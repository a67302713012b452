use crate::core::registry::ProviderRegistry;
use crate::domain::model::{Lookup, RoutingDecision, RoutingKey, Selector};
use crate::domain::ports::{MigrationObserver, RoutingPolicy};
use crate::utils::error::{ProviderError, Result, RouterError};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Sends each customer lookup to exactly one backend chosen by the policy.
///
/// Holds no per-request state; share it behind an `Arc` and call it from
/// as many tasks as needed.
pub struct StranglerRouter {
    policy: Arc<dyn RoutingPolicy>,
    registry: ProviderRegistry,
    observer: Arc<dyn MigrationObserver>,
    timeout: Option<Duration>,
}

impl StranglerRouter {
    /// Builds the router, rejecting any policy that can select an
    /// unregistered backend.
    pub fn new(
        policy: Arc<dyn RoutingPolicy>,
        registry: ProviderRegistry,
        observer: Arc<dyn MigrationObserver>,
    ) -> Result<Self> {
        registry.validate_against(policy.as_ref())?;

        tracing::info!(
            "🔀 Router ready: policy '{}' over backends {:?}",
            policy.name(),
            registry.selectors()
        );

        Ok(Self {
            policy,
            registry,
            observer,
            timeout: None,
        })
    }

    /// Default bound for provider calls, taken from deployment config.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn policy(&self) -> &dyn RoutingPolicy {
        self.policy.as_ref()
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub async fn handle(&self, raw_key: &str) -> Result<Lookup> {
        let key = RoutingKey::parse(raw_key)?;
        self.route(&key).await
    }

    pub async fn route(&self, key: &RoutingKey) -> Result<Lookup> {
        self.route_with_timeout(key, self.timeout).await
    }

    /// Routes one request, bounding the provider call by `timeout` if given.
    ///
    /// The decision is recorded exactly once, including when the provider
    /// fails or the returned future is dropped before completion.
    pub async fn route_with_timeout(
        &self,
        key: &RoutingKey,
        timeout: Option<Duration>,
    ) -> Result<Lookup> {
        let selector = self.policy.decide(key.as_str());
        let mut observation = Observation::new(
            self.observer.as_ref(),
            RoutingDecision::new(key, selector.clone()),
        );

        let span = tracing::debug_span!("route", key = %key, backend = %selector);
        let result = self
            .dispatch(key, &selector, timeout)
            .instrument(span)
            .await;
        observation.emit();

        match &result {
            Ok(lookup) => {
                tracing::debug!("'{}' served by '{}': {}", key, selector, lookup.outcome())
            }
            Err(e) => tracing::warn!("❌ '{}' failed on '{}': {}", key, selector, e),
        }
        result
    }

    async fn dispatch(
        &self,
        key: &RoutingKey,
        selector: &Selector,
        timeout: Option<Duration>,
    ) -> Result<Lookup> {
        let provider = self.registry.get(selector).ok_or_else(|| {
            RouterError::configuration(format!("no backend registered for '{}'", selector))
        })?;

        let call = provider.lookup(key);
        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ProviderError::Timeout {
                    elapsed_ms: limit.as_millis() as u64,
                }),
            },
            None => call.await,
        };

        // 不做跨後端重試：每個後端都是其流量區段的權威來源
        outcome.map_err(|source| RouterError::BackendUnavailable {
            selector: selector.clone(),
            source,
        })
    }
}

/// Records the decision on `emit`, or on drop if the request was cancelled.
struct Observation<'a> {
    observer: &'a dyn MigrationObserver,
    decision: Option<RoutingDecision>,
}

impl<'a> Observation<'a> {
    fn new(observer: &'a dyn MigrationObserver, decision: RoutingDecision) -> Self {
        Self {
            observer,
            decision: Some(decision),
        }
    }

    fn emit(&mut self) {
        let Some(decision) = self.decision.take() else {
            return;
        };
        match catch_unwind(AssertUnwindSafe(|| self.observer.record(&decision))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(
                "Dropped routing decision for '{}': {}",
                decision.routing_key,
                e
            ),
            Err(_) => tracing::warn!(
                "Observer panicked while recording '{}'",
                decision.routing_key
            ),
        }
    }
}

impl Drop for Observation<'_> {
    fn drop(&mut self) {
        if self.decision.is_some() {
            tracing::debug!("Request cancelled before completion, recording decision");
            self.emit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{FixtureProvider, SynthesizingProvider};
    use crate::core::observer::InMemoryObserver;
    use crate::core::policy::PrefixPolicy;
    use crate::domain::model::Customer;
    use crate::domain::ports::CustomerProvider;
    use async_trait::async_trait;

    struct Broken;

    #[async_trait]
    impl CustomerProvider for Broken {
        async fn lookup(&self, _key: &RoutingKey) -> std::result::Result<Lookup, ProviderError> {
            Err(ProviderError::Unavailable("connection refused".to_string()))
        }

        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    struct Stalled;

    #[async_trait]
    impl CustomerProvider for Stalled {
        async fn lookup(&self, _key: &RoutingKey) -> std::result::Result<Lookup, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Lookup::NotFound)
        }

        fn describe(&self) -> String {
            "stalled".to_string()
        }
    }

    struct PanickingObserver;

    impl MigrationObserver for PanickingObserver {
        fn record(&self, _decision: &RoutingDecision) -> Result<()> {
            panic!("metrics sink exploded");
        }
    }

    fn build(
        legacy: Arc<dyn CustomerProvider>,
        modern: Arc<dyn CustomerProvider>,
    ) -> (StranglerRouter, Arc<InMemoryObserver>) {
        let observer = Arc::new(InMemoryObserver::new());
        let registry = ProviderRegistry::new()
            .with(Selector::legacy(), legacy)
            .unwrap()
            .with(Selector::modern(), modern)
            .unwrap();
        let router = StranglerRouter::new(
            Arc::new(PrefixPolicy::strangler_default()),
            registry,
            observer.clone(),
        )
        .unwrap();
        (router, observer)
    }

    fn synthesized() -> (StranglerRouter, Arc<InMemoryObserver>) {
        build(
            Arc::new(SynthesizingProvider::new(Selector::legacy(), "Legacy Customer")),
            Arc::new(SynthesizingProvider::new(Selector::modern(), "Modern Customer")),
        )
    }

    #[tokio::test]
    async fn test_modern_prefix_goes_to_modern_backend() {
        let (router, observer) = synthesized();

        let lookup = router.handle("MODERN_1").await.unwrap();

        let Lookup::Found(customer) = lookup else {
            panic!("expected a customer");
        };
        assert_eq!(customer.id, "MODERN_1");
        assert_eq!(customer.name.as_deref(), Some("Modern Customer"));
        assert_eq!(customer.source, Some(Selector::modern()));
        assert_eq!(observer.count(&Selector::modern()), 1);
    }

    #[tokio::test]
    async fn test_unmatched_ids_fall_back_to_legacy() {
        let (router, observer) = synthesized();

        for id in ["LEGACY_1", "anything-else", "modern_lowercase"] {
            match router.handle(id).await.unwrap() {
                Lookup::Found(customer) => {
                    assert_eq!(customer.name.as_deref(), Some("Legacy Customer"))
                }
                Lookup::NotFound => panic!("synthesizing backend never misses"),
            }
        }
        assert_eq!(observer.count(&Selector::legacy()), 3);
        assert_eq!(observer.count(&Selector::modern()), 0);
    }

    #[tokio::test]
    async fn test_invalid_key_is_rejected_without_observation() {
        let (router, observer) = synthesized();

        let err = router.handle("  ").await.unwrap_err();

        assert!(matches!(err, RouterError::ValidationError { .. }));
        assert_eq!(observer.snapshot().total, 0);
    }

    #[tokio::test]
    async fn test_not_found_is_returned_unchanged_and_observed() {
        let fixture = FixtureProvider::new(
            Selector::modern(),
            vec![Customer::new("MODERN_1", Some("Ada".into()), Selector::modern())],
        );
        let (router, observer) = build(
            Arc::new(SynthesizingProvider::new(Selector::legacy(), "Legacy Customer")),
            Arc::new(fixture),
        );

        assert_eq!(router.handle("MODERN_404").await.unwrap(), Lookup::NotFound);
        assert!(router.handle("MODERN_1").await.unwrap().is_found());
        assert_eq!(observer.count(&Selector::modern()), 2);
    }

    #[tokio::test]
    async fn test_backend_failure_is_tagged_and_not_retried_elsewhere() {
        let (router, observer) = build(
            Arc::new(SynthesizingProvider::new(Selector::legacy(), "Legacy Customer")),
            Arc::new(Broken),
        );

        let err = router.handle("MODERN_1").await.unwrap_err();

        match err {
            RouterError::BackendUnavailable { selector, .. } => {
                assert_eq!(selector, Selector::modern())
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(observer.count(&Selector::modern()), 1);
        assert_eq!(observer.count(&Selector::legacy()), 0);
    }

    #[tokio::test]
    async fn test_timeout_becomes_backend_unavailable() {
        let (router, observer) = build(
            Arc::new(SynthesizingProvider::new(Selector::legacy(), "Legacy Customer")),
            Arc::new(Stalled),
        );
        let router = router.with_timeout(Duration::from_millis(50));

        let err = router.handle("MODERN_1").await.unwrap_err();

        assert!(matches!(
            err,
            RouterError::BackendUnavailable {
                source: ProviderError::Timeout { elapsed_ms: 50 },
                ..
            }
        ));
        assert_eq!(observer.count(&Selector::modern()), 1);
    }

    #[tokio::test]
    async fn test_cancelled_request_still_records_decision() {
        let (router, observer) = build(
            Arc::new(SynthesizingProvider::new(Selector::legacy(), "Legacy Customer")),
            Arc::new(Stalled),
        );

        let cancelled =
            tokio::time::timeout(Duration::from_millis(10), router.handle("MODERN_1")).await;

        assert!(cancelled.is_err());
        assert_eq!(observer.count(&Selector::modern()), 1);
    }

    #[tokio::test]
    async fn test_observer_panic_does_not_fail_request() {
        let registry = ProviderRegistry::new()
            .with(
                Selector::legacy(),
                Arc::new(SynthesizingProvider::new(Selector::legacy(), "Legacy Customer")),
            )
            .unwrap()
            .with(
                Selector::modern(),
                Arc::new(SynthesizingProvider::new(Selector::modern(), "Modern Customer")),
            )
            .unwrap();
        let router = StranglerRouter::new(
            Arc::new(PrefixPolicy::strangler_default()),
            registry,
            Arc::new(PanickingObserver),
        )
        .unwrap();

        assert!(router.handle("LEGACY_1").await.unwrap().is_found());
    }

    #[test]
    fn test_unregistered_selector_fails_at_construction() {
        let registry = ProviderRegistry::new()
            .with(
                Selector::legacy(),
                Arc::new(SynthesizingProvider::new(Selector::legacy(), "Legacy Customer")),
            )
            .unwrap();

        let result = StranglerRouter::new(
            Arc::new(PrefixPolicy::strangler_default()),
            registry,
            Arc::new(InMemoryObserver::new()),
        );

        assert!(matches!(result, Err(RouterError::ConfigurationError { .. })));
    }
}
