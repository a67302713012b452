//! Migration observers: where routing decisions go after each request.

use crate::domain::model::{RoutingDecision, Selector};
use crate::domain::ports::MigrationObserver;
use crate::utils::error::{Result, RouterError};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Per-backend request counters.
///
/// Uses `DashMap` so first-seen selectors can be added concurrently, and
/// `AtomicU64` so increments on known selectors never take a write lock.
#[derive(Default)]
pub struct InMemoryObserver {
    counters: DashMap<Selector, AtomicU64>,
}

impl InMemoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeds zero counters so progress reports list every backend.
    pub fn with_selectors<I: IntoIterator<Item = Selector>>(selectors: I) -> Self {
        let observer = Self::new();
        for selector in selectors {
            observer.counters.entry(selector).or_default();
        }
        observer
    }

    pub fn count(&self, selector: &Selector) -> u64 {
        self.counters
            .get(selector)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> MigrationProgress {
        let per_selector: BTreeMap<Selector, u64> = self
            .counters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();
        MigrationProgress {
            total: per_selector.values().sum(),
            per_selector,
        }
    }
}

impl MigrationObserver for InMemoryObserver {
    fn record(&self, decision: &RoutingDecision) -> Result<()> {
        if let Some(counter) = self.counters.get(&decision.selector) {
            counter.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }
        self.counters
            .entry(decision.selector.clone())
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationProgress {
    pub total: u64,
    pub per_selector: BTreeMap<Selector, u64>,
}

impl MigrationProgress {
    /// Share of traffic served by `selector`, 0.0 when nothing was routed yet.
    pub fn fraction(&self, selector: &Selector) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.per_selector.get(selector).copied().unwrap_or(0) as f64 / self.total as f64
    }
}

/// Emits one structured event per decision, for log-based metrics pipelines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl MigrationObserver for TracingObserver {
    fn record(&self, decision: &RoutingDecision) -> Result<()> {
        tracing::info!(
            target: "strangler_router::migration",
            routing_key = %decision.routing_key,
            selector = %decision.selector,
            timestamp = %decision.timestamp.to_rfc3339(),
            "routing decision"
        );
        Ok(())
    }
}

/// Forwards every decision to each inner observer.
#[derive(Default, Clone)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn MigrationObserver>>,
}

impl FanoutObserver {
    pub fn new(observers: Vec<Arc<dyn MigrationObserver>>) -> Self {
        Self { observers }
    }
}

impl MigrationObserver for FanoutObserver {
    fn record(&self, decision: &RoutingDecision) -> Result<()> {
        // 單一觀測者失敗不影響其他觀測者
        let failures: Vec<String> = self
            .observers
            .iter()
            .filter_map(|observer| observer.record(decision).err())
            .map(|e| e.to_string())
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RouterError::ObservationError {
                message: failures.join("; "),
            })
        }
    }
}
