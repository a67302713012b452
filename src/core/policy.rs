//! Routing policies deciding which backend owns a customer id.
//!
//! Every policy here is pure and total: no I/O, no panics, and a default
//! selector for inputs that match nothing.

use crate::config::toml_config::{PolicyConfig, PrefixRule};
use crate::domain::model::Selector;
use crate::domain::ports::RoutingPolicy;
use crate::utils::error::{Result, RouterError};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Ordered prefix rules; the first anchored, case-sensitive match wins.
#[derive(Debug, Clone)]
pub struct PrefixPolicy {
    rules: Vec<(String, Selector)>,
    default: Selector,
}

impl PrefixPolicy {
    pub fn new(default: Selector) -> Self {
        Self {
            rules: Vec::new(),
            default,
        }
    }

    pub fn with_rule(mut self, prefix: impl Into<String>, selector: Selector) -> Self {
        self.rules.push((prefix.into(), selector));
        self
    }

    /// `MODERN_*` goes to the modern backend, everything else stays on legacy.
    pub fn strangler_default() -> Self {
        Self::new(Selector::legacy()).with_rule("MODERN_", Selector::modern())
    }
}

impl RoutingPolicy for PrefixPolicy {
    fn decide(&self, key: &str) -> Selector {
        self.rules
            .iter()
            .find(|(prefix, _)| key.starts_with(prefix.as_str()))
            .map(|(_, selector)| selector.clone())
            .unwrap_or_else(|| self.default.clone())
    }

    fn selectors(&self) -> Vec<Selector> {
        let mut all: BTreeSet<Selector> = self.rules.iter().map(|(_, s)| s.clone()).collect();
        all.insert(self.default.clone());
        all.into_iter().collect()
    }

    fn name(&self) -> &'static str {
        "prefix"
    }
}

/// Exact ids moved to the target backend one by one.
#[derive(Debug, Clone)]
pub struct AllowListPolicy {
    ids: HashSet<String>,
    target: Selector,
    fallback: Selector,
}

impl AllowListPolicy {
    pub fn new<I, S>(ids: I, target: Selector, fallback: Selector) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            target,
            fallback,
        }
    }
}

impl RoutingPolicy for AllowListPolicy {
    fn decide(&self, key: &str) -> Selector {
        if self.ids.contains(key) {
            self.target.clone()
        } else {
            self.fallback.clone()
        }
    }

    fn selectors(&self) -> Vec<Selector> {
        dedup(vec![self.target.clone(), self.fallback.clone()])
    }

    fn name(&self) -> &'static str {
        "allow_list"
    }
}

/// Deterministic percentage rollout keyed on a stable hash of the id.
#[derive(Debug, Clone)]
pub struct PercentagePolicy {
    percent: u8,
    target: Selector,
    fallback: Selector,
}

impl PercentagePolicy {
    pub fn new(percent: u8, target: Selector, fallback: Selector) -> Result<Self> {
        if percent > 100 {
            return Err(RouterError::InvalidConfigValueError {
                field: "routing.percent".to_string(),
                value: percent.to_string(),
                reason: "Value must be between 0 and 100".to_string(),
            });
        }
        Ok(Self {
            percent,
            target,
            fallback,
        })
    }

    pub fn bucket(key: &str) -> u8 {
        (fnv1a(key.as_bytes()) % 100) as u8
    }
}

impl RoutingPolicy for PercentagePolicy {
    fn decide(&self, key: &str) -> Selector {
        if Self::bucket(key) < self.percent {
            self.target.clone()
        } else {
            self.fallback.clone()
        }
    }

    fn selectors(&self) -> Vec<Selector> {
        dedup(vec![self.target.clone(), self.fallback.clone()])
    }

    fn name(&self) -> &'static str {
        "percentage"
    }
}

// 使用固定的 FNV-1a，確保跨行程、跨版本的分桶結果一致
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(PRIME))
}

fn dedup(selectors: Vec<Selector>) -> Vec<Selector> {
    selectors
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// 依設定建立路由策略
pub fn from_config(config: &PolicyConfig) -> Result<Arc<dyn RoutingPolicy>> {
    let policy: Arc<dyn RoutingPolicy> = match config {
        PolicyConfig::Prefix { default, rules } => {
            let policy = rules.iter().fold(
                PrefixPolicy::new(default.clone()),
                |policy, PrefixRule { prefix, selector }| {
                    policy.with_rule(prefix.clone(), selector.clone())
                },
            );
            Arc::new(policy)
        }
        PolicyConfig::AllowList {
            ids,
            target,
            fallback,
        } => Arc::new(AllowListPolicy::new(
            ids.iter().cloned(),
            target.clone(),
            fallback.clone(),
        )),
        PolicyConfig::Percentage {
            percent,
            target,
            fallback,
        } => Arc::new(PercentagePolicy::new(
            *percent,
            target.clone(),
            fallback.clone(),
        )?),
    };

    tracing::debug!(
        "Routing policy '{}' can select: {:?}",
        policy.name(),
        policy.selectors()
    );
    Ok(policy)
}
