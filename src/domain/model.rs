use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::error::{Result, RouterError};

const MAX_KEY_LEN: usize = 256;

/// Name of a registered backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(String);

impl Selector {
    pub const LEGACY: &'static str = "legacy";
    pub const MODERN: &'static str = "modern";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn legacy() -> Self {
        Self::new(Self::LEGACY)
    }

    pub fn modern() -> Self {
        Self::new(Self::MODERN)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Selector {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A customer identifier that passed request validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingKey(String);

impl RoutingKey {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(RouterError::validation("customer id cannot be empty"));
        }
        if raw.len() > MAX_KEY_LEN {
            return Err(RouterError::validation(format!(
                "customer id exceeds {} bytes",
                MAX_KEY_LEN
            )));
        }
        if raw.chars().any(char::is_control) {
            return Err(RouterError::validation(
                "customer id contains control characters",
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: Option<String>,
    /// 產生此筆資料的後端，僅供觀測使用；由 provider 填入，後端回應無法指定
    #[serde(skip)]
    pub source: Option<Selector>,
}

impl Customer {
    pub fn new(id: impl Into<String>, name: Option<String>, source: Selector) -> Self {
        Self {
            id: id.into(),
            name,
            source: Some(source),
        }
    }
}

/// Outcome of a lookup; a miss is a valid answer, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(Customer),
    NotFound,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            Lookup::Found(_) => "found",
            Lookup::NotFound => "not_found",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingDecision {
    pub routing_key: String,
    pub selector: Selector,
    pub timestamp: DateTime<Utc>,
}

impl RoutingDecision {
    pub fn new(key: &RoutingKey, selector: Selector) -> Self {
        Self {
            routing_key: key.as_str().to_string(),
            selector,
            timestamp: Utc::now(),
        }
    }
}
