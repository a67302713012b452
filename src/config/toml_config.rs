use crate::domain::model::Selector;
use crate::utils::error::{Result, RouterError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    pub routing: PolicyConfig,
    pub backends: BTreeMap<String, BackendConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    pub backend_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    /// 是否在回應中包含 `source` 欄位（預設隱藏）
    #[serde(default)]
    pub expose_source: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyConfig {
    Prefix {
        default: Selector,
        #[serde(default)]
        rules: Vec<PrefixRule>,
    },
    AllowList {
        ids: Vec<String>,
        target: Selector,
        fallback: Selector,
    },
    Percentage {
        percent: u8,
        target: Selector,
        fallback: Selector,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixRule {
    pub prefix: String,
    pub selector: Selector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    Synthesized {
        display_name: String,
    },
    Fixture {
        #[serde(default)]
        customers: Vec<FixtureCustomer>,
    },
    Http {
        endpoint: String,
        timeout_ms: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureCustomer {
    pub id: String,
    pub name: Option<String>,
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            backend_timeout_ms: None,
        }
    }
}

impl Default for RouterConfig {
    /// 內建示範設定：`MODERN_` 開頭走新系統，其餘留在舊系統
    fn default() -> Self {
        let mut backends = BTreeMap::new();
        backends.insert(
            Selector::LEGACY.to_string(),
            BackendConfig::Synthesized {
                display_name: "Legacy Customer".to_string(),
            },
        );
        backends.insert(
            Selector::MODERN.to_string(),
            BackendConfig::Synthesized {
                display_name: "Modern Customer".to_string(),
            },
        );

        Self {
            server: ServerConfig::default(),
            api: ApiConfig::default(),
            routing: PolicyConfig::Prefix {
                default: Selector::legacy(),
                rules: vec![PrefixRule {
                    prefix: "MODERN_".to_string(),
                    selector: Selector::modern(),
                }],
            },
            backends,
        }
    }
}

impl PolicyConfig {
    /// Every selector this policy can produce.
    pub fn selectors(&self) -> Vec<Selector> {
        let mut selectors = match self {
            PolicyConfig::Prefix { default, rules } => {
                let mut all: Vec<Selector> = rules.iter().map(|r| r.selector.clone()).collect();
                all.push(default.clone());
                all
            }
            PolicyConfig::AllowList {
                target, fallback, ..
            }
            | PolicyConfig::Percentage {
                target, fallback, ..
            } => vec![target.clone(), fallback.clone()],
        };
        selectors.sort();
        selectors.dedup();
        selectors
    }
}

impl RouterConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(RouterError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RouterError::ConfigParseError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MODERN_ENDPOINT})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RouterError::ConfigParseError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn bind_address(&self) -> Result<SocketAddr> {
        validation::validate_socket_addr("server.bind_address", &self.server.bind_address)
    }

    pub fn backend_timeout(&self) -> Option<Duration> {
        self.server.backend_timeout_ms.map(Duration::from_millis)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        self.bind_address()?;

        if let Some(timeout) = self.server.backend_timeout_ms {
            validation::validate_positive_number("server.backend_timeout_ms", timeout, 1)?;
        }

        if self.backends.is_empty() {
            return Err(RouterError::MissingConfigError {
                field: "backends".to_string(),
            });
        }

        for (name, backend) in &self.backends {
            validation::validate_non_empty_string("backends", name)?;
            Self::validate_backend(name, backend)?;
        }

        self.validate_policy()?;

        // 策略可能選到的每個後端都必須已設定
        let missing: Vec<String> = self
            .routing
            .selectors()
            .into_iter()
            .filter(|selector| !self.backends.contains_key(selector.as_str()))
            .map(|selector| selector.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(RouterError::configuration(format!(
                "routing can select backend(s) with no [backends] entry: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }

    fn validate_policy(&self) -> Result<()> {
        for selector in self.routing.selectors() {
            validation::validate_non_empty_string("routing.selector", selector.as_str())?;
        }
        match &self.routing {
            PolicyConfig::Prefix { rules, .. } => {
                for rule in rules {
                    validation::validate_non_empty_string("routing.rules.prefix", &rule.prefix)?;
                }
            }
            PolicyConfig::AllowList { ids, .. } => {
                for id in ids {
                    validation::validate_non_empty_string("routing.ids", id)?;
                }
            }
            PolicyConfig::Percentage { percent, .. } => {
                validation::validate_range("routing.percent", *percent, 0, 100)?;
            }
        }
        Ok(())
    }

    fn validate_backend(name: &str, backend: &BackendConfig) -> Result<()> {
        match backend {
            BackendConfig::Synthesized { display_name } => validation::validate_non_empty_string(
                &format!("backends.{}.display_name", name),
                display_name,
            ),
            BackendConfig::Fixture { customers } => {
                let mut seen = HashSet::new();
                for customer in customers {
                    let field = format!("backends.{}.customers.id", name);
                    validation::validate_non_empty_string(&field, &customer.id)?;
                    if !seen.insert(customer.id.as_str()) {
                        return Err(RouterError::InvalidConfigValueError {
                            field,
                            value: customer.id.clone(),
                            reason: "Duplicate customer id".to_string(),
                        });
                    }
                }
                Ok(())
            }
            BackendConfig::Http {
                endpoint,
                timeout_ms,
            } => {
                validation::validate_url(&format!("backends.{}.endpoint", name), endpoint)?;
                if let Some(timeout) = timeout_ms {
                    validation::validate_positive_number(
                        &format!("backends.{}.timeout_ms", name),
                        *timeout,
                        1,
                    )?;
                }
                Ok(())
            }
        }
    }
}

impl Validate for RouterConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
