use crate::config::toml_config::RouterConfig;
use crate::utils::error::Result;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "strangler-router")]
#[command(about = "Routes customer lookups between legacy and modern backends")]
pub struct CliConfig {
    /// Path to TOML configuration file (built-in demo routing when omitted)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override server.bind_address
    #[arg(long)]
    pub bind: Option<String>,

    /// Override server.backend_timeout_ms
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub check: bool,
}

impl CliConfig {
    /// 載入設定檔並套用命令列覆蓋
    pub fn load(&self) -> Result<RouterConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                RouterConfig::from_file(path)?
            }
            None => {
                tracing::info!("📁 No config file given, using built-in demo routing");
                RouterConfig::default()
            }
        };

        if let Some(bind) = &self.bind {
            config.server.bind_address = bind.clone();
            tracing::info!("🔧 Bind address overridden to: {}", bind);
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.server.backend_timeout_ms = Some(timeout_ms);
            tracing::info!("🔧 Backend timeout overridden to: {}ms", timeout_ms);
        }

        Ok(config)
    }
}
