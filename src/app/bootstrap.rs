use crate::adapters::{FixtureProvider, HttpProvider, SynthesizingProvider};
use crate::api::{self, AppState};
use crate::config::toml_config::{BackendConfig, RouterConfig};
use crate::core::observer::{FanoutObserver, InMemoryObserver, TracingObserver};
use crate::core::policy;
use crate::core::registry::ProviderRegistry;
use crate::core::router::StranglerRouter;
use crate::domain::model::{Customer, Selector};
use crate::domain::ports::{CustomerProvider, MigrationObserver};
use crate::utils::error::{Result, RouterError};
use crate::utils::validation::Validate;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// A fully wired router, ready to serve.
pub struct Application {
    config: RouterConfig,
    router: Arc<StranglerRouter>,
    progress: Arc<InMemoryObserver>,
}

impl Application {
    /// 驗證設定並建立所有後端；任何未註冊的 selector 在此即失敗
    pub fn from_config(config: RouterConfig) -> Result<Self> {
        config.validate()?;

        let mut registry = ProviderRegistry::new();
        for (name, backend) in &config.backends {
            let selector = Selector::new(name.clone());
            registry.register(selector.clone(), build_provider(selector, backend)?)?;
        }

        let progress = Arc::new(InMemoryObserver::with_selectors(registry.selectors()));
        let observers: Vec<Arc<dyn MigrationObserver>> =
            vec![progress.clone(), Arc::new(TracingObserver)];

        let mut router = StranglerRouter::new(
            policy::from_config(&config.routing)?,
            registry,
            Arc::new(FanoutObserver::new(observers)),
        )?;
        if let Some(timeout) = config.backend_timeout() {
            router = router.with_timeout(timeout);
        }

        Ok(Self {
            config,
            router: Arc::new(router),
            progress,
        })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn router(&self) -> Arc<StranglerRouter> {
        Arc::clone(&self.router)
    }

    pub fn progress(&self) -> Arc<InMemoryObserver> {
        Arc::clone(&self.progress)
    }

    pub fn http_app(&self) -> axum::Router {
        api::build_app(AppState {
            router: self.router(),
            progress: self.progress(),
            expose_source: self.config.api.expose_source,
        })
    }

    pub async fn serve(self) -> Result<()> {
        let addr = self.config.bind_address()?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("🚀 Listening on http://{}", addr);

        axum::serve(listener, self.http_app())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| RouterError::ServerError {
                message: e.to_string(),
            })?;

        let progress = self.progress.snapshot();
        tracing::info!(
            "📊 Final migration progress: {} requests {:?}",
            progress.total,
            progress.per_selector
        );
        Ok(())
    }
}

fn build_provider(selector: Selector, backend: &BackendConfig) -> Result<Arc<dyn CustomerProvider>> {
    let provider: Arc<dyn CustomerProvider> = match backend {
        BackendConfig::Synthesized { display_name } => {
            Arc::new(SynthesizingProvider::new(selector, display_name.clone()))
        }
        BackendConfig::Fixture { customers } => {
            let customers = customers
                .iter()
                .map(|c| Customer::new(c.id.clone(), c.name.clone(), selector.clone()))
                .collect();
            Arc::new(FixtureProvider::new(selector, customers))
        }
        BackendConfig::Http {
            endpoint,
            timeout_ms,
        } => Arc::new(HttpProvider::new(
            selector,
            endpoint,
            timeout_ms.map(Duration::from_millis),
        )?),
    };
    Ok(provider)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
