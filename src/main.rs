use clap::Parser;
use strangler_router::utils::error::{ErrorSeverity, RouterError};
use strangler_router::utils::logger;
use strangler_router::{Application, CliConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting strangler-router");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let app = match cli.load().and_then(Application::from_config) {
        Ok(app) => app,
        Err(e) => exit_with(e),
    };

    tracing::info!("✅ Configuration loaded and validated successfully");
    if cli.check {
        println!("✅ Configuration OK");
        println!("  Policy: {}", app.router().policy().name());
        println!("  Backends: {:?}", app.router().registry().selectors());
        println!("  Bind: {}", app.config().server.bind_address);
        match app.router().timeout() {
            Some(timeout) => println!("  Backend timeout: {:?}", timeout),
            None => println!("  Backend timeout: none"),
        }
        return Ok(());
    }

    if let Err(e) = app.serve().await {
        exit_with(e);
    }

    Ok(())
}

fn exit_with(e: RouterError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
