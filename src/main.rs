//! books-etl entry point
//!
//! Usage:
//!   books-etl                run on the configured schedule until Ctrl-C
//!   books-etl --once         one run (with retries), then exit
//!   books-etl --init-config  write the default config file and exit

use anyhow::{Result, bail};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use books_etl::App;
use books_etl::application::RunFailure;
use books_etl::infrastructure::{AppConfig, ConfigManager, init_logging_with_config, logging};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Schedule,
    Once,
    InitConfig,
}

fn parse_mode() -> Result<Mode> {
    let mut mode = Mode::Schedule;
    for arg in std::env::args().skip(1) {
        mode = match arg.as_str() {
            "--once" => Mode::Once,
            "--init-config" => Mode::InitConfig,
            other => bail!("Unknown argument: {other} (expected --once or --init-config)"),
        };
    }
    Ok(mode)
}

#[tokio::main]
async fn main() -> Result<()> {
    let mode = parse_mode()?;
    let manager = ConfigManager::new()?;

    if mode == Mode::InitConfig {
        manager.save_config(&AppConfig::default()).await?;
        println!("Wrote default configuration to {}", manager.config_path().display());
        return Ok(());
    }

    let config = manager.load_config()?;
    init_logging_with_config(&config.logging)?;
    logging::log_system_info();

    let app = App::build(config).await?;
    let scheduler = app.scheduler()?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            on_signal.cancel();
        }
    });

    let result = if mode == Mode::Once {
        match scheduler.run_once(&cancel).await {
            Ok(report) => {
                info!("Run report: {}", serde_json::to_string(&report)?);
                Ok(())
            }
            Err(e) => {
                if let Some(failure) = e.downcast_ref::<RunFailure>() {
                    error!("Run report: {}", serde_json::to_string(&failure.report)?);
                }
                Err(e)
            }
        }
    } else {
        let summary = scheduler.run_forever(cancel.clone()).await;
        info!("Shutdown complete: {} runs, {} failed", summary.runs, summary.failures);
        Ok(())
    };

    app.database.close().await;
    result
}
