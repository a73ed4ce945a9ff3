//! Serve command - track a request feed and reap on a timer

use crate::cli::args::ServeArgs;
use crate::config::{Config, ConfigManager};
use crate::error::{PinkeepError, PinkeepResult};
use crate::intercept::LineFeedHost;
use crate::service::PinKeeper;
use crate::ui::{self, UiContext};
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::watch;
use tracing::info;

/// Execute the serve command
///
/// Request URLs are read from stdin, one per line (a gateway access log
/// works). The reaper keeps running after stdin closes; Ctrl-C stops both.
pub async fn execute(args: ServeArgs, config: &Config) -> PinkeepResult<()> {
    let ctx = UiContext::detect();
    let keeper = PinKeeper::from_config(config).await?;

    let host = LineFeedHost::new();
    keeper.install_interception_hook(&host)?;

    let interval = Duration::from_secs(
        args.interval
            .unwrap_or(config.cache.sweep_interval_secs)
            .max(1),
    );
    let sweep_on_start = config.cache.sweep_on_start && !args.no_initial_sweep;

    ui::intro(&ctx, "pinkeep");
    ui::step_ok_detail(
        &ctx,
        "Ledger opened",
        &ConfigManager::ledger_path(config).display().to_string(),
    );
    ui::step_info(
        &ctx,
        &format!("Tracking requests matching {}", keeper.url_pattern()),
    );
    ui::step_info(
        &ctx,
        &format!("Reaping every {}s", interval.as_secs()),
    );
    ui::remark(&ctx, "Reading request URLs from stdin, Ctrl-C to stop");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper = {
        let keeper = keeper.clone();
        tokio::spawn(async move {
            keeper
                .run_reaper(interval, sweep_on_start, shutdown_rx)
                .await
        })
    };

    let feed = async {
        let matched = host.run(BufReader::new(tokio::io::stdin())).await?;
        info!("Request feed closed after {} matching request(s)", matched);
        std::future::pending::<PinkeepResult<()>>().await
    };

    tokio::select! {
        result = feed => result?,
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|e| PinkeepError::io("waiting for Ctrl-C", e))?;
            info!("Shutdown requested");
        }
    }

    let _ = shutdown_tx.send(true);
    reaper
        .await
        .map_err(|e| PinkeepError::Internal(format!("reaper task failed: {}", e)))?;

    ui::outro_success(&ctx, "Stopped");
    Ok(())
}
