//! Sweep command - release expired resources once

use crate::cli::args::{OutputFormat, SweepArgs};
use crate::config::Config;
use crate::error::{PinkeepError, PinkeepResult};
use crate::ledger::ResourceKey;
use crate::reaper::SweepReport;
use crate::service::PinKeeper;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the sweep command
///
/// Fails with `SweepIncomplete` when any key could not be processed, so
/// cron/systemd see a non-zero exit.
pub async fn execute(args: SweepArgs, config: &Config) -> PinkeepResult<()> {
    let ctx = UiContext::detect();
    let keeper = PinKeeper::from_config(config).await?;

    if args.dry_run {
        let planned = keeper.plan_sweep().await?;
        return print_plan(&ctx, &planned, args.format);
    }

    let mut spinner = TaskSpinner::new(&ctx);
    let show_progress = matches!(args.format, OutputFormat::Table);
    if show_progress {
        spinner.start("Sweeping expired resources...");
    }

    let report = match keeper.sweep_expired_resources().await {
        Ok(report) => report,
        Err(e) => {
            if show_progress {
                spinner.stop_error("Sweep failed");
            }
            return Err(e);
        }
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => {
            for key in &report.reaped {
                println!("{}", key);
            }
        }
        OutputFormat::Table => print_report(&ctx, &mut spinner, &report),
    }

    if report.is_clean() {
        Ok(())
    } else {
        Err(PinkeepError::SweepIncomplete {
            failed: report.failure_count(),
        })
    }
}

fn print_report(ctx: &UiContext, spinner: &mut TaskSpinner, report: &SweepReport) {
    let summary = format!(
        "Released {} of {} entries",
        report.reaped.len(),
        report.examined
    );
    if report.is_clean() {
        spinner.stop(&summary);
    } else {
        spinner.stop_warn(&summary);
    }

    for key in &report.reaped {
        ui::step_ok_detail(ctx, "Unpinned", key.as_str());
    }
    for key in &report.retained_for_namespace {
        ui::step_info(
            ctx,
            &format!("{} expired but is a namespace's current resource; kept pinned", key),
        );
    }
    if report.skipped_refreshed > 0 {
        ui::step_info(
            ctx,
            &format!("{} resource(s) were accessed during the sweep", report.skipped_refreshed),
        );
    }
    for failure in &report.failures {
        ui::step_error_detail(ctx, &failure.key, &failure.error);
    }
    if !report.is_clean() {
        ui::step_warn_hint(
            ctx,
            &format!("{} key(s) failed", report.failure_count()),
            "They stay in the ledger and are retried on the next sweep",
        );
    }
}

fn print_plan(ctx: &UiContext, planned: &[ResourceKey], format: OutputFormat) -> PinkeepResult<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(planned)?),
        OutputFormat::Plain => {
            for key in planned {
                println!("{}", key);
            }
        }
        OutputFormat::Table => {
            if planned.is_empty() {
                ui::step_info(ctx, "Nothing has expired");
            } else {
                for key in planned {
                    ui::step_info(ctx, &format!("Would unpin {}", key));
                }
                ui::remark(ctx, &format!("{} resource(s) expired (dry run)", planned.len()));
            }
        }
    }
    Ok(())
}
