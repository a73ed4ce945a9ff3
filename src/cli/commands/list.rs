//! List command - show ledger entries

use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::{Config, ConfigManager};
use crate::error::PinkeepResult;
use crate::ledger::{FileLedger, LedgerEntry, LedgerStore};
use crate::ui::{self, UiContext};
use chrono::{DateTime, Utc};
use console::style;

/// Execute the list command
///
/// Reads the ledger file directly; the IPFS daemon is not contacted.
pub async fn execute(args: ListArgs, config: &Config) -> PinkeepResult<()> {
    let ledger = FileLedger::open(ConfigManager::ledger_path(config)).await?;
    let now = Utc::now();

    let mut entries = Vec::new();
    for key in ledger.keys().await? {
        if let Some(entry) = ledger.get(&key).await? {
            if !args.expired || entry.is_expired_at(now) {
                entries.push(entry);
            }
        }
    }

    if entries.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "Ledger is empty");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&entries, now),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.key());
            }
        }
    }

    Ok(())
}

fn print_table(entries: &[LedgerEntry], now: DateTime<Utc>) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Ledger");

    println!(
        "{:<50} {:<10} {:<50}",
        style("KEY").bold(),
        style("KIND").bold(),
        style("DETAIL").bold()
    );
    println!("{}", "-".repeat(110));

    for entry in entries {
        match entry {
            LedgerEntry::ExpiringResource { key, expires_at } => {
                let expires = expires_at.format("%Y-%m-%d %H:%M").to_string();
                let detail = if entry.is_expired_at(now) {
                    style(format!("expired {}", expires)).red()
                } else {
                    style(format!("expires {}", expires)).green()
                };
                println!("{:<50} {:<10} {:<50}", key.as_str(), "resource", detail);
            }
            LedgerEntry::NamespacePin { key, pinned_hash } => {
                println!(
                    "{:<50} {:<10} {:<50}",
                    key.as_str(),
                    "namespace",
                    style(pinned_hash.as_str()).cyan()
                );
            }
        }
    }

    println!();
    println!("{} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
}
