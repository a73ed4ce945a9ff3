//! Config command - show or edit configuration

use crate::access::expiration_window;
use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{PinkeepError, PinkeepResult};
use crate::intercept::UrlPattern;
use crate::ui::{self, UiContext};
use std::path::PathBuf;

const VALID_KEYS: &[&str] = &[
    "general.log_format",
    "general.audit_log",
    "cache.expiration_window_days",
    "cache.sweep_interval_secs",
    "cache.sweep_on_start",
    "intercept.url_pattern",
    "ipfs.api_url",
    "ipfs.timeout_secs",
    "ledger.path",
    "namespace.default_app",
];

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    manager: &ConfigManager,
    config: &Config,
) -> PinkeepResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, config, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> PinkeepResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> PinkeepResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());

    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> PinkeepResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();

    if let Err(e) = apply_setting(&mut config, key, value) {
        if !VALID_KEYS.contains(&key) {
            ui::step_error_detail(&ctx, "Unknown config key", key);
            ui::remark(&ctx, &format!("Valid keys: {}", VALID_KEYS.join(", ")));
        }
        return Err(e);
    }

    manager.save(&config).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));

    Ok(())
}

/// Apply one dot-separated `key = value` to `config`
fn apply_setting(config: &mut Config, key: &str, value: &str) -> PinkeepResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => match value {
            "text" | "json" => config.general.log_format = value.to_string(),
            _ => {
                return Err(PinkeepError::User(format!(
                    "Invalid log format: {}. Use text or json",
                    value
                )))
            }
        },
        ["general", "audit_log"] => config.general.audit_log = parse_bool(value)?,

        ["cache", "expiration_window_days"] => {
            let days = parse_number::<u32>(value)?;
            expiration_window(days)?;
            config.cache.expiration_window_days = days;
        }
        ["cache", "sweep_interval_secs"] => {
            config.cache.sweep_interval_secs = parse_number(value)?
        }
        ["cache", "sweep_on_start"] => config.cache.sweep_on_start = parse_bool(value)?,

        ["intercept", "url_pattern"] => {
            UrlPattern::parse(value)?;
            config.intercept.url_pattern = value.to_string();
        }

        ["ipfs", "api_url"] => config.ipfs.api_url = value.trim_end_matches('/').to_string(),
        ["ipfs", "timeout_secs"] => config.ipfs.timeout_secs = parse_number(value)?,

        ["ledger", "path"] => {
            config.ledger.path = if value.is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            }
        }

        ["namespace", "default_app"] => config.namespace.default_app = value.to_string(),

        _ => return Err(PinkeepError::User(format!("Unknown config key: {}", key))),
    }

    Ok(())
}

fn parse_bool(value: &str) -> PinkeepResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(PinkeepError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> PinkeepResult<T> {
    value
        .parse()
        .map_err(|_| PinkeepError::User(format!("Invalid number: {}", value)))
}
