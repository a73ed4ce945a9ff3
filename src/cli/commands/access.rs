//! Access command - record one access by hand

use crate::cli::args::AccessArgs;
use crate::config::Config;
use crate::error::{PinkeepError, PinkeepResult};
use crate::intercept::resource_key_from_url;
use crate::ledger::ResourceKey;
use crate::service::PinKeeper;
use crate::ui::{self, UiContext};

/// Execute the access command
pub async fn execute(args: AccessArgs, config: &Config) -> PinkeepResult<()> {
    let ctx = UiContext::detect();
    let key = resolve_target(&args.target)?;
    let keeper = PinKeeper::from_config(config).await?;

    let outcome = keeper.record_access(&key).await?;
    let expires = outcome.expires_at.to_rfc3339();

    if outcome.first_sight {
        ui::step_ok_detail(&ctx, &format!("Pinned {}", key), &format!("expires {}", expires));
    } else {
        ui::step_ok_detail(&ctx, &format!("Refreshed {}", key), &format!("expires {}", expires));
    }
    Ok(())
}

/// Resource key from a gateway URL or a bare hash
fn resolve_target(target: &str) -> PinkeepResult<ResourceKey> {
    if target.contains("://") {
        resource_key_from_url(target)
            .ok_or_else(|| PinkeepError::User(format!("No IPFS resource in URL: {}", target)))
    } else {
        ResourceKey::parse(target)
    }
}
