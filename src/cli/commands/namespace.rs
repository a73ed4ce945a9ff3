//! Namespace command - advance or inspect a namespace's pinned resource

use crate::cli::args::{NamespaceAction, NamespaceArgs, NamespaceSelector};
use crate::config::Config;
use crate::error::PinkeepResult;
use crate::ledger::{NamespaceKey, ResourceKey};
use crate::namespace::NamespaceUpdate;
use crate::service::PinKeeper;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the namespace command
pub async fn execute(args: NamespaceArgs, config: &Config) -> PinkeepResult<()> {
    let ctx = UiContext::detect();
    let keeper = PinKeeper::from_config(config).await?;

    match args.action {
        NamespaceAction::Set { hash, selector } => {
            let namespace = resolve(&keeper, &selector)?;
            let key = ResourceKey::parse(&hash)?;
            set(&ctx, &keeper, &namespace, &key).await
        }
        NamespaceAction::Show { selector } => {
            let namespace = resolve(&keeper, &selector)?;
            match keeper.current_namespace_resource(&namespace).await? {
                Some(key) => ui::key_value(&ctx, namespace.as_str(), key.as_str()),
                None => ui::step_info(&ctx, &format!("Nothing pinned for {}", namespace)),
            }
            Ok(())
        }
    }
}

fn resolve(keeper: &PinKeeper, selector: &NamespaceSelector) -> PinkeepResult<NamespaceKey> {
    keeper.namespace_key(&selector.network, selector.app.as_deref())
}

async fn set(
    ctx: &UiContext,
    keeper: &PinKeeper,
    namespace: &NamespaceKey,
    key: &ResourceKey,
) -> PinkeepResult<()> {
    let mut spinner = TaskSpinner::new(ctx);
    spinner.start(&format!("Pinning {} for {}...", key, namespace));

    let update = match keeper.pin_namespace_resource(namespace, key).await {
        Ok(update) => update,
        Err(e) => {
            spinner.stop_error("Namespace unchanged");
            return Err(e);
        }
    };

    match update {
        NamespaceUpdate::Unchanged => {
            spinner.stop(&format!("{} already points at {}", namespace, key));
        }
        NamespaceUpdate::Advanced { previous: None, .. } => {
            spinner.stop(&format!("{} now points at {}", namespace, key));
        }
        NamespaceUpdate::Advanced {
            previous: Some(previous),
            released,
        } => {
            spinner.stop(&format!("{} now points at {}", namespace, key));
            if released {
                ui::step_ok_detail(ctx, "Released previous resource", previous.as_str());
            } else {
                ui::step_warn_hint(
                    ctx,
                    &format!("Previous resource {} is still pinned", previous),
                    "It is access-tracked or its unpin failed; see the audit log",
                );
            }
        }
    }
    Ok(())
}
