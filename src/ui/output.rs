//! Step and summary lines with a plain-text fallback

use super::context::UiContext;
use console::style;

/// Title line for a command's output
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        cliclack::intro(style(title).cyan().bold()).ok();
    } else {
        println!("{}", style(title).cyan().bold());
    }
}

pub fn outro_success(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::outro(style(message).green().bold()).ok();
    } else {
        println!("{} {}", style("[OK]").green(), message);
    }
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::success(message).ok();
    } else {
        println!("  {} {}", style("[OK]").green(), message);
    }
}

/// Success line with a dimmed detail, e.g. a key or a path
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::success(format!("{} ({})", message, style(detail).dim())).ok();
    } else {
        println!("  {} {} ({})", style("[OK]").green(), message, detail);
    }
}

pub fn step_warn(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::warning(message).ok();
    } else {
        println!("  {} {}", style("[WARN]").yellow(), message);
    }
}

/// Warning with a hint on what happens next
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::warning(format!("{} - {}", message, style(hint).dim())).ok();
    } else {
        println!("  {} {} - {}", style("[WARN]").yellow(), message, hint);
    }
}

pub fn step_error_detail(ctx: &UiContext, message: &str, detail: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::error(format!("{}: {}", message, style(detail).red())).ok();
    } else {
        println!("  {} {}: {}", style("[FAIL]").red(), message, detail);
    }
}

pub fn step_info(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::info(message).ok();
    } else {
        println!("  {} {}", style("[INFO]").cyan(), message);
    }
}

pub fn remark(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::remark(message).ok();
    } else {
        println!("  {}", style(message).dim());
    }
}

pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_output_does_not_panic() {
        let ctx = UiContext::non_interactive();
        intro(&ctx, "Sweep");
        step_ok_detail(&ctx, "Released", "QmA");
        step_warn_hint(&ctx, "1 key failed", "retried next sweep");
        step_error_detail(&ctx, "Unpin failed", "QmB");
        key_value(&ctx, "expires", "2024-01-01T00:00:00Z");
        outro_success(&ctx, "Done");
    }
}
