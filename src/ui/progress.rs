//! Spinner with CI fallback

use super::context::UiContext;
use console::style;

/// Spinner shown while a long call (sweep, pin) is in flight
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    pub fn stop(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.stop(message),
            None => println!("{} {}", style("[OK]").green(), message),
        }
    }

    pub fn stop_warn(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.stop(style(message).yellow()),
            None => println!("{} {}", style("[WARN]").yellow(), message),
        }
    }

    pub fn stop_error(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.error(message),
            None => println!("{} {}", style("[FAIL]").red(), message),
        }
    }
}
