//! Console output for the pinkeep commands
//!
//! Uses `cliclack` for styled step/spinner output in a terminal and falls
//! back to plain tagged lines (`[OK]`, `[WARN]`, ...) when stdout is piped
//! or a CI environment is detected.
//!
//! ```rust,ignore
//! use pinkeep::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Sweeping expired resources...");
//! spinner.stop("Released 3 resource(s)");
//! ui::step_warn_hint(&ctx, "1 key failed", "It will be retried on the next sweep");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_success, remark, step_error_detail, step_info, step_ok, step_ok_detail,
    step_warn, step_warn_hint,
};
pub use progress::TaskSpinner;
