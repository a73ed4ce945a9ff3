//! Terminal vs. piped/CI detection

use std::io::IsTerminal;

/// Environment variables whose presence means we are running under CI
const CI_ENV_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "BUILDKITE",
    "JENKINS_URL",
    "TF_BUILD",
];

/// Decides whether output may use spinners and cliclack styling
#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    interactive: bool,
}

impl UiContext {
    /// Interactive when stdout is a terminal outside CI
    ///
    /// stdin is not consulted: `serve` reads a piped request feed while
    /// still writing to a terminal.
    pub fn detect() -> Self {
        Self {
            interactive: std::io::stdout().is_terminal() && !running_in_ci(),
        }
    }

    /// Plain output only (tests, explicit scripting)
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Whether spinners and cliclack log lines should be used
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}

fn running_in_ci() -> bool {
    CI_ENV_VARS.iter().any(|var| std::env::var_os(var).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_interactive_context() {
        let ctx = UiContext::non_interactive();
        assert!(!ctx.is_interactive());
        assert!(!ctx.use_fancy_output());
    }
}
