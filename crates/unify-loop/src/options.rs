use std::time::Duration;

/// Policy applied when a statement fails (spec §7 `Abort`, §9 open
/// question): replaces the original's interactive "Continue with
/// remaining files? (y/n)" prompt with an explicit, non-interactive choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Abort the run immediately on the first backend error.
    #[default]
    StopOnError,
    /// Log the error and continue with the next stage.
    Continue,
}

/// Tuning knobs for [`crate::LoopDriver::run`] (SPEC_FULL §5.4).
#[derive(Debug, Clone)]
pub struct LoopOptions {
    /// `K_max`, spec §4.4: default 30.
    pub max_iterations: u32,
    /// Pause between iterations to avoid tight polling (spec §5). Zero in
    /// tests against `MockBackend`.
    pub sleep_between: Duration,
    pub on_error: ErrorPolicy,
}

impl Default for LoopOptions {
    fn default() -> Self {
        LoopOptions {
            max_iterations: 30,
            sleep_between: Duration::from_secs(2),
            on_error: ErrorPolicy::StopOnError,
        }
    }
}

impl LoopOptions {
    /// No inter-iteration sleep — the shape tests against `MockBackend`
    /// want, since there is no warehouse query engine to avoid polling.
    pub fn no_sleep() -> Self {
        LoopOptions { sleep_between: Duration::ZERO, ..Default::default() }
    }
}
