use thiserror::Error;

use unify_backend::BackendError;

/// Top-level runtime failure of a [`crate::LoopDriver::run`] call (spec §7).
#[derive(Debug, Error)]
pub enum UnifyError {
    #[error("backend error after {iterations_completed} loop iteration(s): {source}")]
    Backend {
        iterations_completed: u32,
        #[source]
        source: BackendError,
    },

    /// The caller declined to continue after a `BackendError`
    /// (`ErrorPolicy::StopOnError`), spec §7 `Abort`.
    #[error("aborted after a backend error on stage '{stage}': {source}")]
    Abort {
        stage: String,
        #[source]
        source: BackendError,
    },
}
