use thiserror::Error;

/// Classified backend failure (spec §7 `BackendError{NotFound|Syntax|Permission|Transient|Other}`).
///
/// Adapters own the classification: rather than call sites matching on
/// backend error substrings (spec §9's "error classification via
/// discriminated error values" redesign note), each adapter maps its
/// native error type into this enum once, here.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("catalog/schema/table not found: {0}")]
    NotFound(String),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("transient error, may succeed on retry: {0}")]
    Transient(String),

    #[error("backend error: {0}")]
    Other(String),
}

/// Fatal failure acquiring a session (spec §4.5 `connect`).
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to connect: {0}")]
    Failed(String),

    #[error("missing credentials: {0}")]
    MissingCredentials(String),
}
