use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read config '{path}': {source}")]
    ReadConfig { path: String, #[source] source: std::io::Error },

    #[error(transparent)]
    Config(#[from] unify_config::ConfigError),

    #[error(transparent)]
    Render(#[from] unify_dialect::RenderError),

    #[error("failed to write stage file '{path}': {source}")]
    WriteStage { path: String, #[source] source: std::io::Error },

    #[error("failed to read stage directory '{path}': {source}")]
    ReadStageDir { path: String, #[source] source: std::io::Error },

    #[error("stage directory '{0}' is missing its _plan.json manifest (was it produced by `unify compile`?)")]
    MissingManifest(String),

    #[error("malformed plan manifest: {0}")]
    MalformedManifest(#[from] serde_json::Error),

    #[error("no warehouse DSN given: pass --dsn or set UNIFY_BACKEND_DSN")]
    MissingDsn,

    #[error("postgres backend support was not compiled in (build with --features postgres)")]
    PostgresNotCompiledIn,

    #[error(transparent)]
    Connect(#[from] unify_backend::ConnectError),

    #[error(transparent)]
    Unify(#[from] unify_loop::UnifyError),
}
