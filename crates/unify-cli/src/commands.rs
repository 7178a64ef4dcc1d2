use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Grounded in `sqruff-cli-lib::commands::Cli`/`Commands` (spec §6.2).
#[derive(Debug, Parser)]
#[command(name = "unify")]
#[command(about = "Compiles a declarative identity-unification config into warehouse SQL and runs it", long_about = None, version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Compile a config into an ordered directory of stage SQL files")]
    Compile(CompileArgs),
    #[command(about = "Execute a compiled stage directory against a warehouse")]
    Run(RunArgs),
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum DialectName {
    #[default]
    Snowflake,
    Databricks,
}

impl DialectName {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialectName::Snowflake => "snowflake",
            DialectName::Databricks => "databricks",
        }
    }
}

#[derive(Debug, Parser)]
pub struct CompileArgs {
    /// Path to the declarative unification config (YAML).
    pub config: PathBuf,
    #[arg(long = "target-catalog")]
    pub target_catalog: String,
    #[arg(long = "target-schema")]
    pub target_schema: String,
    /// Defaults to `--target-catalog` when omitted (spec §6.2).
    #[arg(long = "src-catalog")]
    pub src_catalog: Option<String>,
    /// Defaults to `--target-schema` when omitted.
    #[arg(long = "src-schema")]
    pub src_schema: Option<String>,
    #[arg(long, default_value = "stages")]
    pub outdir: PathBuf,
    #[arg(long, value_enum, default_value_t = DialectName::Snowflake)]
    pub dialect: DialectName,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OnError {
    #[default]
    Stop,
    Continue,
}

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Directory of `NN_name.sql` stage files produced by `compile`.
    #[arg(value_name = "STAGE_DIR")]
    pub stage_dir: PathBuf,
    /// Warehouse connection string; falls back to `UNIFY_BACKEND_DSN`
    /// (spec §6.2), mirroring the original's `SNOWFLAKE_PASSWORD` env var.
    #[arg(long)]
    pub dsn: Option<String>,
    /// Print the plan and exit without touching the warehouse.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
    /// Skip driving the unification loop (stages before `04` and after
    /// `06` still run); useful for re-running enrichment/master stages
    /// against an already-converged graph.
    #[arg(long, default_value_t = false)]
    pub skip_loop: bool,
    #[arg(long = "max-iterations")]
    pub max_iterations: Option<u32>,
    #[arg(long = "on-error", value_enum, default_value_t = OnError::Stop)]
    pub on_error: OnError,
    /// Drive the in-memory mock backend instead of a warehouse; for local
    /// smoke-testing a compiled plan without either a DSN or the `postgres`
    /// feature.
    #[arg(long, default_value_t = false)]
    pub mock: bool,
}
