//! CLI / orchestration (spec C6, C7): argument parsing, credential
//! acquisition, invocation of the plan compiler and loop driver.

pub mod commands;
mod error;
mod logger;
mod renderer;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser as _;

use commands::{Cli, Commands, CompileArgs, OnError, RunArgs};
pub use error::CliError;
use unify_backend::{Backend, MockBackend};
use unify_config::Config;
use unify_loop::{ErrorPolicy, LoopDriver, LoopOptions};

const DSN_ENV_VAR: &str = "UNIFY_BACKEND_DSN";

/// Entry point shared by `main.rs` and integration tests; returns the
/// process exit code (0 success, 1 error), mirroring
/// `sqruff_cli_lib::run_with_args`.
pub fn run_with_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let _ = logger::init();
    let cli = Cli::parse_from(args);

    let result = match cli.command {
        Commands::Compile(args) => run_compile(args),
        Commands::Run(args) => run_run(args),
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{e}");
            1
        }
    }
}

fn run_compile(args: CompileArgs) -> Result<(), CliError> {
    let text = fs::read_to_string(&args.config)
        .map_err(|source| CliError::ReadConfig { path: args.config.display().to_string(), source })?;
    let config = Config::parse(&text)?;
    let compiled = config.compile()?;

    let dialect = unify_dialect::resolve(args.dialect.as_str())?;
    let dialect: Arc<dyn unify_dialect::DialectOps> = Arc::from(dialect);

    let src_catalog = args.src_catalog.as_deref().unwrap_or(&args.target_catalog);
    let src_schema = args.src_schema.as_deref().unwrap_or(&args.target_schema);

    let plan = unify_plan::compile(&compiled, dialect, &args.target_catalog, &args.target_schema, src_catalog, src_schema);

    log::info!(
        "compiled {} stages ({} loop iterations) for canonical id '{}'",
        plan.stages.len(),
        plan.compiled_iterations,
        plan.canonical_id_name,
    );

    renderer::write_plan(&plan, &args.outdir, args.dialect.as_str())?;
    log::info!("wrote stage files to {}", args.outdir.display());
    Ok(())
}

fn run_run(args: RunArgs) -> Result<(), CliError> {
    let plan = renderer::load_plan(&args.stage_dir)?;

    let opts = LoopOptions {
        max_iterations: args.max_iterations.unwrap_or(30),
        sleep_between: if args.dry_run { Duration::ZERO } else { Duration::from_secs(2) },
        on_error: match args.on_error {
            OnError::Stop => ErrorPolicy::StopOnError,
            OnError::Continue => ErrorPolicy::Continue,
        },
    };

    if args.dry_run {
        log::info!("dry run: {} stages, {} compiled loop iterations, skip_loop={}", plan.stages.len(), plan.compiled_iterations, args.skip_loop);
        for stage in plan.ordered_stages() {
            println!("-- {}", stage.file_name());
        }
        return Ok(());
    }

    if args.skip_loop {
        let mut backend = resolve_backend(&args)?;
        for stage in plan.ordered_stages() {
            if stage.file_stem.starts_with("04_") {
                continue;
            }
            backend.execute(&stage.sql).map_err(|source| {
                CliError::Unify(unify_loop::UnifyError::Abort { stage: stage.file_stem.clone(), source })
            })?;
        }
        backend.close();
        return Ok(());
    }

    let mut backend = resolve_backend(&args)?;
    let outcome = LoopDriver::run(backend.as_mut(), &plan, &opts)?;
    log::info!("loop finished: {outcome:?}");
    backend.close();
    Ok(())
}

fn resolve_backend(args: &RunArgs) -> Result<Box<dyn Backend>, CliError> {
    let dsn = args.dsn.clone().or_else(|| std::env::var(DSN_ENV_VAR).ok());

    #[cfg(feature = "postgres")]
    {
        if args.mock {
            log::warn!("--mock requested; driving the in-memory mock backend instead of postgres");
            return Ok(Box::new(MockBackend::new()));
        }
        let dsn = dsn.ok_or(CliError::MissingDsn)?;
        return Ok(Box::new(unify_backend::PostgresBackend::connect(&dsn)?));
    }

    #[cfg(not(feature = "postgres"))]
    {
        if !args.mock {
            return Err(CliError::PostgresNotCompiledIn);
        }
        let _ = dsn;
        log::warn!("--mock requested and no postgres backend compiled in; using in-memory mock backend");
        Ok(Box::new(MockBackend::new()))
    }
}
