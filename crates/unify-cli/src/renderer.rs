//! The renderer (spec C6): writes a compiled [`Plan`] into a destination
//! directory as `NN_name.sql` files (teacher-grounded in `get_sql_files`'s
//! `^(\d+)_(.+)\.sql$` naming convention), plus a `_plan.json` sidecar
//! manifest so `unify run <stage-dir>` can reconstruct the loop template
//! (dialect, priorities, compiled iteration count) without re-reading the
//! original config.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use unify_plan::{LoopTemplate, Plan, Stage};

use crate::error::CliError;

const MANIFEST_FILE: &str = "_plan.json";

#[derive(Debug, Serialize, Deserialize)]
struct PlanManifest {
    canonical_id_name: String,
    dialect: String,
    target: String,
    priorities: Vec<u32>,
    compiled_iterations: u32,
}

/// Writes every stage to `outdir/<file_stem>.sql`, in sorted order, plus
/// the `_plan.json` manifest.
pub fn write_plan(plan: &Plan, outdir: &Path, dialect_name: &str) -> Result<(), CliError> {
    fs::create_dir_all(outdir).map_err(|source| CliError::WriteStage { path: outdir.display().to_string(), source })?;

    for stage in plan.ordered_stages() {
        let path = outdir.join(stage.file_name());
        fs::write(&path, &stage.sql).map_err(|source| CliError::WriteStage { path: path.display().to_string(), source })?;
    }

    let manifest = PlanManifest {
        canonical_id_name: plan.canonical_id_name.clone(),
        dialect: dialect_name.to_string(),
        target: plan.loop_template.target.clone(),
        priorities: plan.loop_template.priorities.clone(),
        compiled_iterations: plan.compiled_iterations,
    };
    let manifest_path = outdir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&manifest).expect("PlanManifest serializes infallibly");
    fs::write(&manifest_path, json).map_err(|source| CliError::WriteStage { path: manifest_path.display().to_string(), source })?;

    Ok(())
}

/// Reads a stage directory produced by [`write_plan`] back into a [`Plan`].
pub fn load_plan(stage_dir: &Path) -> Result<Plan, CliError> {
    let manifest_path = stage_dir.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Err(CliError::MissingManifest(stage_dir.display().to_string()));
    }
    let manifest_text = fs::read_to_string(&manifest_path)
        .map_err(|source| CliError::ReadStageDir { path: manifest_path.display().to_string(), source })?;
    let manifest: PlanManifest = serde_json::from_str(&manifest_text)?;

    let dialect = unify_dialect::resolve(&manifest.dialect)?;
    let dialect: Arc<dyn unify_dialect::DialectOps> = Arc::from(dialect);

    let mut stages = Vec::new();
    let entries = fs::read_dir(stage_dir).map_err(|source| CliError::ReadStageDir { path: stage_dir.display().to_string(), source })?;
    for entry in entries {
        let entry = entry.map_err(|source| CliError::ReadStageDir { path: stage_dir.display().to_string(), source })?;
        let path = entry.path();
        if path.file_name().and_then(|n| n.to_str()) == Some(MANIFEST_FILE) {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
        let sql = fs::read_to_string(&path).map_err(|source| CliError::ReadStageDir { path: path.display().to_string(), source })?;
        stages.push(Stage::new(stem, sql));
    }

    let loop_template = LoopTemplate {
        dialect,
        target: manifest.target,
        priorities: manifest.priorities,
    };

    Ok(Plan {
        stages,
        loop_template,
        compiled_iterations: manifest.compiled_iterations,
        canonical_id_name: manifest.canonical_id_name,
    })
}
