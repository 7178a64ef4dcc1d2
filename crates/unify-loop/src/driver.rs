use unify_backend::Backend;
use unify_plan::{naming, Plan};

use crate::error::UnifyError;
use crate::options::{ErrorPolicy, LoopOptions};
use crate::outcome::LoopOutcome;

/// Executes a compiled [`Plan`] (spec C4): runs the pre-loop stages
/// (`01`-`03`) in order, drives stage `04` to convergence (or `K_max`
/// exhaustion), aliases the converged graph, then runs the remaining
/// stages (`05`+) in order.
pub struct LoopDriver;

impl LoopDriver {
    pub fn run(backend: &mut dyn Backend, plan: &Plan, opts: &LoopOptions) -> Result<LoopOutcome, UnifyError> {
        let prefix = &plan.canonical_id_name;
        let mut loop_outcome = None;

        for stage in plan.ordered_stages() {
            if stage.file_stem.starts_with("04_") {
                if loop_outcome.is_some() {
                    continue; // already driven to convergence below
                }
                loop_outcome = Some(Self::run_loop(backend, plan, prefix, opts)?);
                let final_table = naming::graph_final(prefix);
                let converged_table = naming::graph_iter(prefix, loop_outcome.unwrap().iterations());
                let alias_sql = format!("CREATE OR REPLACE TABLE {final_table} AS SELECT * FROM {converged_table}");
                Self::execute_with_policy(backend, "alias_graph_unify_loop_final", &alias_sql, opts)?;
                continue;
            }

            Self::execute_with_policy(backend, &stage.file_stem, &stage.sql, opts)?;
        }

        loop_outcome.ok_or_else(|| UnifyError::Abort {
            stage: "04_unify_loop".to_string(),
            source: unify_backend::BackendError::Other("plan contains no loop stage".to_string()),
        })
    }

    fn run_loop(backend: &mut dyn Backend, plan: &Plan, prefix: &str, opts: &LoopOptions) -> Result<LoopOutcome, UnifyError> {
        // Stage 02 already seeded G_0; iterate 1..=max_iterations.
        for k in 1..=opts.max_iterations {
            let stage = plan
                .stages
                .iter()
                .find(|s| s.file_stem == format!("04_unify_loop_iteration_{k:02}"))
                .cloned()
                .unwrap_or_else(|| plan.loop_template.render(prefix, k));

            if let Err(source) = backend.execute(&stage.sql) {
                return match opts.on_error {
                    ErrorPolicy::StopOnError => Err(UnifyError::Backend { iterations_completed: k - 1, source }),
                    ErrorPolicy::Continue => {
                        log::warn!("loop iteration {k} failed, stopping loop early: {source}");
                        Ok(LoopOutcome::ConvergenceExhausted { iterations: k - 1 })
                    }
                };
            }

            let convergence_sql = plan.loop_template.convergence_query(prefix, k);
            let diff_count = backend
                .fetch_scalar_i64(&convergence_sql)
                .map_err(|source| UnifyError::Backend { iterations_completed: k, source })?;

            if diff_count == 0 {
                return Ok(LoopOutcome::Converged { iterations: k });
            }

            if opts.sleep_between > std::time::Duration::ZERO {
                std::thread::sleep(opts.sleep_between);
            }
        }

        Ok(LoopOutcome::ConvergenceExhausted { iterations: opts.max_iterations })
    }

    fn execute_with_policy(backend: &mut dyn Backend, stage_name: &str, sql: &str, opts: &LoopOptions) -> Result<(), UnifyError> {
        match backend.execute(sql) {
            Ok(_) => Ok(()),
            Err(source) => match opts.on_error {
                ErrorPolicy::StopOnError => Err(UnifyError::Abort { stage: stage_name.to_string(), source }),
                ErrorPolicy::Continue => {
                    log::warn!("stage '{stage_name}' failed, continuing per error policy: {source}");
                    Ok(())
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use unify_backend::MockBackend;
    use unify_config::Config;
    use unify_dialect::SnowflakeDialect;

    use super::*;

    fn plan_for(yaml: &str) -> Plan {
        let config = Config::parse(yaml).unwrap().compile().unwrap();
        let dialect: Arc<dyn unify_dialect::DialectOps> = Arc::new(SnowflakeDialect);
        unify_plan::compile(&config, dialect, "cat", "schema", "cat", "schema")
    }

    const ONE_KEY_YAML: &str = r#"
keys:
  - name: email
tables:
  - table: events
    key_columns:
      - { column: email_col, key: email }
canonical_ids:
  - merge_by_keys: [email]
"#;

    #[test]
    fn converges_early_when_convergence_query_returns_zero() {
        let plan = plan_for(ONE_KEY_YAML);
        let mut backend = MockBackend::new();
        backend.script_scalars([0]); // iteration 1 converges immediately
        let outcome = LoopDriver::run(&mut backend, &plan, &LoopOptions::no_sleep()).unwrap();
        assert_eq!(outcome, LoopOutcome::Converged { iterations: 1 });
    }

    #[test]
    fn exhausts_max_iterations_when_never_converging() {
        let plan = plan_for(ONE_KEY_YAML);
        let mut backend = MockBackend::new();
        backend.script_scalars(std::iter::repeat(5).take(30));
        let opts = LoopOptions { max_iterations: 5, sleep_between: std::time::Duration::ZERO, ..Default::default() };
        let outcome = LoopDriver::run(&mut backend, &plan, &opts).unwrap();
        assert_eq!(outcome, LoopOutcome::ConvergenceExhausted { iterations: 5 });
    }

    #[test]
    fn aborts_on_backend_error_with_stop_on_error() {
        let plan = plan_for(ONE_KEY_YAML);
        let mut backend = MockBackend::new();
        backend.fail_next_containing("CREATE OR REPLACE TABLE"); // fails stage 01
        let result = LoopDriver::run(&mut backend, &plan, &LoopOptions::no_sleep());
        assert!(matches!(result, Err(UnifyError::Abort { .. })));
    }

    #[test]
    fn continues_past_non_loop_failure_under_continue_policy() {
        let plan = plan_for(ONE_KEY_YAML);
        let mut backend = MockBackend::new();
        backend.fail_next_containing("source_key_stats");
        backend.script_scalars([0]);
        let opts = LoopOptions { on_error: ErrorPolicy::Continue, sleep_between: std::time::Duration::ZERO, ..Default::default() };
        let outcome = LoopDriver::run(&mut backend, &plan, &opts).unwrap();
        assert!(outcome.converged());
    }

    #[test]
    fn alias_table_points_at_converged_iteration() {
        let plan = plan_for(ONE_KEY_YAML);
        let mut backend = MockBackend::new();
        backend.script_scalars([3, 0]); // converges on iteration 2
        LoopDriver::run(&mut backend, &plan, &LoopOptions::no_sleep()).unwrap();
        assert!(backend
            .executed
            .iter()
            .any(|s| s.contains("unified_id_graph_unify_loop_final") && s.contains("unified_id_graph_unify_loop_2")));
    }
}
