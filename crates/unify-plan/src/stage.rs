use std::sync::Arc;

use unify_dialect::DialectOps;

/// A single named SQL statement or statement group (spec §4.3).
///
/// `file_stem` is the `NN_name` portion the renderer (`unify-cli`) writes as
/// `NN_name.sql` (spec §4.6) — it doubles as the sort key: stages sort
/// lexicographically by `file_stem`, which works because every numeric
/// prefix is zero-padded to two digits.
#[derive(Debug, Clone)]
pub struct Stage {
    pub file_stem: String,
    pub sql: String,
}

impl Stage {
    pub fn new(file_stem: impl Into<String>, sql: impl Into<String>) -> Self {
        Stage {
            file_stem: file_stem.into(),
            sql: sql.into(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.sql", self.file_stem)
    }
}

/// Parameterized template for stage `04.k`, reused by both the compiler
/// (which materializes it up to the compiled iteration count) and the loop
/// driver (which synthesizes further iterations in-process once that count
/// is exhausted — spec §4.4, SPEC_FULL §5.4).
pub struct LoopTemplate {
    pub dialect: Arc<dyn DialectOps>,
    pub target: String,
    pub priorities: Vec<u32>,
}

impl LoopTemplate {
    /// Renders the SQL for iteration `k`, computing `G_k` from `G_{k-1}`.
    pub fn render(&self, prefix: &str, k: u32) -> Stage {
        let sql = crate::templates::unify_loop::render(
            self.dialect.as_ref(),
            &self.target,
            prefix,
            k,
            &self.priorities,
        );
        Stage::new(format!("04_unify_loop_iteration_{k:02}"), sql)
    }

    /// The SQL for the `EXISTS`-based convergence query between `G_k` and
    /// `G_{k-1}` (spec §4.4 step 4).
    pub fn convergence_query(&self, prefix: &str, k: u32) -> String {
        crate::templates::unify_loop::convergence_query(&self.target, prefix, k)
    }
}

/// The full compiled plan (spec §4.3): an ordered sequence of stages plus
/// the loop template needed to synthesize iterations beyond the compiled
/// count.
pub struct Plan {
    pub stages: Vec<Stage>,
    pub loop_template: LoopTemplate,
    pub compiled_iterations: u32,
    pub canonical_id_name: String,
}

impl Plan {
    /// Returns stages in stable, filename-sortable order (spec §4.6: "files
    /// lacking a prefix sort last").
    pub fn ordered_stages(&self) -> Vec<&Stage> {
        let mut stages: Vec<&Stage> = self.stages.iter().collect();
        stages.sort_by(|a, b| {
            let a_has_prefix = a.file_stem.split('_').next().map(|p| p.chars().all(|c| c.is_ascii_digit())).unwrap_or(false);
            let b_has_prefix = b.file_stem.split('_').next().map(|p| p.chars().all(|c| c.is_ascii_digit())).unwrap_or(false);
            match (a_has_prefix, b_has_prefix) {
                (true, true) | (false, false) => a.file_stem.cmp(&b.file_stem),
                (true, false) => std::cmp::Ordering::Less,
                (false, true) => std::cmp::Ordering::Greater,
            }
        });
        stages
    }
}
