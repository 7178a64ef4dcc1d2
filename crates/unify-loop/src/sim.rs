//! Pure-Rust reference model of the graph-closure algebra (spec §3.2,
//! §4.3.3), used only as a test oracle.
//!
//! The actual unification loop runs as generated SQL against a warehouse
//! (`unify-plan::templates::unify_loop`, driven by [`crate::LoopDriver`]);
//! reimplementing that algebra here lets the quantified invariants of
//! spec §8 (monotone leader, convergence, set discipline) be checked with
//! `proptest` without parsing or executing SQL. The SQL template and this
//! model are two independent renderings of the same §4.3.3 definition —
//! they are cross-checked only in that both are grounded directly in the
//! spec text, not against each other.

use std::collections::BTreeSet;

/// An identifier: `(ns, id)`.
pub type Ident = (u32, String);

/// One row of the unification graph (spec §3.2), with `u32` timestamps
/// standing in for the spec's `int64` (sufficient range for a test oracle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    pub follower: Ident,
    pub leader: Ident,
    pub first_seen_at: u32,
    pub last_seen_at: u32,
    pub source_table_ids: BTreeSet<u32>,
    pub last_processed_at: u32,
}

/// Total order key on `(ns, id)` under a priority vector (spec §4.3.3 step
/// 2): `(priority(ns), id)`, lexicographically.
fn leader_key(ident: &Ident, priorities: &[u32]) -> (u32, String) {
    let priority = priorities.get((ident.0 as usize).wrapping_sub(1)).copied().unwrap_or(ident.0);
    (priority, ident.1.clone())
}

/// Computes `G_k` from `G_{k-1}` per spec §4.3.3.
pub fn step(graph: &[Tuple], priorities: &[u32]) -> Vec<Tuple> {
    // 1. Two-hop relation H: G ∪ (G ⋈_{leader=follower} G).
    let mut h: Vec<Tuple> = graph.to_vec();
    for t1 in graph {
        for t2 in graph {
            if t1.leader == t2.follower && t1.leader != t2.leader {
                h.push(Tuple {
                    follower: t1.follower.clone(),
                    leader: t2.leader.clone(),
                    first_seen_at: t1.first_seen_at,
                    last_seen_at: t1.last_seen_at,
                    source_table_ids: t1.source_table_ids.clone(),
                    last_processed_at: t1.last_processed_at,
                });
            }
        }
    }

    // 2/3. For each follower, promote to the minimum leader reachable in H.
    let mut min_leader: std::collections::HashMap<Ident, (Ident, (u32, String))> = std::collections::HashMap::new();
    for t in &h {
        let key = leader_key(&t.leader, priorities);
        min_leader
            .entry(t.follower.clone())
            .and_modify(|(best_ident, best_key)| {
                if key < *best_key {
                    *best_ident = t.leader.clone();
                    *best_key = key.clone();
                }
            })
            .or_insert_with(|| (t.leader.clone(), key));
    }

    let mut promoted: Vec<Tuple> = Vec::with_capacity(graph.len());
    for t in graph {
        let (new_leader, _) = min_leader.get(&t.follower).cloned().unwrap_or_else(|| (t.leader.clone(), leader_key(&t.leader, priorities)));
        let changed = new_leader != t.leader;
        promoted.push(Tuple {
            follower: t.follower.clone(),
            leader: new_leader,
            first_seen_at: t.first_seen_at,
            last_seen_at: t.last_seen_at,
            source_table_ids: t.source_table_ids.clone(),
            last_processed_at: if changed { t.last_processed_at + 1 } else { t.last_processed_at },
        });
    }

    // 4. Aggregate on (follower, leader).
    let mut grouped: std::collections::HashMap<(Ident, Ident), Tuple> = std::collections::HashMap::new();
    for t in promoted {
        let key = (t.follower.clone(), t.leader.clone());
        grouped
            .entry(key)
            .and_modify(|acc| {
                acc.first_seen_at = acc.first_seen_at.min(t.first_seen_at);
                acc.last_seen_at = acc.last_seen_at.max(t.last_seen_at);
                acc.source_table_ids.extend(t.source_table_ids.iter().copied());
                acc.last_processed_at = acc.last_processed_at.max(t.last_processed_at);
            })
            .or_insert(t);
    }

    let mut out: Vec<Tuple> = grouped.into_values().collect();
    out.sort_by(|a, b| (a.follower.0, &a.follower.1, a.leader.0, &a.leader.1).cmp(&(b.follower.0, &b.follower.1, b.leader.0, &b.leader.1)));
    out
}

/// The `(follower_ns, follower_id, leader_ns, leader_id)` projection
/// compared by the convergence query (spec §4.4 step 4).
pub fn projection(graph: &[Tuple]) -> BTreeSet<(Ident, Ident)> {
    graph.iter().map(|t| (t.follower.clone(), t.leader.clone())).collect()
}

/// Iterates [`step`] to a fixed point (or `max_iterations`), returning the
/// final graph and the iteration count reached.
pub fn converge(mut graph: Vec<Tuple>, priorities: &[u32], max_iterations: u32) -> (Vec<Tuple>, u32) {
    for k in 1..=max_iterations {
        let next = step(&graph, priorities);
        if projection(&next) == projection(&graph) {
            return (next, k);
        }
        graph = next;
    }
    (graph, max_iterations)
}
