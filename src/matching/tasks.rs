use rand::{seq::SliceRandom, Rng};
use uuid::Uuid;

use crate::catalog::repo_types::Task;

/// Quest for a brand-new match: uniform over the shared-trait pool.
pub fn pick_initial<'a, R: Rng + ?Sized>(pool: &'a [Task], rng: &mut R) -> Option<&'a Task> {
    pool.choose(rng)
}

/// Replacement quest for an existing match.
///
/// The current task is left out so the pair gets something new; when the
/// pool holds nothing else, repeats are allowed rather than failing. Returns
/// `None` only for an empty pool.
pub fn pick_reassignment<'a, R: Rng + ?Sized>(
    pool: &'a [Task],
    current: Uuid,
    rng: &mut R,
) -> Option<&'a Task> {
    let others: Vec<&Task> = pool.iter().filter(|t| t.id != current).collect();
    if others.is_empty() {
        pool.choose(rng)
    } else {
        others.choose(rng).copied()
    }
}
