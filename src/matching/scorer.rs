use std::collections::HashSet;

use uuid::Uuid;

/// Result of comparing two trait sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compatibility {
    /// `|A ∩ B|`
    pub score: usize,
    /// `A ∩ B`, in the order the traits appear in `A`.
    pub shared: Vec<Uuid>,
}

impl Compatibility {
    pub fn is_compatible(&self) -> bool {
        self.score > 0
    }
}

/// Count the traits `requester` and `candidate` have in common.
pub fn score(requester: &[Uuid], candidate: &[Uuid]) -> Compatibility {
    let theirs: HashSet<&Uuid> = candidate.iter().collect();
    let mut seen = HashSet::new();
    let shared: Vec<Uuid> = requester
        .iter()
        .filter(|id| theirs.contains(id) && seen.insert(**id))
        .copied()
        .collect();
    Compatibility {
        score: shared.len(),
        shared,
    }
}
