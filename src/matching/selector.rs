use tracing::debug;
use uuid::Uuid;

use super::scorer::{self, Compatibility};
use crate::users::{
    directory::UserDirectory,
    repo_types::{Gender, UserProfile},
};

/// Decides which category of user a requester may be paired with.
pub trait PairingRule: Send + Sync {
    /// The gender a requester of `gender` is matched against, or `None` when
    /// the requester cannot be matched at all.
    fn counterpart(&self, gender: Option<Gender>) -> Option<Gender>;
}

/// Boys are paired with girls and girls with boys.
#[derive(Debug, Clone, Copy, Default)]
pub struct OppositeGender;

impl PairingRule for OppositeGender {
    fn counterpart(&self, gender: Option<Gender>) -> Option<Gender> {
        match gender? {
            Gender::Boy => Some(Gender::Girl),
            Gender::Girl => Some(Gender::Boy),
        }
    }
}

/// Winning candidate with the traits both sides share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateResult {
    pub candidate: UserProfile,
    pub compatibility: Compatibility,
}

/// Pick the candidate with the strictly highest score. Ties go to whoever came
/// first in `pool`. A best score of zero means nobody is compatible.
pub fn pick_best(requester_traits: &[Uuid], pool: Vec<UserProfile>) -> Option<CandidateResult> {
    let mut best: Option<CandidateResult> = None;
    for candidate in pool {
        let compatibility = scorer::score(requester_traits, &candidate.trait_ids);
        let better = match &best {
            Some(current) => compatibility.score > current.compatibility.score,
            None => true,
        };
        if better {
            best = Some(CandidateResult {
                candidate,
                compatibility,
            });
        }
    }
    best.filter(|b| b.compatibility.is_compatible())
}

/// Query the directory for eligible counterparts of `requester` and score
/// them. Read-only.
pub async fn find_compatible_match(
    directory: &dyn UserDirectory,
    rule: &dyn PairingRule,
    requester: &UserProfile,
    exclude_open_friend_quests: bool,
) -> anyhow::Result<Option<CandidateResult>> {
    let Some(counterpart) = rule.counterpart(requester.gender) else {
        return Ok(None);
    };
    let pool = directory
        .list_candidates(counterpart, requester.id, exclude_open_friend_quests)
        .await?;
    let pool_size = pool.len();
    let best = pick_best(&requester.trait_ids, pool);
    debug!(
        requester = %requester.id,
        pool_size,
        best_score = best.as_ref().map(|b| b.compatibility.score).unwrap_or(0),
        "candidate pool scored"
    );
    Ok(best)
}
