//! In-process implementation of the directory, catalog, match store and
//! experience log.
//! Backs `AppState::fake()` so the matching core can be tested without
//! Postgres. One lock covers every collection, which makes each operation
//! atomic the same way a transaction does.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    machine::Outcome,
    model::{Match, MatchStatus, NewMatch, TaskStatus},
    store::{MatchStore, StoreError},
};
use crate::{
    catalog::{
        repo::TraitCatalog,
        repo_types::{PersonalityTrait, Task},
    },
    experiences::{
        repo::ExperienceLog,
        repo_types::{NewExperience, TaskExperience},
    },
    users::{
        directory::UserDirectory,
        repo_types::{Gender, UserProfile},
    },
};

#[derive(Default)]
struct Inner {
    traits: Vec<PersonalityTrait>,
    tasks: Vec<Task>,
    users: Vec<UserProfile>,
    matches: HashMap<Uuid, Match>,
    /// user id -> id of the live match holding them
    live: HashMap<Uuid, Uuid>,
    experiences: Vec<TaskExperience>,
    clock: Option<OffsetDateTime>,
}

impl Inner {
    /// Strictly increasing timestamps so "most recently updated" is total.
    fn tick(&mut self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        let next = match self.clock {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.clock = Some(next);
        next
    }

    fn holder(&self, user_id: Uuid) -> Option<Uuid> {
        self.live.get(&user_id).copied()
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_trait(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.write().await.traits.push(PersonalityTrait {
            id,
            name: name.to_string(),
        });
        id
    }

    pub async fn add_task(&self, trait_id: Uuid, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.write().await.tasks.push(Task {
            id,
            title: title.to_string(),
            description: format!("{title} together"),
            category: "general".into(),
            difficulty: "easy".into(),
            trait_id,
        });
        id
    }

    pub async fn add_user(&self, name: &str, gender: Option<Gender>, trait_ids: Vec<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.write().await.users.push(UserProfile {
            id,
            name: name.to_string(),
            age: Some(24),
            gender,
            trait_ids,
        });
        id
    }

    /// Every match a user takes part in, whatever its status.
    pub async fn matches_of(&self, user_id: Uuid) -> Vec<Match> {
        self.inner
            .read()
            .await
            .matches
            .values()
            .filter(|m| m.has_participant(user_id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_candidates(
        &self,
        gender: Gender,
        excluding: Uuid,
        exclude_open_friend_quests: bool,
    ) -> anyhow::Result<Vec<UserProfile>> {
        let inner = self.inner.read().await;
        let blocked = |user_id: Uuid| {
            inner
                .matches
                .values()
                .any(|m| {
                    m.has_participant(user_id) && m.blocks_new_match(exclude_open_friend_quests)
                })
        };
        Ok(inner
            .users
            .iter()
            .filter(|u| u.gender == Some(gender) && u.id != excluding && !blocked(u.id))
            .cloned()
            .collect())
    }

    async fn set_traits(&self, user_id: Uuid, trait_ids: &[Uuid]) -> anyhow::Result<()> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| anyhow::anyhow!("user {user_id} not found"))?;
        user.trait_ids = trait_ids.to_vec();
        Ok(())
    }
}

#[async_trait]
impl TraitCatalog for MemoryStore {
    async fn list_traits(&self) -> anyhow::Result<Vec<PersonalityTrait>> {
        let mut traits = self.inner.read().await.traits.clone();
        traits.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(traits)
    }

    async fn find_traits(&self, ids: &[Uuid]) -> anyhow::Result<Vec<PersonalityTrait>> {
        let mut traits: Vec<_> = self
            .inner
            .read()
            .await
            .traits
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect();
        traits.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(traits)
    }

    async fn tasks_for_traits(&self, trait_ids: &[Uuid]) -> anyhow::Result<Vec<Task>> {
        let inner = self.inner.read().await;
        Ok(trait_ids
            .iter()
            .flat_map(|tid| inner.tasks.iter().filter(move |t| t.trait_id == *tid))
            .cloned()
            .collect())
    }

    async fn get_task(&self, id: Uuid) -> anyhow::Result<Option<Task>> {
        let inner = self.inner.read().await;
        Ok(inner.tasks.iter().find(|t| t.id == id).cloned())
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn create(&self, new: NewMatch) -> Result<Match, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.holder(new.participant_a).is_some() || inner.holder(new.participant_b).is_some() {
            return Err(StoreError::Conflict);
        }
        let now = inner.tick();
        let created = Match {
            id: Uuid::new_v4(),
            participant_a: new.participant_a,
            participant_b: new.participant_b,
            status: MatchStatus::Live,
            score: new.score,
            task_id: new.task_id,
            task_status: TaskStatus::Pending,
            task_proof_url: None,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        inner.live.insert(created.participant_a, created.id);
        inner.live.insert(created.participant_b, created.id);
        inner.matches.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Match>, StoreError> {
        Ok(self.inner.read().await.matches.get(&id).cloned())
    }

    async fn find_live(&self, user_id: Uuid) -> Result<Option<Match>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .matches
            .values()
            .filter(|m| m.has_participant(user_id) && m.is_live())
            .max_by_key(|m| m.updated_at)
            .cloned())
    }

    async fn find_current(&self, user_id: Uuid) -> Result<Option<Match>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .matches
            .values()
            .filter(|m| m.has_participant(user_id) && m.is_current())
            .max_by_key(|m| (m.is_live(), m.updated_at))
            .cloned())
    }

    async fn list_friends(&self, user_id: Uuid) -> Result<Vec<Match>, StoreError> {
        let inner = self.inner.read().await;
        let mut friends: Vec<Match> = inner
            .matches
            .values()
            .filter(|m| m.has_participant(user_id) && m.status == MatchStatus::Friend)
            .cloned()
            .collect();
        friends.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(friends)
    }

    async fn commit(
        &self,
        snapshot: &Match,
        outcome: Outcome,
    ) -> Result<Option<Match>, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.matches.get(&snapshot.id) {
            Some(stored) if stored.version == snapshot.version => {}
            _ => return Err(StoreError::Stale),
        }

        match outcome {
            Outcome::Unchanged => Ok(Some(snapshot.clone())),

            Outcome::Dissolve => {
                inner.matches.remove(&snapshot.id);
                inner.live.retain(|_, mid| *mid != snapshot.id);
                inner.experiences.retain(|e| e.match_id != snapshot.id);
                Ok(None)
            }

            Outcome::Update(mut next) => {
                if next.is_live() {
                    let taken = [next.participant_a, next.participant_b]
                        .into_iter()
                        .any(|p| matches!(inner.holder(p), Some(mid) if mid != next.id));
                    if taken {
                        return Err(StoreError::Conflict);
                    }
                    inner.live.insert(next.participant_a, next.id);
                    inner.live.insert(next.participant_b, next.id);
                } else {
                    inner.live.retain(|_, mid| *mid != next.id);
                }
                next.version = snapshot.version + 1;
                next.updated_at = inner.tick();
                inner.matches.insert(next.id, next.clone());
                Ok(Some(next))
            }
        }
    }
}

fn newest_first(mut entries: Vec<TaskExperience>) -> Vec<TaskExperience> {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    entries
}

#[async_trait]
impl ExperienceLog for MemoryStore {
    async fn add(&self, new: NewExperience<'_>) -> anyhow::Result<TaskExperience> {
        let mut inner = self.inner.write().await;
        if !inner.matches.contains_key(&new.match_id) {
            anyhow::bail!("match {} does not exist", new.match_id);
        }
        let author_name = inner
            .users
            .iter()
            .find(|u| u.id == new.user_id)
            .map(|u| u.name.clone())
            .ok_or_else(|| anyhow::anyhow!("user {} does not exist", new.user_id))?;
        let experience = TaskExperience {
            id: Uuid::new_v4(),
            match_id: new.match_id,
            user_id: new.user_id,
            author_name,
            content: new.content.to_owned(),
            proof_url: new.proof_url.map(str::to_owned),
            created_at: inner.tick(),
        };
        inner.experiences.push(experience.clone());
        Ok(experience)
    }

    async fn list_for_match(&self, match_id: Uuid) -> anyhow::Result<Vec<TaskExperience>> {
        let inner = self.inner.read().await;
        let entries = inner
            .experiences
            .iter()
            .filter(|e| e.match_id == match_id)
            .cloned()
            .collect();
        Ok(newest_first(entries))
    }

    async fn list_for_author(&self, user_id: Uuid) -> anyhow::Result<Vec<TaskExperience>> {
        let inner = self.inner.read().await;
        let entries = inner
            .experiences
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(entries))
    }
}
