use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Personality trait a user can declare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PersonalityTrait {
    pub id: Uuid,
    pub name: String,
}

/// A quest two matched users can do together. Each task hangs off one trait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    pub trait_id: Uuid,
}
