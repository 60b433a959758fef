use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Declared gender. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Boy,
    Girl,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Boy => "boy",
            Gender::Girl => "girl",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boy" => Ok(Gender::Boy),
            "girl" => Ok(Gender::Girl),
            other => anyhow::bail!("unrecognized gender {other:?}"),
        }
    }
}

/// What the matching core needs to know about a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub age: Option<i32>,
    /// `None` when the stored value is missing or not a recognized gender.
    pub gender: Option<Gender>,
    /// Declared traits in declaration order.
    pub trait_ids: Vec<Uuid>,
}

#[derive(Debug, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub name: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub trait_ids: Vec<Uuid>,
}

impl From<ProfileRow> for UserProfile {
    fn from(r: ProfileRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            age: r.age,
            gender: r.gender.as_deref().and_then(|g| g.parse().ok()),
            trait_ids: r.trait_ids,
        }
    }
}
