use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Knobs for the match lifecycle.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// How many times match creation re-runs selection when the chosen
    /// candidate was claimed by a concurrent request.
    pub create_attempts: u32,
    /// Optimistic-concurrency retries for a single transition.
    pub transition_attempts: u32,
    /// When set, a friendship whose quest is not completed counts as an
    /// ongoing relationship: it blocks new matches and hides the user from
    /// candidate pools.
    pub friend_quests_block_matching: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            create_attempts: 3,
            transition_attempts: 3,
            friend_quests_block_matching: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub matching: MatchingConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "kindred".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "kindred-users".into()),
            ttl_minutes: env_parsed("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_parsed("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 14),
        };
        let defaults = MatchingConfig::default();
        let matching = MatchingConfig {
            create_attempts: env_parsed("MATCH_CREATE_ATTEMPTS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.create_attempts),
            transition_attempts: env_parsed("MATCH_TRANSITION_ATTEMPTS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.transition_attempts),
            friend_quests_block_matching: env_parsed("FRIEND_QUESTS_BLOCK_MATCHING")
                .unwrap_or(defaults.friend_quests_block_matching),
        };
        Ok(Self {
            database_url,
            jwt,
            matching,
        })
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}
