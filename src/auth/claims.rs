use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which of the two token flavours a JWT is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,       // user id
    pub iat: usize,      // issued at (unix)
    pub exp: usize,      // expires at (unix)
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}
