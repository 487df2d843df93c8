//! Password hashing, bearer sessions and the request extractors built on them.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::{Digest, Sha256};
use shared::entity::users;
use shared::Plan;

use crate::error::AppError;
use crate::services;
use crate::state::AppState;

const HASH_SCHEME: &str = "pbkdf2_sha256";

pub fn hash_password(password: &str, rounds: u32) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let mut hash = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, rounds, &mut hash);
    format!("{}${}${}${}", HASH_SCHEME, rounds, hex::encode(salt), hex::encode(hash))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    let [scheme, rounds, salt, expected] = parts[..] else {
        return false;
    };
    if scheme != HASH_SCHEME {
        return false;
    }
    let (Ok(rounds), Ok(salt), Ok(expected)) =
        (rounds.parse::<u32>(), hex::decode(salt), hex::decode(expected))
    else {
        return false;
    };

    let mut hash = vec![0u8; expected.len()];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, rounds, &mut hash);
    constant_time_eq(&hash, &expected)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Fresh opaque session token. Only its hash is stored.
pub fn new_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// `EventSource` cannot set headers, so SSE clients pass `?access_token=`.
fn query_token(query: Option<&str>) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "access_token")
        .map(|(_, value)| value.to_string())
        .filter(|v| !v.is_empty())
}

/// Signed-in user resolved from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: users::Model,
    pub session_id: i32,
}

impl AuthUser {
    pub fn id(&self) -> i32 {
        self.user.id
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }

    pub fn plan(&self) -> Option<Plan> {
        self.user.plan.as_deref().and_then(|p| p.parse().ok())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = match parts.extract::<TypedHeader<Authorization<Bearer>>>().await {
            Ok(TypedHeader(Authorization(bearer))) => bearer.token().to_string(),
            Err(_) => query_token(parts.uri.query())
                .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?,
        };

        let (session, user) = services::users::find_session_user(&state.db, &token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_string()))?;

        Ok(AuthUser {
            user,
            session_id: session.id,
        })
    }
}

/// Same as [`AuthUser`] but rejects non-admins.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("Admin only".to_string()));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let stored = hash_password("hunter22", 1_000);
        assert!(stored.starts_with("pbkdf2_sha256$1000$"));
        assert!(verify_password("hunter22", &stored));
        assert!(!verify_password("hunter23", &stored));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        assert_ne!(hash_password("pw", 1_000), hash_password("pw", 1_000));
    }

    #[test]
    fn test_verify_rejects_malformed_hashes() {
        assert!(!verify_password("pw", ""));
        assert!(!verify_password("pw", "md5$1$00$00"));
        assert!(!verify_password("pw", "pbkdf2_sha256$x$00$00"));
    }

    #[test]
    fn test_session_tokens() {
        let token = new_session_token();
        assert_eq!(token.len(), 64);
        assert_ne!(token, new_session_token());
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), token);
    }

    #[test]
    fn test_query_token() {
        assert_eq!(query_token(Some("after=3&access_token=abc")), Some("abc".to_string()));
        assert_eq!(query_token(Some("access_token=")), None);
        assert_eq!(query_token(None), None);
    }
}
