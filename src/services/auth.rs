//! Staff credential login and session tokens.
//!
//! A session token is 32 random bytes, base64url encoded, handed to the
//! client once. The store only ever sees its SHA-256 digest.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{PublicUser, Session};
use crate::store::{AccountStore, NewUser, StoreError};

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email and password are required")]
    MissingCredentials,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired session")]
    InvalidSession,

    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("Password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Session lifetime out of range")]
    InvalidLifetime,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: PublicUser,
}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: PublicUser,
    pub session: Session,
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

/// bcrypt is deliberately slow, so it runs on the blocking pool.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_string();
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hashed)
}

async fn verify_password(password: &str, hashed: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hashed = hashed.to_string();
    let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed)).await??;
    Ok(valid)
}

/// Creates a staff account unless the email is already registered.
pub async fn ensure_user(
    store: &dyn AccountStore,
    email: &str,
    name: &str,
    password: &str,
    cost: u32,
) -> Result<bool, AuthError> {
    if store.find_user_by_email(email).await?.is_some() {
        return Ok(false);
    }

    let hashed_password = hash_password(password, cost).await?;
    let created = store
        .create_user_if_absent(NewUser {
            email: email.to_string(),
            name: name.to_string(),
            hashed_password,
        })
        .await?;

    Ok(created)
}

pub async fn login(
    store: &dyn AccountStore,
    email: &str,
    password: &str,
    ttl: Duration,
) -> Result<IssuedSession, AuthError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let Some(user) = store.find_user_by_email(email).await? else {
        debug!(email, "Login for unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(password, &user.hashed_password).await? {
        debug!(user_id = %user.id, "Login with wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    let purged = store.purge_expired_sessions().await?;
    if purged > 0 {
        debug!(purged, "Purged expired sessions");
    }

    let ttl = chrono::Duration::from_std(ttl).map_err(|_| AuthError::InvalidLifetime)?;
    let expires_at = Utc::now() + ttl;
    let token = generate_token();
    store
        .insert_session(&hash_token(&token), user.id, expires_at)
        .await?;

    info!(user_id = %user.id, %expires_at, "Staff session opened");

    Ok(IssuedSession {
        token,
        expires_at,
        user: PublicUser::from(&user),
    })
}

pub async fn authenticate(
    store: &dyn AccountStore,
    token: &str,
) -> Result<AuthenticatedUser, AuthError> {
    let session = store
        .find_active_session(&hash_token(token))
        .await?
        .ok_or(AuthError::InvalidSession)?;

    let user = store
        .find_user(session.user_id)
        .await?
        .ok_or(AuthError::InvalidSession)?;

    Ok(AuthenticatedUser {
        user: PublicUser::from(&user),
        session,
    })
}

pub async fn logout(store: &dyn AccountStore, session: &Session) -> Result<(), AuthError> {
    store.delete_session(&session.token_hash).await?;
    info!(user_id = %session.user_id, "Staff session closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const TEST_COST: u32 = 4;

    async fn store_with_staff() -> MemoryStore {
        let store = MemoryStore::new();
        ensure_user(&store, "staff@example.com", "Staff", "s3cret", TEST_COST)
            .await
            .unwrap();
        store
    }

    #[test]
    fn test_tokens_are_random_and_hash_is_stable() {
        let a = generate_token();
        let b = generate_token();

        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert_eq!(hash_token(&a), hash_token(&a));
        assert_ne!(hash_token(&a), a);
    }

    #[tokio::test]
    async fn test_ensure_user_is_idempotent() {
        let store = store_with_staff().await;

        let created = ensure_user(&store, "staff@example.com", "Other", "x", TEST_COST)
            .await
            .unwrap();
        assert!(!created);
    }

    #[tokio::test]
    async fn test_login_then_authenticate_then_logout() {
        let store = store_with_staff().await;

        let issued = login(&store, "staff@example.com", "s3cret", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(issued.user.email, "staff@example.com");

        let authed = authenticate(&store, &issued.token).await.unwrap();
        assert_eq!(authed.user, issued.user);

        logout(&store, &authed.session).await.unwrap();
        assert!(matches!(
            authenticate(&store, &issued.token).await,
            Err(AuthError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email() {
        let store = store_with_staff().await;
        let ttl = Duration::from_secs(60);

        assert!(matches!(
            login(&store, "staff@example.com", "nope", ttl).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            login(&store, "ghost@example.com", "s3cret", ttl).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            login(&store, "", "s3cret", ttl).await,
            Err(AuthError::MissingCredentials)
        ));
    }
}
