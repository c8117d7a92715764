//! Identity provider
//!
//! The rest of the application only asks three questions of identity: who
//! is signed in, what is their email, and can a session be started or
//! ended. [`IdentityProvider`] is that seam. [`LocalIdentityProvider`]
//! answers it with Argon2id password hashes and HS256 session tokens whose
//! ids are recorded server-side so signing out revokes them.

use std::collections::HashMap;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::config::AuthConfig;
use crate::db::{DbPool, UserRepository};
use crate::models::{Identity, Session, User};
use crate::utils::{error::is_unique_violation, AppError, AppResult};

const INVALID_CREDENTIALS: &str = "Invalid email or password.";

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account and start a session for it
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<Session>;

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Session>;

    /// Resolve a session token. Invalid, expired or revoked tokens yield `None`.
    async fn current_identity(&self, session_token: &str) -> AppResult<Option<Identity>>;

    async fn sign_out(&self, session_token: &str) -> AppResult<()>;

    /// Email addresses for the given identities; unknown ids are omitted
    async fn emails(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, String>>;
}

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    /// Session id, recorded in the sessions table
    pub jti: String,
}

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| AppError::internal(format!("Invalid password hash format: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct LocalIdentityProvider {
    pool: DbPool,
    secret: String,
    session_expiry: Duration,
    password_min_length: usize,
}

impl LocalIdentityProvider {
    pub fn new(pool: DbPool, config: &AuthConfig) -> Self {
        Self {
            pool,
            secret: config.session_secret.clone(),
            session_expiry: Duration::hours(config.session_expiry_hours as i64),
            password_min_length: config.password_min_length,
        }
    }

    async fn issue_session(&self, user: &User) -> AppResult<Session> {
        let now = Utc::now();
        let expires_at = now + self.session_expiry;
        let session_id = Uuid::new_v4();

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            nbf: now.timestamp(),
            jti: session_id.to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::internal(format!("Failed to sign session token: {}", e)))?;

        UserRepository::new(&self.pool)
            .create_session(session_id, user.id, expires_at)
            .await?;

        Ok(Session {
            identity: Identity::from(user),
            token,
            expires_at,
        })
    }

    fn decode_claims(&self, token: &str, check_expiry: bool) -> Option<Claims> {
        let mut validation = Validation::default();
        validation.validate_exp = check_expiry;
        validation.validate_nbf = check_expiry;
        if !check_expiry {
            validation.required_spec_claims.clear();
        }

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .ok()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<Session> {
        let email = normalize_email(email);
        if !email.validate_email() {
            return Err(AppError::validation("Enter a valid email address."));
        }
        if password.chars().count() < self.password_min_length {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters.",
                self.password_min_length
            )));
        }

        let repo = UserRepository::new(&self.pool);
        if repo.get_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("An account with that email already exists."));
        }

        let password_hash = hash_password(password)?;
        let user = repo.create(&email, &password_hash).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict("An account with that email already exists.")
            } else {
                AppError::from(e)
            }
        })?;

        tracing::info!(user_id = %user.id, "Account created");
        self.issue_session(&user).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Session> {
        let email = normalize_email(email);
        let repo = UserRepository::new(&self.pool);

        let Some(user) = repo.get_by_email(&email).await? else {
            return Err(AppError::bad_request(INVALID_CREDENTIALS));
        };
        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(AppError::bad_request(INVALID_CREDENTIALS));
        }

        let pruned = repo.delete_expired_sessions().await?;
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned expired sessions");
        }

        self.issue_session(&user).await
    }

    async fn current_identity(&self, session_token: &str) -> AppResult<Option<Identity>> {
        let Some(claims) = self.decode_claims(session_token, true) else {
            return Ok(None);
        };
        let (Ok(user_id), Ok(session_id)) =
            (Uuid::parse_str(&claims.sub), Uuid::parse_str(&claims.jti))
        else {
            return Ok(None);
        };

        let repo = UserRepository::new(&self.pool);
        if !repo.session_is_active(session_id, user_id).await? {
            return Ok(None);
        }

        Ok(repo.get_by_id(user_id).await?.as_ref().map(Identity::from))
    }

    async fn sign_out(&self, session_token: &str) -> AppResult<()> {
        if let Some(session_id) = self
            .decode_claims(session_token, false)
            .and_then(|claims| Uuid::parse_str(&claims.jti).ok())
        {
            UserRepository::new(&self.pool)
                .delete_session(session_id)
                .await?;
        }
        Ok(())
    }

    async fn emails(&self, ids: &[Uuid]) -> AppResult<HashMap<Uuid, String>> {
        Ok(UserRepository::new(&self.pool).emails_for(ids).await?)
    }
}
