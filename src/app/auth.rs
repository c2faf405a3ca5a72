use std::sync::Arc;

use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::ports::{Repositories, UserRepository, UserWrite};
use crate::domain::user::{normalize_email, NewUser, Role, User};

const TOKEN_ISSUER: &str = "devconnect";
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

/// Failures shared by registration, login and profile management.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid role")]
    InvalidRole,
    #[error("password must be between 8 and 128 characters")]
    PasswordLength,
    #[error("user already exists")]
    EmailTaken,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("old password is required to set a new password")]
    OldPasswordRequired,
    #[error("old password is incorrect")]
    IncorrectPassword,
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct LoginSession {
    pub access: AccessToken,
    pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    access_key: [u8; 32],
    access_ttl_minutes: u64,
}

impl AuthService {
    pub fn new(repos: &Repositories, access_key: [u8; 32], access_ttl_minutes: u64) -> Self {
        Self {
            users: repos.users.clone(),
            access_key,
            access_ttl_minutes,
        }
    }

    pub async fn register(&self, registration: Registration) -> Result<User, AccountError> {
        let name = required(&registration.name, "name")?;
        let email = normalize_email(&registration.email);
        if email.is_empty() {
            return Err(AccountError::MissingField("email"));
        }
        if registration.password.is_empty() {
            return Err(AccountError::MissingField("password"));
        }
        let role = parse_role(&registration.role)?;
        check_password_length(&registration.password)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AccountError::EmailTaken);
        }

        let password_hash = hash_password(&registration.password)?;
        let write = self
            .users
            .insert(NewUser {
                name,
                email,
                password_hash,
                role,
                avatar: registration.avatar.filter(|avatar| !avatar.trim().is_empty()),
            })
            .await?;

        match write {
            UserWrite::Saved(user) => Ok(user),
            UserWrite::EmailTaken => Err(AccountError::EmailTaken),
            UserWrite::Missing => Err(AccountError::Store(anyhow!("insert reported missing row"))),
        }
    }

    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession, AccountError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AccountError::InvalidCredentials);
        }

        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => return Err(AccountError::InvalidCredentials),
        };
        if user.password_hash.is_empty() || !verify_password(password, &user.password_hash)? {
            return Err(AccountError::InvalidCredentials);
        }

        let access = self.issue_access_token(user.id)?;
        Ok(LoginSession { access, user })
    }

    pub fn issue_access_token(&self, user_id: Uuid) -> Result<AccessToken> {
        let (claims, expires_at) = self.build_access_claims(user_id)?;
        let key = SymmetricKey::<V4>::from(&self.access_key)?;
        let token = local::encrypt(&key, &claims, None, None)?;
        Ok(AccessToken { token, expires_at })
    }

    /// Returns the subject of a valid, unexpired access token.
    pub fn authenticate_access_token(&self, token: &str) -> Result<Option<Uuid>> {
        let claims = match self.decrypt_claims(token)? {
            Some(claims) => claims,
            None => return Ok(None),
        };
        if !has_token_type(&claims, "access") {
            return Ok(None);
        }
        Ok(Some(claim_uuid(&claims, "sub")?))
    }

    fn decrypt_claims(&self, token: &str) -> Result<Option<Claims>> {
        let key = SymmetricKey::<V4>::from(&self.access_key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(TOKEN_ISSUER);
        rules.validate_audience_with(TOKEN_ISSUER);

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        Ok(trusted.payload_claims().cloned())
    }

    fn build_access_claims(&self, user_id: Uuid) -> Result<(Claims, OffsetDateTime)> {
        let ttl_seconds = self
            .access_ttl_minutes
            .checked_mul(60)
            .and_then(|seconds| i64::try_from(seconds).ok())
            .ok_or_else(|| anyhow!("access token ttl out of range"))?;
        let expires_at = OffsetDateTime::now_utc()
            .checked_add(Duration::seconds(ttl_seconds))
            .ok_or_else(|| anyhow!("access token ttl out of range"))?;
        let duration = std::time::Duration::from_secs(ttl_seconds.unsigned_abs());
        let mut claims = Claims::new_expires_in(&duration)?;
        claims.issuer(TOKEN_ISSUER)?;
        claims.audience(TOKEN_ISSUER)?;
        claims.subject(&user_id.to_string())?;
        claims.add_additional("typ", "access")?;
        Ok((claims, expires_at))
    }
}

pub(crate) fn required(value: &str, field: &'static str) -> Result<String, AccountError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AccountError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn parse_role(value: &str) -> Result<Role, AccountError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AccountError::MissingField("role"));
    }
    Role::from_db(value).ok_or(AccountError::InvalidRole)
}

pub(crate) fn check_password_length(password: &str) -> Result<(), AccountError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(AccountError::PasswordLength);
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|err| anyhow!("failed to parse password hash: {}", err))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn claim_uuid(claims: &Claims, name: &str) -> Result<Uuid> {
    let value = claims
        .get_claim(name)
        .and_then(|value| value.as_str())
        .ok_or_else(|| anyhow!("missing {} claim", name))?;
    Ok(Uuid::parse_str(value)?)
}

fn has_token_type(claims: &Claims, expected: &str) -> bool {
    claims
        .get_claim("typ")
        .and_then(|value| value.as_str())
        .map(|value| value == expected)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::MemoryStore;

    fn service() -> AuthService {
        let repos = Repositories::from_store(MemoryStore::new());
        AuthService::new(&repos, [7u8; 32], 20)
    }

    fn registration(email: &str) -> Registration {
        Registration {
            name: "Ada".to_string(),
            email: email.to_string(),
            password: "correct horse".to_string(),
            role: "job_seeker".to_string(),
            avatar: None,
        }
    }

    #[test]
    fn access_token_round_trips_subject() {
        let auth = service();
        let user_id = Uuid::new_v4();
        let access = auth.issue_access_token(user_id).unwrap();

        assert_eq!(
            auth.authenticate_access_token(&access.token).unwrap(),
            Some(user_id)
        );
        assert!(access.expires_at > OffsetDateTime::now_utc());
    }

    #[test]
    fn tokens_from_another_key_are_rejected() {
        let auth = service();
        let repos = Repositories::from_store(MemoryStore::new());
        let other = AuthService::new(&repos, [9u8; 32], 20);
        let access = other.issue_access_token(Uuid::new_v4()).unwrap();

        assert_eq!(auth.authenticate_access_token(&access.token).unwrap(), None);
        assert_eq!(auth.authenticate_access_token("garbage").unwrap(), None);
    }

    #[test]
    fn oversized_ttl_fails_instead_of_wrapping() {
        let repos = Repositories::from_store(MemoryStore::new());
        let auth = AuthService::new(&repos, [7u8; 32], u64::MAX);
        assert!(auth.issue_access_token(Uuid::new_v4()).is_err());
    }

    #[test]
    fn role_and_password_validation() {
        assert_eq!(parse_role("hiring").unwrap(), Role::Hiring);
        assert!(matches!(parse_role("admin"), Err(AccountError::InvalidRole)));
        assert!(matches!(parse_role(" "), Err(AccountError::MissingField("role"))));
        assert!(matches!(
            check_password_length("short"),
            Err(AccountError::PasswordLength)
        ));
        assert!(check_password_length("long enough").is_ok());
    }

    #[tokio::test]
    async fn register_normalizes_email_and_rejects_duplicates() {
        let auth = service();

        let user = auth
            .register(registration("  Ada@Example.COM "))
            .await
            .unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_ne!(user.password_hash, "correct horse");

        let err = auth
            .register(registration("ada@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::EmailTaken));

        let session = auth.login("ADA@example.com", "correct horse").await.unwrap();
        assert_eq!(session.user.id, user.id);
        assert!(matches!(
            auth.login("ada@example.com", "wrong password").await,
            Err(AccountError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@example.com", "correct horse").await,
            Err(AccountError::InvalidCredentials)
        ));
    }
}
