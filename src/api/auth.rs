//! Accounts, sessions and group membership.
//!
//! Sessions are opaque tokens handed out at login. Only their SHA-256 hash is
//! stored, so a leaked database does not leak usable credentials.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::{rngs::OsRng, RngCore};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr, TransactionTrait,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::catalog::permissions::{
    require_manager, COOK_GROUP, KNOWN_CAPABILITIES, KNOWN_GROUPS, MANAGER_GROUP,
};
use crate::catalog::{Clock, Identity};
use crate::db::entities::{session, user, user_group, user_permission};
use crate::error::{FieldError, Result, ServerError, ValidationErrors};

pub const ADMIN_USERNAME: &str = "admin";
const TOKEN_PREFIX: &str = "rc_";
const TOKEN_BYTES: usize = 32;
const SALT_BYTES: usize = 16;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 150;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterInput {
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileInput {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

/// A session freshly issued by [`AuthManager::login`].
#[derive(Clone, Debug)]
pub struct IssuedSession {
    /// Raw token; never stored
    pub token: String,
    pub expires_at: i64,
    pub user: user::Model,
}

/// Hash a password with a per-user salt: `<salt>$<hex digest>`.
fn hash_password(password: &str) -> String {
    let salt = random_hex(SALT_BYTES);
    format!("{}${}", salt, salted_digest(&salt, password))
}

fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, digest)) if !salt.is_empty() => salted_digest(salt, password) == digest,
        _ => false,
    }
}

fn salted_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"recipe-catalog:");
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex(&hasher.finalize())
}

fn hash_token(token: &str) -> String {
    hex(&Sha256::digest(token.as_bytes()))
}

/// Hex string of `len` bytes from the operating system's CSPRNG.
fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    hex(&bytes)
}

fn generate_token() -> String {
    format!("{}{}", TOKEN_PREFIX, random_hex(TOKEN_BYTES))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn validate_username(username: &str, errors: &mut ValidationErrors) {
    let len = username.chars().count();
    if len == 0 {
        errors.push("username", "Username is required.");
    } else if !(2..=MAX_USERNAME_LEN).contains(&len) {
        errors.push(
            "username",
            format!("Username must be between 2 and {} characters.", MAX_USERNAME_LEN),
        );
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | '+'))
    {
        errors.push(
            "username",
            "Username may only contain letters, digits and the characters - _ . @ +",
        );
    }
}

fn validate_new_password(field: &str, password: &str, confirm: &str, errors: &mut ValidationErrors) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(
            field,
            format!("Password must be at least {} characters long.", MIN_PASSWORD_LEN),
        );
    } else if password.chars().all(|c| c.is_ascii_digit()) {
        errors.push(field, "Password cannot be entirely numeric.");
    }
    if password != confirm {
        errors.push(format!("{}_confirm", field), "The two passwords do not match.");
    }
}

fn clean_email(email: Option<String>, errors: &mut ValidationErrors) -> Option<String> {
    let email = email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty())?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Some(email),
        _ => {
            errors.push("email", "Enter a valid email address.");
            None
        }
    }
}

fn clean_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn username_taken(username: &str) -> ServerError {
    ServerError::Conflict(FieldError::new(
        "username",
        format!("A user named \"{}\" already exists.", username),
    ))
}

pub struct AuthManager {
    db: Arc<DatabaseConnection>,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
}

impl AuthManager {
    pub fn new(db: Arc<DatabaseConnection>, clock: Arc<dyn Clock>, session_ttl: Duration) -> Self {
        Self {
            db,
            clock,
            session_ttl,
        }
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(self.db.as_ref())
            .await?)
    }

    async fn require_user(&self, username: &str) -> Result<user::Model> {
        self.get_user_by_username(username)
            .await?
            .ok_or_else(|| ServerError::NotFound(format!("User {}", username)))
    }

    /// Create an account; new users are cooks.
    pub async fn register(&self, input: RegisterInput) -> Result<user::Model> {
        let mut errors = ValidationErrors::new();
        let username = input.username.trim().to_string();
        validate_username(&username, &mut errors);
        let email = clean_email(input.email, &mut errors);
        validate_new_password("password", &input.password, &input.password_confirm, &mut errors);
        errors.into_result()?;

        if self.get_user_by_username(&username).await?.is_some() {
            return Err(username_taken(&username));
        }

        let txn = self.db.begin().await?;
        let created = user::ActiveModel {
            username: Set(username.clone()),
            password_hash: Set(hash_password(&input.password)),
            email: Set(email),
            first_name: Set(clean_text(input.first_name)),
            last_name: Set(clean_text(input.last_name)),
            created_at: Set(self.clock.now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => username_taken(&username),
            _ => ServerError::Database(e),
        })?;
        user_group::ActiveModel {
            user_id: Set(created.id),
            group_name: Set(COOK_GROUP.to_string()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        tracing::info!("Registered user {} ({})", created.username, created.id);
        Ok(created)
    }

    /// Check a username/password pair.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<user::Model> {
        let user = self
            .get_user_by_username(username)
            .await?
            .ok_or(ServerError::AuthFailed)?;
        if !verify_password(password, &user.password_hash) {
            tracing::debug!("Wrong password for {}", username);
            return Err(ServerError::AuthFailed);
        }
        Ok(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedSession> {
        let user = self.authenticate(username.trim(), password).await?;
        let token = generate_token();
        let now = self.clock.now();
        let expires_at = now + self.session_ttl.as_secs() as i64;

        session::ActiveModel {
            user_id: Set(user.id),
            token_hash: Set(hash_token(&token)),
            created_at: Set(now),
            expires_at: Set(expires_at),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await?;

        tracing::info!("User {} logged in", user.username);
        Ok(IssuedSession {
            token,
            expires_at,
            user,
        })
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        session::Entity::delete_many()
            .filter(session::Column::TokenHash.eq(hash_token(token)))
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    /// Resolve an `Authorization` header value (Bearer session or Basic
    /// credentials) to the caller.
    pub async fn identify(&self, auth_header: &str) -> Result<Identity> {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            self.validate_session(token.trim()).await
        } else if auth_header.starts_with("Basic ") {
            self.authenticate_basic(auth_header).await
        } else {
            Err(ServerError::AuthFailed)
        }
    }

    pub async fn validate_session(&self, token: &str) -> Result<Identity> {
        if !token.starts_with(TOKEN_PREFIX) {
            return Err(ServerError::AuthFailed);
        }
        let found = session::Entity::find()
            .filter(session::Column::TokenHash.eq(hash_token(token)))
            .one(self.db.as_ref())
            .await?
            .ok_or(ServerError::AuthFailed)?;
        if found.expires_at <= self.clock.now() {
            return Err(ServerError::AuthFailed);
        }

        let user = user::Entity::find_by_id(found.user_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(ServerError::AuthFailed)?;
        self.identity(&user).await
    }

    /// Parse Basic auth header and authenticate
    pub async fn authenticate_basic(&self, auth_header: &str) -> Result<Identity> {
        let encoded = auth_header
            .strip_prefix("Basic ")
            .ok_or(ServerError::AuthFailed)?;
        let decoded = BASE64
            .decode(encoded.trim())
            .map_err(|_| ServerError::AuthFailed)?;
        let credentials = String::from_utf8(decoded).map_err(|_| ServerError::AuthFailed)?;
        let (username, password) = credentials.split_once(':').ok_or(ServerError::AuthFailed)?;

        let user = self.authenticate(username, password).await?;
        self.identity(&user).await
    }

    /// Load groups and capability grants for `user`.
    pub async fn identity(&self, user: &user::Model) -> Result<Identity> {
        let groups = user_group::Entity::find()
            .filter(user_group::Column::UserId.eq(user.id))
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|g| g.group_name)
            .collect();
        let capabilities: HashSet<String> = user_permission::Entity::find()
            .filter(user_permission::Column::UserId.eq(user.id))
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|p| p.codename)
            .collect();

        Ok(Identity {
            user_id: user.id,
            username: user.username.clone(),
            groups,
            capabilities,
        })
    }

    pub async fn update_profile(&self, user_id: i32, input: ProfileInput) -> Result<user::Model> {
        let mut errors = ValidationErrors::new();
        let email = clean_email(input.email, &mut errors);
        errors.into_result()?;

        let existing = user::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServerError::NotFound(format!("User {}", user_id)))?;
        let mut active: user::ActiveModel = existing.into();
        active.email = Set(email);
        active.first_name = Set(clean_text(input.first_name));
        active.last_name = Set(clean_text(input.last_name));
        let updated = active.update(self.db.as_ref()).await?;

        tracing::info!("Updated profile of {}", updated.username);
        Ok(updated)
    }

    /// Change a password after checking the old one. Other sessions of the
    /// user are ended.
    pub async fn change_password(&self, user_id: i32, input: PasswordChange) -> Result<()> {
        let existing = user::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServerError::NotFound(format!("User {}", user_id)))?;

        let mut errors = ValidationErrors::new();
        if !verify_password(&input.old_password, &existing.password_hash) {
            errors.push("old_password", "Your old password was entered incorrectly.");
        }
        validate_new_password(
            "new_password",
            &input.new_password,
            &input.new_password_confirm,
            &mut errors,
        );
        errors.into_result()?;

        let username = existing.username.clone();
        let txn = self.db.begin().await?;
        let mut active: user::ActiveModel = existing.into();
        active.password_hash = Set(hash_password(&input.new_password));
        active.update(&txn).await?;
        session::Entity::delete_many()
            .filter(session::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        tracing::info!("Password changed for {}", username);
        Ok(())
    }

    /// Make sure a manager account exists so the catalog can be administered.
    pub async fn ensure_admin_user(&self, password: &str) -> Result<()> {
        let admin = match self.get_user_by_username(ADMIN_USERNAME).await? {
            Some(existing) => existing,
            None => {
                let created = user::ActiveModel {
                    username: Set(ADMIN_USERNAME.to_string()),
                    password_hash: Set(hash_password(password)),
                    created_at: Set(self.clock.now()),
                    ..Default::default()
                }
                .insert(self.db.as_ref())
                .await?;
                tracing::info!("Created bootstrap user {}", ADMIN_USERNAME);
                created
            }
        };
        self.insert_group(admin.id, MANAGER_GROUP).await
    }

    async fn insert_group(&self, user_id: i32, group: &str) -> Result<()> {
        let exists = user_group::Entity::find()
            .filter(user_group::Column::UserId.eq(user_id))
            .filter(user_group::Column::GroupName.eq(group))
            .one(self.db.as_ref())
            .await?
            .is_some();
        if exists {
            return Ok(());
        }
        let inserted = user_group::ActiveModel {
            user_id: Set(user_id),
            group_name: Set(group.to_string()),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await;
        ignore_duplicate(inserted.map(|_| ()))
    }

    pub async fn add_group(&self, acting: &Identity, username: &str, group: &str) -> Result<Identity> {
        require_manager(acting)?;
        let group = known_group(group)?;
        let user = self.require_user(username).await?;
        self.insert_group(user.id, group).await?;
        tracing::info!("{} added {} to group {}", acting.username, username, group);
        self.identity(&user).await
    }

    pub async fn remove_group(&self, acting: &Identity, username: &str, group: &str) -> Result<Identity> {
        require_manager(acting)?;
        let group = known_group(group)?;
        let user = self.require_user(username).await?;
        if user.username == ADMIN_USERNAME && group == MANAGER_GROUP {
            return Err(ServerError::Conflict(FieldError::new(
                "group",
                "The bootstrap administrator must stay a manager.",
            )));
        }
        user_group::Entity::delete_many()
            .filter(user_group::Column::UserId.eq(user.id))
            .filter(user_group::Column::GroupName.eq(group))
            .exec(self.db.as_ref())
            .await?;
        tracing::info!("{} removed {} from group {}", acting.username, username, group);
        self.identity(&user).await
    }

    pub async fn grant_permission(
        &self,
        acting: &Identity,
        username: &str,
        codename: &str,
    ) -> Result<Identity> {
        require_manager(acting)?;
        let codename = KNOWN_CAPABILITIES
            .iter()
            .copied()
            .find(|c| *c == codename)
            .ok_or_else(|| {
                ServerError::Validation(
                    FieldError::new("codename", format!("Unknown permission \"{}\".", codename)).into(),
                )
            })?;
        let user = self.require_user(username).await?;

        let inserted = user_permission::ActiveModel {
            user_id: Set(user.id),
            codename: Set(codename.to_string()),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await;
        ignore_duplicate(inserted.map(|_| ()))?;

        tracing::info!("{} granted {} to {}", acting.username, codename, username);
        self.identity(&user).await
    }

    /// Remove expired sessions; returns how many were dropped.
    pub async fn cleanup_expired_sessions(&self) -> Result<u64> {
        let result = session::Entity::delete_many()
            .filter(session::Column::ExpiresAt.lte(self.clock.now()))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}

fn known_group(group: &str) -> Result<&'static str> {
    KNOWN_GROUPS.iter().copied().find(|g| *g == group).ok_or_else(|| {
        ServerError::Validation(FieldError::new("group", format!("Unknown group \"{}\".", group)).into())
    })
}

/// Granting something twice is not an error.
fn ignore_duplicate(result: std::result::Result<(), DbErr>) -> Result<()> {
    match result {
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => Ok(()),
        other => Ok(other?),
    }
}
