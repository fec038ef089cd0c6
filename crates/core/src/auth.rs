//! Principal registration and credential checks.
//!
//! The index never sees credentials. Front-ends authenticate through an
//! [`AuthenticationProvider`] and pass the resulting [`PrincipalId`] as the owner of every
//! locker operation.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Identifier of an authenticated principal; used as the locker owner id.
pub type PrincipalId = String;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("principal already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid credentials")]
    InvalidCredential,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to hash credential: {0}")]
    Hash(String),
    #[error("failed to access user store {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("user store is corrupt: {0}")]
    Corrupt(serde_json::Error),
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Registers principals and verifies their credentials.
pub trait AuthenticationProvider: Send + Sync {
    fn register(&self, principal_id: &str, credential: &str) -> AuthResult<()>;

    fn authenticate(&self, principal_id: &str, credential: &str) -> AuthResult<PrincipalId>;
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct UserRecord {
    username: String,
    password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    created_at: DateTime<Utc>,
}

/// Users kept in a JSON file, passwords stored as Argon2 PHC strings.
///
/// The whole file is rewritten on every registration.
#[derive(Debug)]
pub struct FileAuthProvider {
    path: PathBuf,
    users: Mutex<BTreeMap<String, UserRecord>>,
}

impl FileAuthProvider {
    /// Loads users from `path`. A missing file means no users yet.
    pub fn open(path: impl Into<PathBuf>) -> AuthResult<Self> {
        let path = path.into();

        let users = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => {
                let list: Vec<UserRecord> =
                    serde_json::from_slice(&bytes).map_err(AuthError::Corrupt)?;
                list.into_iter()
                    .map(|user| (user.username.clone(), user))
                    .collect()
            }
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(AuthError::Io { path, source }),
        };

        tracing::debug!(users = users.len(), "user store loaded");

        Ok(Self {
            path,
            users: Mutex::new(users),
        })
    }

    /// Registers a principal with an optional contact e-mail.
    pub fn register_with_email(
        &self,
        principal_id: &str,
        credential: &str,
        email: Option<&str>,
    ) -> AuthResult<()> {
        let username = principal_id.trim();
        if username.is_empty() {
            return Err(AuthError::InvalidInput("username cannot be empty".into()));
        }
        if credential.is_empty() {
            return Err(AuthError::InvalidInput("password cannot be empty".into()));
        }

        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        if users.contains_key(username) {
            return Err(AuthError::AlreadyExists(username.to_owned()));
        }

        let record = UserRecord {
            username: username.to_owned(),
            password_hash: hash_password(credential)?,
            email: email
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_owned),
            created_at: Utc::now(),
        };
        users.insert(record.username.clone(), record);

        if let Err(e) = self.save(&users) {
            // Keep memory and disk in agreement: a user that was not saved does not exist
            users.remove(username);
            return Err(e);
        }

        tracing::info!(username, "user registered");
        Ok(())
    }

    pub fn user_count(&self) -> usize {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn save(&self, users: &BTreeMap<String, UserRecord>) -> AuthResult<()> {
        let io_error = |source: std::io::Error| AuthError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(io_error)?;

        let list: Vec<&UserRecord> = users.values().collect();
        let json = serde_json::to_vec_pretty(&list).map_err(AuthError::Corrupt)?;

        let mut incoming = tempfile::NamedTempFile::new_in(dir).map_err(io_error)?;
        incoming.write_all(&json).map_err(io_error)?;
        incoming.as_file().sync_all().map_err(io_error)?;
        incoming.persist(&self.path).map_err(|e| io_error(e.error))?;

        Ok(())
    }
}

impl AuthenticationProvider for FileAuthProvider {
    fn register(&self, principal_id: &str, credential: &str) -> AuthResult<()> {
        self.register_with_email(principal_id, credential, None)
    }

    fn authenticate(&self, principal_id: &str, credential: &str) -> AuthResult<PrincipalId> {
        let username = principal_id.trim();
        let users = self.users.lock().unwrap_or_else(PoisonError::into_inner);

        let user = users.get(username).ok_or(AuthError::InvalidCredential)?;
        if !verify_password(credential, &user.password_hash)? {
            tracing::debug!(username, "credential rejected");
            return Err(AuthError::InvalidCredential);
        }

        Ok(user.username.clone())
    }
}

fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

fn verify_password(password: &str, stored: &str) -> AuthResult<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
