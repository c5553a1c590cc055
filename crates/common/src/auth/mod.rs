//! Authentication and authorization utilities
//!
//! Provides:
//! - Student login by natural key and administrator login by email/password
//! - Argon2 password hashing
//! - The explicit `Session` value and role checks over it
//! - Server-side session storage with sliding expiry

mod sessions;

pub use sessions::SessionStore;

use crate::db::models::{Account, Student};
use crate::db::Repository;
use crate::errors::{AppError, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Role carried by an authenticated session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

/// Role-specific identity details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Identity {
    Student {
        serial_no: i32,
        roll_no: String,
        name: String,
    },
    Admin {
        email: String,
    },
}

/// Authenticated session value passed explicitly to every operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub role: Role,

    /// Student record id or account id, depending on role
    pub user_id: i32,

    pub identity: Identity,
}

impl Session {
    pub fn student(student: &Student) -> Self {
        Self {
            role: Role::Student,
            user_id: student.id,
            identity: Identity::Student {
                serial_no: student.serial_no,
                roll_no: student.roll_no.clone(),
                name: student.name.clone(),
            },
        }
    }

    pub fn admin(account: &Account) -> Self {
        Self {
            role: Role::Admin,
            user_id: account.id,
            identity: Identity::Admin {
                email: account.email.clone(),
            },
        }
    }

    /// Name shown in page headers
    pub fn display_name(&self) -> &str {
        match &self.identity {
            Identity::Student { name, .. } => name,
            Identity::Admin { email } => email,
        }
    }
}

/// Check that a session exists and carries the wanted role
pub fn require_role(session: Option<&Session>, role: Role) -> Result<&Session> {
    match session {
        Some(session) if session.role == role => Ok(session),
        Some(_) => Err(AppError::unauthorized(format!(
            "{} access required",
            role.as_str()
        ))),
        None => Err(AppError::unauthorized("Login required")),
    }
}

/// Hash a password into an Argon2 PHC string with a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal {
            message: format!("Failed to hash password: {}", e),
        })
}

/// Verify a password against a stored PHC string
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

/// Login checks against the record store
#[derive(Clone)]
pub struct IdentityGate {
    repo: Repository,
}

impl IdentityGate {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Authenticate a student by serial and roll number
    pub async fn authenticate_student(&self, serial_no: &str, roll_no: &str) -> Result<Session> {
        let serial_no = serial_no.trim();
        let roll_no = roll_no.trim();

        if serial_no.is_empty() || roll_no.is_empty() {
            return Err(AppError::Validation {
                message: "Please provide both serial number and roll number".to_string(),
                field: None,
            });
        }

        let serial_no: i32 = serial_no
            .parse()
            .map_err(|_| AppError::validation("serial_no", "Serial number must be a number"))?;

        let student = self
            .repo
            .find_student_by_natural_key(serial_no, roll_no)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        info!(student_id = student.id, "Student logged in");
        Ok(Session::student(&student))
    }

    /// Authenticate an administrator by email and password
    pub async fn authenticate_admin(&self, email: &str, password: &str) -> Result<Session> {
        let email = email.trim();

        if email.is_empty() || password.is_empty() {
            return Err(AppError::Validation {
                message: "Please provide both email and password".to_string(),
                field: None,
            });
        }

        let account = self
            .repo
            .find_account_by_email(email)
            .await?
            .filter(|account| verify_password(password, &account.password_hash))
            .ok_or(AppError::InvalidCredentials)?;

        if !account.is_admin {
            return Err(AppError::InsufficientPrivilege);
        }

        info!(account_id = account.id, "Administrator logged in");
        Ok(Session::admin(&account))
    }

    /// Create the configured administrator unless an account with that email exists
    pub async fn ensure_default_admin(&self, email: &str, password: &str) -> Result<()> {
        if self.repo.find_account_by_email(email).await?.is_some() {
            return Ok(());
        }

        let hash = hash_password(password)?;
        self.repo.create_account(email, hash, true).await?;
        info!(email, "Seeded default administrator");
        Ok(())
    }
}
