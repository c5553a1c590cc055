//! CampusDesk Common Library
//!
//! Shared code for the CampusDesk gateway including:
//! - Database models and repository patterns
//! - Authentication and server-side sessions
//! - Query classification, context assembly and the language model gateway
//! - Tabular import and document readers
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod auth;
pub mod chat;
pub mod config;
pub mod context;
pub mod db;
pub mod documents;
pub mod errors;
pub mod importer;
pub mod metrics;

// Re-export commonly used types
pub use auth::{IdentityGate, Role, Session, SessionStore};
pub use chat::ChatService;
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use importer::{ImportResult, Importer};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
