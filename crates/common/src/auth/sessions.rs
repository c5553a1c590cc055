//! Server-side session storage
//!
//! The cookie only carries a random id; the `Session` value lives in the
//! `sessions` table. Every successful load slides the expiry forward.

use super::Session;
use crate::db::Repository;
use crate::errors::{AppError, Result};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct SessionStore {
    repo: Repository,
    ttl: chrono::Duration,
}

impl SessionStore {
    pub fn new(repo: Repository, ttl: std::time::Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(1));
        Self { repo, ttl }
    }

    /// Lifetime applied on creation and on every load
    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Persist a session and return the id to hand to the browser
    pub async fn create(&self, session: &Session) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let state = serde_json::to_value(session).map_err(|e| AppError::Internal {
            message: format!("Failed to serialize session: {}", e),
        })?;

        let purged = self.repo.delete_expired_sessions().await?;
        if purged > 0 {
            debug!(purged, "Expired sessions removed");
        }

        self.repo.create_session(&id, state, self.ttl).await?;
        debug!(role = session.role.as_str(), user_id = session.user_id, "Session created");
        Ok(id)
    }

    /// Resolve a session id, renewing it when live
    pub async fn load(&self, id: &str) -> Result<Option<Session>> {
        let Some(record) = self.repo.find_session(id).await? else {
            return Ok(None);
        };

        if record.is_expired() {
            debug!("Session expired");
            self.repo.delete_session(id).await?;
            return Ok(None);
        }

        let session: Session = match serde_json::from_value(record.state.clone()) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Discarding unreadable session");
                self.repo.delete_session(id).await?;
                return Ok(None);
            }
        };

        self.repo.renew_session(record, self.ttl).await?;
        Ok(Some(session))
    }

    /// Remove the session if there is one
    pub async fn destroy(&self, id: Option<&str>) -> Result<()> {
        if let Some(id) = id {
            self.repo.delete_session(id).await?;
        }
        Ok(())
    }
}
