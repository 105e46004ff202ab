use std::time::Duration;

use chrono::Utc;
use photos_db::{Database, Result, timestamp};
use photos_types::models::{Session, SessionData};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Issues and resolves login sessions.
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    ttl: chrono::Duration,
}

impl SessionManager {
    pub fn new(db: Database, ttl: chrono::Duration) -> Self {
        Self { db, ttl }
    }

    pub async fn create(&self, username: &str) -> Result<Session> {
        let now = timestamp::truncate(Utc::now());
        let session = Session {
            id: Uuid::now_v7(),
            data: SessionData {
                username: username.to_string(),
            },
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.db.insert_session(&session).await?;
        Ok(session)
    }

    /// `Ok(None)` covers both unknown and expired sessions.
    pub async fn lookup(&self, id: Uuid) -> Result<Option<Session>> {
        let Some(session) = self.db.session_by_id(id).await? else {
            return Ok(None);
        };
        if session.is_expired_at(Utc::now()) {
            debug!(session = %id, "session expired");
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Resolve the raw cookie value. Values that are not session ids are
    /// treated as unknown.
    pub async fn lookup_token(&self, token: &str) -> Result<Option<Session>> {
        match token.parse::<Uuid>() {
            Ok(id) => self.lookup(id).await,
            Err(_) => Ok(None),
        }
    }

    pub async fn invalidate(&self, id: Uuid) -> Result<bool> {
        self.db.delete_session(id).await
    }

    pub async fn purge_expired(&self) -> Result<usize> {
        self.db.delete_expired_sessions(Utc::now()).await
    }

    /// Background loop that deletes expired sessions.
    pub async fn run_sweeper(self, interval: Duration) {
        let mut interval = tokio::time::interval(interval);

        loop {
            interval.tick().await;

            match self.purge_expired().await {
                Ok(count) => {
                    if count > 0 {
                        info!("Session sweep: removed {} expired sessions", count);
                    }
                }
                Err(e) => {
                    warn!("Session sweep error: {}", e);
                }
            }
        }
    }
}
