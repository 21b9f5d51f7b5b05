use calclub_core::{PartialProfile, SearchProfile};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::SessionError;

/// Floor for background sweep periods; `interval` rejects zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// One conversation's accumulated search intent.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub session_id: String,
    pub profile: SearchProfile,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

struct SessionEntry {
    session: Session,
    touched: Instant,
}

impl SessionEntry {
    fn new(session_id: &str) -> Self {
        let now = Utc::now();
        Self {
            session: Session {
                session_id: session_id.to_string(),
                profile: SearchProfile::default(),
                created_at: now,
                last_active_at: now,
            },
            touched: Instant::now(),
        }
    }

    fn is_idle(&self, timeout: Duration) -> bool {
        self.touched.elapsed() >= timeout
    }

    fn touch(&mut self) {
        self.session.last_active_at = Utc::now();
        self.touched = Instant::now();
    }
}

/// In-memory session store. Each session id is locked independently.
pub struct SessionManager {
    sessions: DashMap<String, SessionEntry>,
    idle_timeout: Duration,
}

impl SessionManager {
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        info!("SessionManager initialized (idle timeout {idle_timeout:?})");
        Self {
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    /// Start a session with an empty profile, replacing any prior session
    /// under the same id.
    pub fn create(&self, session_id: &str) -> Session {
        let entry = SessionEntry::new(session_id);
        let session = entry.session.clone();
        if self.sessions.insert(session_id.to_string(), entry).is_some() {
            info!("Replaced session: {session_id}");
        } else {
            info!("Created session: {session_id}");
        }
        session
    }

    /// Look up a session without refreshing its activity. Idle sessions are
    /// pruned here and reported as not found.
    pub fn get(&self, session_id: &str) -> Result<Session, SessionError> {
        let found = self.sessions.get(session_id).map(|entry| {
            if entry.is_idle(self.idle_timeout) {
                None
            } else {
                Some(entry.session.clone())
            }
        });

        match found {
            Some(Some(session)) => Self::checked(session_id, session),
            Some(None) => {
                self.prune(session_id);
                Err(SessionError::NotFound(session_id.to_string()))
            }
            None => Err(SessionError::NotFound(session_id.to_string())),
        }
    }

    /// Fold one turn's profile fragment into the session.
    ///
    /// Categories and keywords are unioned, a supplied time window replaces
    /// the old one wholesale, and scalars are last-write-wins. The session
    /// must already exist.
    pub fn merge(&self, session_id: &str, partial: PartialProfile) -> Result<Session, SessionError> {
        let merged = self.sessions.get_mut(session_id).and_then(|mut entry| {
            if entry.is_idle(self.idle_timeout) {
                return None;
            }
            entry.session.profile.apply(partial);
            entry.touch();
            Some(entry.session.clone())
        });

        match merged {
            Some(session) => {
                debug!("Merged turn into session {session_id}");
                Self::checked(session_id, session)
            }
            None => {
                self.prune(session_id);
                Err(SessionError::NotFound(session_id.to_string()))
            }
        }
    }

    /// Live sessions, ordered by id.
    #[must_use]
    pub fn list(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|entry| !entry.is_idle(self.idle_timeout))
            .map(|entry| entry.session.clone())
            .collect();
        sessions.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        sessions
    }

    /// Drop a session. Returns whether it existed.
    pub fn remove(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        if removed {
            info!("Removed session: {session_id}");
        }
        removed
    }

    /// Prune every idle session, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let timeout = self.idle_timeout;
        let mut removed = 0;
        self.sessions.retain(|id, entry| {
            let idle = entry.is_idle(timeout);
            if idle {
                debug!("Pruned idle session: {id}");
                removed += 1;
            }
            !idle
        });
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Periodically prune idle sessions until the handle is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every.max(MIN_SWEEP_INTERVAL));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.sweep();
                if removed > 0 {
                    info!("Session sweep pruned {removed} idle sessions");
                }
            }
        })
    }

    fn prune(&self, session_id: &str) {
        let timeout = self.idle_timeout;
        if self
            .sessions
            .remove_if(session_id, |_, entry| entry.is_idle(timeout))
            .is_some()
        {
            debug!("Pruned idle session: {session_id}");
        }
    }

    fn checked(session_id: &str, session: Session) -> Result<Session, SessionError> {
        if session.session_id == session_id {
            Ok(session)
        } else {
            Err(SessionError::Invariant(format!(
                "session stored under {session_id} carries id {}",
                session.session_id
            )))
        }
    }
}
