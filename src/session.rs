use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::Credentials;
use crate::document::{DocumentId, UploadedDocument};
use crate::llm::Retriever;

/// The last indexed document and the retriever built for it.
///
/// Both slots change together; a new document identity replaces the pair.
#[derive(Default)]
pub struct SessionCache {
    cached_document: Option<DocumentId>,
    cached_retriever: Option<Arc<dyn Retriever>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity comparison only; the bytes are never looked at.
    pub fn matches(&self, document: &UploadedDocument) -> bool {
        self.cached_document == Some(document.id())
    }

    pub fn replace(&mut self, document: &UploadedDocument, retriever: Arc<dyn Retriever>) {
        self.cached_document = Some(document.id());
        self.cached_retriever = Some(retriever);
    }

    pub fn current(&self) -> Option<Arc<dyn Retriever>> {
        self.cached_retriever.clone()
    }

    pub fn cached_document(&self) -> Option<DocumentId> {
        self.cached_document
    }
}

/// Everything the web form remembers between submits of one browser.
#[derive(Default)]
pub struct WebSession {
    pub cache: SessionCache,
    /// The uploader keeps the last chosen file until another one is picked.
    pub upload: Option<UploadedDocument>,
    /// Keys from earlier submits; never rendered back into the page.
    pub credentials: Credentials,
}

struct SessionEntry {
    session: Arc<Mutex<WebSession>>,
    last_active: DateTime<Utc>,
}

/// Session caches keyed by the session cookie.
///
/// Locking a session's mutex for the whole submit keeps one submit per
/// session in flight; different sessions proceed independently. Sessions
/// idle for longer than `idle_timeout` are dropped on the next lookup.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Looks up a live session without creating one.
    pub async fn get(&self, session_id: Option<&str>) -> Option<Arc<Mutex<WebSession>>> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        self.prune(&mut sessions, now);

        let entry = sessions.get_mut(session_id?)?;
        entry.last_active = now;
        Some(entry.session.clone())
    }

    /// Returns the session for `session_id`, creating one (with a fresh id)
    /// when the id is missing, unknown or expired.
    pub async fn get_or_create(&self, session_id: Option<&str>) -> (String, Arc<Mutex<WebSession>>) {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        self.prune(&mut sessions, now);

        if let Some(id) = session_id {
            if let Some(entry) = sessions.get_mut(id) {
                entry.last_active = now;
                return (id.to_string(), entry.session.clone());
            }
        }

        let id = Uuid::new_v4().to_string();
        let session = Arc::new(Mutex::new(WebSession::default()));
        sessions.insert(
            id.clone(),
            SessionEntry {
                session: session.clone(),
                last_active: now,
            },
        );
        log::debug!("Started session {}", id);
        (id, session)
    }

    /// Drops sessions idle at `now`; returns how many were removed.
    pub async fn prune_idle_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        self.prune(&mut sessions, now)
    }

    fn prune(&self, sessions: &mut HashMap<String, SessionEntry>, now: DateTime<Utc>) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| now - entry.last_active <= self.idle_timeout);
        let removed = before - sessions.len();
        if removed > 0 {
            log::info!("Dropped {} idle sessions", removed);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
