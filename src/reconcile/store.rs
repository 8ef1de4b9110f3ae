//! In-memory upload-session store.
//!
//! Sessions are transient and bounded to one wizard run each, so a map
//! behind a `parking_lot::RwLock` is all the persistence they get. Locks are
//! held only for the duration of a closure; the route layer never holds one
//! across an await point.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::ApiError;
use crate::reconcile::session::UploadSession;

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, UploadSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh session and return a copy of its initial state.
    pub fn create(&self) -> UploadSession {
        let session = UploadSession::new();
        self.inner.write().insert(session.id, session.clone());
        session
    }

    /// Snapshot a session by id.
    pub fn get(&self, id: Uuid) -> Result<UploadSession, ApiError> {
        self.inner
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Upload session {id} not found")))
    }

    /// Run a mutation against a session and return whatever it yields.
    pub fn update<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut UploadSession) -> T,
    ) -> Result<T, ApiError> {
        let mut sessions = self.inner.write();
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| ApiError::NotFound(format!("Upload session {id} not found")))?;
        Ok(f(session))
    }

    /// Cancel a session, discarding its draft entirely.
    pub fn remove(&self, id: Uuid) -> Result<(), ApiError> {
        self.inner
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound(format!("Upload session {id} not found")))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }
}
