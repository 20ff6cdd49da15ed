use std::collections::{HashMap, hash_map::Entry};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::frontend::ConnectionHandle;
use crate::shared_types::ConnectionId;

// -----------------------------------------------------------------------------
// ----- Session ---------------------------------------------------------------

/// Registry entry for one user id. The connection is a back-reference only:
/// closing the socket is up to the task that accepted it.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: u64,
    pub connection: ConnectionHandle,
    pub authenticated: bool,
}

/// What `SessionRegistry::register` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// No entry existed; one was created for this connection.
    Created,

    /// An entry existed but was not authenticated; it now points here.
    Rebound,

    /// An authenticated entry already exists. Nothing changed.
    AlreadyLoggedIn,
}

// -----------------------------------------------------------------------------
// ----- SessionRegistry -------------------------------------------------------

/// Process-wide user id -> session table.
///
/// One mutex guards the whole map, so every operation is atomic with respect
/// to every other. The lock is never held across an await.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<u64, Session>>,
}

// -----------------------------------------------------------------------------
// ----- SessionRegistry: Public -----------------------------------------------

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, user_id: u64, connection: &ConnectionHandle) -> Registration {
        let mut sessions = self.sessions.lock();

        match sessions.entry(user_id) {
            Entry::Vacant(slot) => {
                slot.insert(Session {
                    user_id,
                    connection: connection.clone(),
                    authenticated: true,
                });
                Registration::Created
            }

            Entry::Occupied(slot) if slot.get().authenticated => Registration::AlreadyLoggedIn,

            Entry::Occupied(mut slot) => {
                let session = slot.get_mut();
                session.connection = connection.clone();
                session.authenticated = true;
                Registration::Rebound
            }
        }
    }

    /// Connection of an authenticated session, if any.
    pub fn lookup(&self, user_id: u64) -> Option<ConnectionHandle> {
        let sessions = self.sessions.lock();
        sessions
            .get(&user_id)
            .filter(|s| s.authenticated)
            .map(|s| s.connection.clone())
    }

    #[cfg(test)]
    pub fn get(&self, user_id: u64) -> Option<Session> {
        self.sessions.lock().get(&user_id).cloned()
    }

    /// Mark the session unauthenticated, but only while it is still bound to
    /// `connection_id`. Returns whether anything changed.
    pub fn release(&self, user_id: u64, connection_id: ConnectionId) -> bool {
        let mut sessions = self.sessions.lock();

        let Some(session) = sessions.get_mut(&user_id) else {
            return false;
        };

        if session.connection.id() != connection_id || !session.authenticated {
            return false;
        }

        session.authenticated = false;
        debug!("session for user {user_id} released by connection {connection_id}");
        true
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    #[cfg(test)]
    pub fn authenticated_count(&self) -> usize {
        self.sessions
            .lock()
            .values()
            .filter(|s| s.authenticated)
            .count()
    }
}

// -----------------------------------------------------------------------------
// ----- SessionLease ----------------------------------------------------------

/// Ties a registry binding to the lifetime of the connection that made it.
/// Dropping the lease releases the session, whichever way the connection ended.
#[derive(Debug)]
pub struct SessionLease {
    registry: Arc<SessionRegistry>,
    user_id: u64,
    connection_id: ConnectionId,
}

impl SessionLease {
    pub fn new(registry: Arc<SessionRegistry>, user_id: u64, connection_id: ConnectionId) -> Self {
        Self {
            registry,
            user_id,
            connection_id,
        }
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.registry.release(self.user_id, self.connection_id);
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
