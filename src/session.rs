//! Per-session identity and role.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use serde::Serialize;
use uuid::Uuid;

use crate::db::{Database, StoreResult};

/// What the logged-in employee is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    /// Has at least one direct report.
    Manager,
    Employee,
}

/// Identity of a logged-in user, fixed at login for the life of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub employee_id: i64,
    pub name: String,
    pub role: Role,
}

impl SessionContext {
    /// Resolve an employee and derive their role.
    ///
    /// Returns `None` when no employee has this id. The role is computed once
    /// here; gaining or losing reports later does not change it.
    pub fn login(db: &Database, employee_id: i64) -> StoreResult<Option<Self>> {
        let Some(employee) = db.get_employee_by_id(employee_id)? else {
            return Ok(None);
        };

        let reports = db.get_employees_by_manager(employee.id)?;
        let role = if reports.is_empty() {
            Role::Employee
        } else {
            Role::Manager
        };

        Ok(Some(Self {
            employee_id: employee.id,
            name: employee.name,
            role,
        }))
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }
}

/// How long a session stays valid without a request.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(8 * 60 * 60);

#[derive(Debug)]
struct Entry {
    context: SessionContext,
    last_seen: Instant,
}

/// In-memory registry of live sessions keyed by an opaque token.
///
/// Nothing is persisted: restarting the server logs everyone out. A session
/// idle for longer than the store's TTL is dropped the next time the store is
/// touched.
#[derive(Clone, Debug)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, Entry>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Register a session and return its token.
    pub fn insert(&self, context: SessionContext) -> Uuid {
        let token = Uuid::new_v4();
        let now = Instant::now();
        let mut sessions = self.sessions.lock().expect("session store lock poisoned");
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.ttl);
        sessions.insert(
            token,
            Entry {
                context,
                last_seen: now,
            },
        );
        token
    }

    /// The live session for `token`. Each hit extends the session's life.
    pub fn get(&self, token: &Uuid) -> Option<SessionContext> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().expect("session store lock poisoned");
        if now.duration_since(sessions.get(token)?.last_seen) >= self.ttl {
            sessions.remove(token);
            return None;
        }
        let entry = sessions.get_mut(token)?;
        entry.last_seen = now;
        Some(entry.context.clone())
    }

    pub fn remove(&self, token: &Uuid) -> Option<SessionContext> {
        let mut sessions = self.sessions.lock().expect("session store lock poisoned");
        sessions.remove(token).map(|entry| entry.context)
    }

    /// Number of sessions held, expired ones included until the next insert.
    pub fn live_count(&self) -> usize {
        self.sessions.lock().expect("session store lock poisoned").len()
    }
}
