//! Durable session records shared by every hook invocation.
//!
//! ```text
//! auth  → create   (one row per authenticated connection)
//! acct  → update   (sets endpoint), then read for Interim-Update
//! stop  → delete   (only after the server acknowledged Stop)
//! ```

mod db;
mod lock;

pub use db::SessionStore;
pub use lock::{StoreLock, StoreLockGuard};

use chrono::Utc;

/// Persisted state for one OpenVPN connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Session key, see [`crate::identity::SessionKey`]. Never changes.
    pub key: String,
    /// Authenticated RADIUS user name.
    pub principal: String,
    /// Tunnel address, set at accounting start.
    pub endpoint: Option<String>,
    /// RADIUS Class attribute from Access-Accept, echoed in accounting.
    pub class_tag: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl SessionRecord {
    pub fn new(key: impl Into<String>, principal: impl Into<String>, class_tag: Option<String>) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            key: key.into(),
            principal: principal.into(),
            endpoint: None,
            class_tag,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
