//! # ovpn-radius-core
//!
//! Session bookkeeping for an OpenVPN server that delegates authentication
//! and accounting to RADIUS.
//!
//! OpenVPN runs a fresh hook process for each connection event:
//!
//! - `auth-user-pass-verify` → [`SessionLifecycle::authenticate`]
//! - `client-connect` → [`SessionLifecycle::accounting_start`]
//! - `client-disconnect` → [`SessionLifecycle::accounting_stop`]
//!
//! The processes share nothing but the environment OpenVPN sets, the
//! SQLite-backed [`SessionStore`], and the RADIUS server.
//!
//! ## Design Principles
//!
//! - **Synchronous**: one sequential flow per process, no async runtime.
//! - **One key per connection**: [`SessionKey`] is derived from the client's
//!   untrusted address/port in every phase.
//! - **No cache**: every phase reads the store; writers serialize on a file lock.

pub mod config;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod request;
pub mod response;
pub mod store;
pub mod transport;

pub use config::Config;
pub use credentials::Credentials;
pub use error::{RadiusError, Result};
pub use identity::{IdentityContext, SessionKey};
pub use lifecycle::{AuthOutcome, SessionLifecycle, SessionState};
pub use request::{AcctSessionId, AcctStatus};
pub use response::{interpret_acct_response, interpret_auth_response, AcctVerdict, AuthVerdict};
pub use store::{SessionRecord, SessionStore, StoreLock};
pub use transport::{AaaTransport, Radclient, RequestKind};
