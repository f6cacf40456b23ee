//! Connection identity as exposed by OpenVPN through environment variables,
//! and the session key derived from it.
//!
//! OpenVPN hands each hook a different view of the same connection:
//!
//! ```text
//! untrusted_ip / untrusted_port   client-asserted origin, present in every phase
//! trusted_ip / trusted_port       post-handshake origin, not stable across phases
//! ifconfig_pool_remote_ip         tunnel address, only known from client-connect on
//! ```
//!
//! The session key is built from the untrusted pair only. Deriving it from the
//! trusted pair or the tunnel address makes accounting lookups miss the record
//! created at authentication.

use std::env;
use std::fmt;

use crate::error::{RadiusError, Result};

pub const ENV_UNTRUSTED_IP: &str = "untrusted_ip";
pub const ENV_UNTRUSTED_PORT: &str = "untrusted_port";
pub const ENV_TRUSTED_IP: &str = "trusted_ip";
pub const ENV_TRUSTED_PORT: &str = "trusted_port";
pub const ENV_POOL_REMOTE_IP: &str = "ifconfig_pool_remote_ip";

/// Identity signals for one hook invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityContext {
    pub untrusted_ip: Option<String>,
    pub untrusted_port: Option<String>,
    pub trusted_ip: Option<String>,
    pub trusted_port: Option<String>,
    pub pool_remote_ip: Option<String>,
}

impl IdentityContext {
    /// Reads the identity signals from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the identity signals through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| lookup(name).filter(|value| !value.is_empty());
        Self {
            untrusted_ip: read(ENV_UNTRUSTED_IP),
            untrusted_port: read(ENV_UNTRUSTED_PORT),
            trusted_ip: read(ENV_TRUSTED_IP),
            trusted_port: read(ENV_TRUSTED_PORT),
            pool_remote_ip: read(ENV_POOL_REMOTE_IP),
        }
    }

    /// Canonical session key for this connection.
    pub fn session_key(&self) -> Result<SessionKey> {
        SessionKey::derive(self)
    }

    /// Post-handshake origin, for log context only.
    pub fn trusted_origin(&self) -> Option<String> {
        match (&self.trusted_ip, &self.trusted_port) {
            (Some(ip), Some(port)) => Some(format!("{ip}:{port}")),
            _ => None,
        }
    }

    /// Tunnel address assigned by the server pool.
    pub fn endpoint(&self) -> Result<&str> {
        self.pool_remote_ip
            .as_deref()
            .ok_or(RadiusError::MissingEnvironment(ENV_POOL_REMOTE_IP))
    }
}

/// `"<untrusted_ip>:<untrusted_port>"`, taken verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn derive(identity: &IdentityContext) -> Result<Self> {
        let ip = identity
            .untrusted_ip
            .as_deref()
            .ok_or(RadiusError::MissingEnvironment(ENV_UNTRUSTED_IP))?;
        let port = identity
            .untrusted_port
            .as_deref()
            .ok_or(RadiusError::MissingEnvironment(ENV_UNTRUSTED_PORT))?;
        Ok(SessionKey(format!("{ip}:{port}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionKey {
    fn from(value: &str) -> Self {
        SessionKey(value.to_string())
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    /// auth-user-pass-verify: no tunnel address yet.
    fn auth_phase(ip: &str, port: &str) -> IdentityContext {
        IdentityContext::from_lookup(lookup_from(&[
            (ENV_UNTRUSTED_IP, ip),
            (ENV_UNTRUSTED_PORT, port),
        ]))
    }

    /// client-connect / client-disconnect: every signal populated.
    fn acct_phase(ip: &str, port: &str) -> IdentityContext {
        IdentityContext::from_lookup(lookup_from(&[
            (ENV_UNTRUSTED_IP, ip),
            (ENV_UNTRUSTED_PORT, port),
            (ENV_TRUSTED_IP, "192.168.1.12"),
            (ENV_TRUSTED_PORT, "1194"),
            (ENV_POOL_REMOTE_IP, "172.17.1.6"),
        ]))
    }

    #[test]
    fn key_is_identical_across_phases() {
        let origins = [
            ("192.168.1.50", "55606"),
            ("10.0.0.5", "4000"),
            ("2001:db8::1", "1"),
            ("203.0.113.9", "65535"),
        ];
        for (ip, port) in origins {
            let auth_key = auth_phase(ip, port).session_key().expect("auth key");
            let acct = acct_phase(ip, port);
            let acct_key = acct.session_key().expect("acct key");

            assert_eq!(auth_key, acct_key);
            assert_eq!(auth_key.as_str(), format!("{ip}:{port}"));
            assert_ne!(Some(acct_key.to_string()), acct.trusted_origin());
        }
    }

    #[test]
    fn key_ignores_tunnel_address() {
        let acct = acct_phase("10.0.0.5", "4000");
        let key = acct.session_key().expect("key");
        assert!(!key.as_str().contains("172.17.1.6"));
        assert_eq!(acct.endpoint().expect("endpoint"), "172.17.1.6");
    }

    #[test]
    fn missing_untrusted_port_is_reported() {
        let ctx = IdentityContext::from_lookup(lookup_from(&[(ENV_UNTRUSTED_IP, "10.0.0.5")]));
        let err = ctx.session_key().unwrap_err();
        assert!(matches!(
            err,
            RadiusError::MissingEnvironment(ENV_UNTRUSTED_PORT)
        ));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let ctx = IdentityContext::from_lookup(lookup_from(&[
            (ENV_UNTRUSTED_IP, ""),
            (ENV_UNTRUSTED_PORT, "4000"),
        ]));
        assert!(ctx.session_key().is_err());
        assert!(ctx.endpoint().is_err());
    }

    #[test]
    fn address_is_taken_verbatim() {
        let key = auth_phase("010.000.000.005", "04000")
            .session_key()
            .expect("key");
        assert_eq!(key.as_str(), "010.000.000.005:04000");
    }
}
