//! Username/password file written by OpenVPN's `auth-user-pass-verify ... via-file`.

use std::fmt;
use std::path::Path;

use crate::error::{RadiusError, Result};

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// Keep the password out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).map_err(|source| RadiusError::CredentialsRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// First line is the username, second the password. Both must be non-empty.
    pub fn parse(content: &str) -> Result<Self> {
        let mut lines = content.lines();
        let username = lines.next().unwrap_or_default();
        let password = lines.next().unwrap_or_default();

        if username.is_empty() || password.is_empty() {
            return Err(RadiusError::CredentialsInvalid);
        }

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}
