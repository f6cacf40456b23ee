//! The AAA transport seam.
//!
//! Production traffic goes through FreeRADIUS' `radclient` binary: the
//! attribute string is written to its stdin and its verbose stdout is handed
//! back for interpretation. No timeout is imposed here; radclient applies its
//! own retry/timeout policy.
//!
//! radclient exits 1 on Access-Reject and on no reply. Its output still
//! carries the verdict, so a failed run that printed something is returned to
//! the interpreter; only a run with no output at all is a transport failure.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::config::RadiusServer;
use crate::error::{RadiusError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Auth,
    Acct,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Auth => "auth",
            RequestKind::Acct => "acct",
        }
    }
}

pub trait AaaTransport {
    /// Sends `payload` to `server` and returns the raw textual response.
    fn exchange(&self, kind: RequestKind, server: &RadiusServer, payload: &str) -> Result<String>;
}

/// Runs `radclient -x <server> <auth|acct> <secret>`.
#[derive(Debug, Clone)]
pub struct Radclient {
    path: PathBuf,
}

impl Radclient {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AaaTransport for Radclient {
    fn exchange(&self, kind: RequestKind, server: &RadiusServer, payload: &str) -> Result<String> {
        tracing::debug!(
            radclient = %self.path.display(),
            server = %server.server,
            kind = kind.as_str(),
            "Executing radclient"
        );

        let mut child = Command::new(&self.path)
            .args(["-x", &server.server, kind.as_str(), &server.secret])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                RadiusError::Transport(format!(
                    "failed to spawn {}: {}",
                    self.path.display(),
                    err
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(payload.as_bytes()) {
                Ok(()) => {}
                // radclient may exit before reading stdin; its output still decides.
                Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => {
                    tracing::debug!("radclient closed stdin early");
                }
                Err(err) => {
                    return Err(RadiusError::Transport(format!(
                        "failed to write request: {err}"
                    )))
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|err| RadiusError::Transport(format!("failed to wait for radclient: {err}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                status = %output.status,
                stderr = %stderr.trim(),
                "radclient exited unsuccessfully"
            );
            if stdout.trim().is_empty() {
                return Err(RadiusError::Transport(format!(
                    "radclient exited with {}",
                    output.status
                )));
            }
        }

        Ok(stdout)
    }
}
