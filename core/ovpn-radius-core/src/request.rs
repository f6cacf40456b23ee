//! RADIUS request payloads in radclient's `Name=Value,Name=Value` form.

use rand::Rng;
use std::fmt;

use crate::config::ServerInfo;
use crate::store::SessionRecord;

/// Accounting session ids are drawn from `[0, ACCT_SESSION_ID_RANGE)`.
pub const ACCT_SESSION_ID_RANGE: u32 = 9999;

/// Correlates the Start and Interim-Update of one accounting session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcctSessionId(pub u32);

impl AcctSessionId {
    pub fn random() -> Self {
        AcctSessionId(rand::thread_rng().gen_range(0..ACCT_SESSION_ID_RANGE))
    }
}

impl fmt::Display for AcctSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcctStatus {
    Start,
    InterimUpdate,
    Stop,
}

impl AcctStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcctStatus::Start => "Start",
            AcctStatus::InterimUpdate => "Interim-Update",
            AcctStatus::Stop => "Stop",
        }
    }
}

pub struct AuthRequest<'a> {
    pub server_info: &'a ServerInfo,
    pub username: &'a str,
    pub password: &'a str,
}

impl fmt::Display for AuthRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Response-Packet-Type=Access-Accept,\
             NAS-Identifier={},\
             NAS-Port-Type={},\
             NAS-IP-Address={},\
             Service-Type={},\
             User-Name='{}',\
             User-Password='{}',\
             Framed-Protocol=PPP,\
             Message-Authenticator=0x00",
            self.server_info.identifier,
            self.server_info.port_type,
            self.server_info.ip_address,
            self.server_info.service_type,
            escape_quoted(self.username),
            escape_quoted(self.password),
        )
    }
}

pub struct AcctRequest<'a> {
    pub server_info: &'a ServerInfo,
    pub status: AcctStatus,
    pub session_id: AcctSessionId,
    pub record: &'a SessionRecord,
}

impl fmt::Display for AcctRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(class_tag) = &self.record.class_tag {
            write!(f, "Class={class_tag},")?;
        }
        write!(
            f,
            "Acct-Session-Id={},\
             Acct-Status-Type={},\
             User-Name='{}',\
             Calling-Station-Id={},\
             NAS-Identifier={},\
             Framed-IP-Address={}",
            self.session_id,
            self.status.as_str(),
            escape_quoted(&self.record.principal),
            self.server_info.ip_address,
            self.server_info.identifier,
            self.record.endpoint.as_deref().unwrap_or_default(),
        )?;
        if self.status == AcctStatus::Stop {
            f.write_str(",Acct-Terminate-Cause=User-Request")?;
        }
        Ok(())
    }
}

fn escape_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
