//! Session lifecycle across the three OpenVPN hooks.
//!
//! ## State Machine
//!
//! ```text
//! Unauthenticated   --authenticate-->      Authenticated      (record created)
//! Authenticated     --accounting_start-->  AccountingStarted  (endpoint set, Start + Interim-Update sent)
//! AccountingStarted --accounting_update--> AccountingStarted  (Interim-Update sent, record untouched)
//! AccountingStarted --accounting_stop-->   AccountingStopped  (Stop acknowledged, record deleted)
//! ```
//!
//! Each transition runs in its own process. The only state carried between
//! them is the store row, found again through the session key. Start is only
//! accepted from `Authenticated`; a repeated Start fails with
//! `InvalidTransition` and leaves the row alone. Stop is accepted from either
//! live state so a half-connected client can still be cleaned up.

use crate::config::Config;
use crate::credentials::Credentials;
use crate::error::{RadiusError, Result};
use crate::identity::{IdentityContext, SessionKey};
use crate::request::{AcctRequest, AcctSessionId, AcctStatus, AuthRequest};
use crate::response::{interpret_acct_response, interpret_auth_response, is_empty_response};
use crate::store::{SessionRecord, SessionStore};
use crate::transport::{AaaTransport, RequestKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    AccountingStarted,
    AccountingStopped,
}

impl SessionState {
    /// State implied by the stored row. A stopped session has no row, so it
    /// reads back as `Unauthenticated`.
    pub fn of(record: Option<&SessionRecord>) -> Self {
        match record {
            None => SessionState::Unauthenticated,
            Some(record) if record.endpoint.is_some() => SessionState::AccountingStarted,
            Some(_) => SessionState::Authenticated,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Authenticated => "authenticated",
            SessionState::AccountingStarted => "accounting_started",
            SessionState::AccountingStopped => "accounting_stopped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Access-Accept received and the session row was created.
    Recorded(SessionRecord),
    /// Access-Accept received; `AuthenticationOnly` skipped the store.
    AuthenticatedOnly { class_tag: Option<String> },
}

pub struct SessionLifecycle<'a, T: AaaTransport> {
    config: &'a Config,
    store: &'a SessionStore,
    transport: &'a T,
}

impl<'a, T: AaaTransport> SessionLifecycle<'a, T> {
    pub fn new(config: &'a Config, store: &'a SessionStore, transport: &'a T) -> Self {
        Self {
            config,
            store,
            transport,
        }
    }

    pub fn authenticate(
        &self,
        credentials: &Credentials,
        identity: &IdentityContext,
    ) -> Result<AuthOutcome> {
        if credentials.username.is_empty() || credentials.password.is_empty() {
            return Err(RadiusError::CredentialsInvalid);
        }

        let server = &self.config.radius.authentication;
        tracing::info!(
            server = %server.server,
            user = %credentials.username,
            "Authenticating user"
        );

        let payload = AuthRequest {
            server_info: &self.config.server_info,
            username: &credentials.username,
            password: &credentials.password,
        }
        .to_string();

        let output = self.transport.exchange(RequestKind::Auth, server, &payload)?;
        if is_empty_response(&output) {
            return Err(RadiusError::MalformedResponse(
                "no output received for Access-Request".to_string(),
            ));
        }

        let verdict = interpret_auth_response(&output);
        if !verdict.accepted {
            return Err(RadiusError::Rejected(credentials.username.clone()));
        }

        tracing::info!(
            user = %credentials.username,
            class = verdict.class_tag.as_deref().unwrap_or(""),
            "User authenticated"
        );

        if self.config.radius.authentication_only {
            tracing::debug!("AuthenticationOnly enabled; session not recorded");
            return Ok(AuthOutcome::AuthenticatedOnly {
                class_tag: verdict.class_tag,
            });
        }

        let key = identity.session_key()?;
        let record = self.store.create(&SessionRecord::new(
            key.as_str(),
            credentials.username.as_str(),
            verdict.class_tag,
        ))?;

        tracing::info!(key = %key, user = %record.principal, "Session recorded");
        Ok(AuthOutcome::Recorded(record))
    }

    /// Records the tunnel endpoint, sends Start and then one Interim-Update
    /// under the same accounting session id.
    pub fn accounting_start(
        &self,
        identity: &IdentityContext,
        session_id: AcctSessionId,
    ) -> Result<SessionRecord> {
        let endpoint = identity.endpoint()?.to_string();
        let key = identity.session_key()?;

        let mut record = self.store.get(key.as_str())?;
        let state = SessionState::of(Some(&record));
        if state != SessionState::Authenticated {
            return Err(RadiusError::InvalidTransition {
                key: key.to_string(),
                state: state.as_str(),
                action: "start accounting",
            });
        }
        tracing::info!(
            key = %key,
            endpoint = %endpoint,
            trusted_origin = identity.trusted_origin().as_deref().unwrap_or(""),
            "Recording session endpoint"
        );
        record.endpoint = Some(endpoint);
        let record = self.store.update(&record)?;

        self.send_accounting(AcctStatus::Start, session_id, &record)?;
        self.accounting_update(&key, session_id)?;
        Ok(record)
    }

    /// Sends an Interim-Update for an existing session. The record is not modified.
    pub fn accounting_update(&self, key: &SessionKey, session_id: AcctSessionId) -> Result<()> {
        let record = self.store.get(key.as_str())?;
        self.send_accounting(AcctStatus::InterimUpdate, session_id, &record)
    }

    /// Sends Stop and removes the record once the server acknowledged it.
    /// An unacknowledged Stop leaves the record in place.
    pub fn accounting_stop(
        &self,
        identity: &IdentityContext,
        session_id: AcctSessionId,
    ) -> Result<SessionState> {
        let key = identity.session_key()?;
        let record = self.store.get(key.as_str())?;

        self.send_accounting(AcctStatus::Stop, session_id, &record)?;

        self.store.delete(key.as_str())?;
        tracing::info!(key = %key, user = %record.principal, "Session removed");
        Ok(SessionState::AccountingStopped)
    }

    fn send_accounting(
        &self,
        status: AcctStatus,
        session_id: AcctSessionId,
        record: &SessionRecord,
    ) -> Result<()> {
        let server = &self.config.radius.accounting;
        tracing::info!(
            server = %server.server,
            status = status.as_str(),
            session_id = session_id.0,
            key = %record.key,
            "Sending accounting request"
        );

        let payload = AcctRequest {
            server_info: &self.config.server_info,
            status,
            session_id,
            record,
        }
        .to_string();

        let output = self.transport.exchange(RequestKind::Acct, server, &payload)?;
        if is_empty_response(&output) {
            return Err(RadiusError::MalformedResponse(format!(
                "no output received for {} request",
                status.as_str()
            )));
        }

        if !interpret_acct_response(&output).acknowledged {
            return Err(RadiusError::Unacknowledged {
                status: status.as_str(),
            });
        }

        tracing::info!(status = status.as_str(), "Accounting-Response received");
        Ok(())
    }
}
