//! Interpretation of `radclient -x` output.
//!
//! Only three markers matter:
//!
//! ```text
//! Received Access-Accept Id 42 from 10.0.0.1:1812 to 0.0.0.0:0 length 44
//!     Class = 0x6f70657261746f72
//! Received Accounting-Response Id 7 from 10.0.0.1:1813 to 0.0.0.0:0 length 20
//! ```
//!
//! Anything else in the output is ignored. A missing marker is a verdict
//! (rejected / unacknowledged), not a transport failure.

const ACCESS_ACCEPT_MARKER: &str = "Received Access-Accept Id";
const ACCOUNTING_RESPONSE_MARKER: &str = "Received Accounting-Response Id";
const CLASS_MARKER: &str = "\tClass";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthVerdict {
    pub accepted: bool,
    /// Raw `0x…` token, kept only when it decodes to valid UTF-8.
    pub class_tag: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcctVerdict {
    pub acknowledged: bool,
}

/// True when the output carries no line with content at all.
pub fn is_empty_response(output: &str) -> bool {
    output.lines().all(|line| line.trim().is_empty())
}

pub fn interpret_auth_response(output: &str) -> AuthVerdict {
    let mut verdict = AuthVerdict::default();

    for line in output.lines() {
        if line.starts_with(ACCESS_ACCEPT_MARKER) {
            verdict.accepted = true;
        }

        if line.starts_with(CLASS_MARKER) {
            let Some((_, raw)) = line.split_once('=') else {
                tracing::warn!(line = %line, "Class attribute without value; ignoring");
                continue;
            };
            let token = raw.trim();
            match decode_class_token(token) {
                Ok(_) => verdict.class_tag = Some(token.to_string()),
                Err(reason) => {
                    tracing::warn!(token = %token, reason = %reason, "Discarding undecodable Class attribute");
                }
            }
        }
    }

    verdict
}

pub fn interpret_acct_response(output: &str) -> AcctVerdict {
    AcctVerdict {
        acknowledged: output
            .lines()
            .any(|line| line.starts_with(ACCOUNTING_RESPONSE_MARKER)),
    }
}

/// Decodes a `0x`-prefixed (or bare) hex token into UTF-8 text.
pub fn decode_class_token(token: &str) -> Result<String, String> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    let bytes = hex::decode(digits).map_err(|err| format!("invalid hex: {err}"))?;
    String::from_utf8(bytes).map_err(|err| format!("invalid UTF-8: {err}"))
}
