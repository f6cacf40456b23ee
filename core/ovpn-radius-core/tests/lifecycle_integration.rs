//! End-to-end lifecycle tests: each phase gets its own store handle and
//! identity context, the way separate hook processes would.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use ovpn_radius_core::config::RadiusServer;
use ovpn_radius_core::{
    AaaTransport, AcctSessionId, AuthOutcome, Config, Credentials, IdentityContext, RadiusError,
    RequestKind, SessionKey, SessionLifecycle, SessionStore,
};

/// Answers every request positively and records what was sent.
#[derive(Default)]
struct AcceptingServer {
    sent: RefCell<Vec<String>>,
}

impl AaaTransport for AcceptingServer {
    fn exchange(
        &self,
        kind: RequestKind,
        _server: &RadiusServer,
        payload: &str,
    ) -> ovpn_radius_core::Result<String> {
        self.sent.borrow_mut().push(payload.to_string());
        Ok(match kind {
            RequestKind::Auth => "Received Access-Accept Id 17 from 10.0.0.1:1812 to 0.0.0.0:0 length 38\n\
                 \tClass = 0x676f6c64\n"
                .to_string(),
            RequestKind::Acct => {
                "Received Accounting-Response Id 18 from 10.0.0.1:1813 to 0.0.0.0:0 length 20\n"
                    .to_string()
            }
        })
    }
}

fn config_for(dir: &Path) -> Config {
    let json = serde_json::json!({
        "LogFile": dir.join("plugin.log"),
        "ServerInfo": {
            "Identifier": "OpenVPN",
            "IpAddress": "192.168.1.12",
            "PortType": "5",
            "ServiceType": "5"
        },
        "Radius": {
            "AuthenticationOnly": false,
            "Authentication": { "Server": "10.0.0.1:1812", "Secret": "s3cr3t" },
            "Accounting": { "Server": "10.0.0.1:1813", "Secret": "s3cr3t" }
        },
        "Database": { "Path": dir.join("db").join("ovpn-radius.db"), "LockTimeoutSecs": 2 }
    });
    Config::from_json(&json.to_string()).expect("config")
}

fn env(pairs: &[(&str, &str)]) -> IdentityContext {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    IdentityContext::from_lookup(|name| map.get(name).cloned())
}

fn auth_env() -> IdentityContext {
    env(&[("untrusted_ip", "10.0.0.5"), ("untrusted_port", "4000")])
}

fn connect_env() -> IdentityContext {
    env(&[
        ("untrusted_ip", "10.0.0.5"),
        ("untrusted_port", "4000"),
        ("trusted_ip", "10.0.0.5"),
        ("trusted_port", "1194"),
        ("ifconfig_pool_remote_ip", "10.8.0.2"),
    ])
}

fn alice() -> Credentials {
    Credentials::parse("alice\nwonderland\n").expect("credentials")
}

#[test]
fn full_session_lifecycle() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = config_for(dir.path());
    let server = AcceptingServer::default();

    // auth-user-pass-verify
    {
        let store = SessionStore::open_with_config(&config).expect("open store");
        let outcome = SessionLifecycle::new(&config, &store, &server)
            .authenticate(&alice(), &auth_env())
            .expect("authenticate");
        let AuthOutcome::Recorded(record) = outcome else {
            panic!("expected a recorded session");
        };
        assert_eq!(record.key, "10.0.0.5:4000");
        assert_eq!(record.principal, "alice");
        assert_eq!(record.class_tag.as_deref(), Some("0x676f6c64"));
    }

    // client-connect
    {
        let store = SessionStore::open_with_config(&config).expect("open store");
        SessionLifecycle::new(&config, &store, &server)
            .accounting_start(&connect_env(), AcctSessionId(512))
            .expect("accounting start");
        let record = store.get("10.0.0.5:4000").expect("record after start");
        assert_eq!(record.endpoint.as_deref(), Some("10.8.0.2"));
    }

    // client-disconnect
    {
        let store = SessionStore::open_with_config(&config).expect("open store");
        SessionLifecycle::new(&config, &store, &server)
            .accounting_stop(&connect_env(), AcctSessionId(77))
            .expect("accounting stop");
        assert!(matches!(
            store.get("10.0.0.5:4000").unwrap_err(),
            RadiusError::NotFound(_)
        ));
    }

    let sent = server.sent.borrow();
    let statuses: Vec<&str> = sent
        .iter()
        .skip(1)
        .map(|payload| {
            payload
                .split(',')
                .find_map(|attr| attr.strip_prefix("Acct-Status-Type="))
                .expect("status attribute")
        })
        .collect();
    assert_eq!(statuses, vec!["Start", "Interim-Update", "Stop"]);
    assert!(sent[1].contains("Acct-Session-Id=512"));
    assert!(sent[2].contains("Acct-Session-Id=512"));
}

#[test]
fn stop_is_terminal() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = config_for(dir.path());
    let server = AcceptingServer::default();
    let store = SessionStore::open_with_config(&config).expect("open store");
    let lifecycle = SessionLifecycle::new(&config, &store, &server);

    lifecycle
        .authenticate(&alice(), &auth_env())
        .expect("authenticate");
    lifecycle
        .accounting_start(&connect_env(), AcctSessionId(1))
        .expect("start");
    lifecycle
        .accounting_stop(&connect_env(), AcctSessionId(2))
        .expect("first stop");

    let err = lifecycle
        .accounting_stop(&connect_env(), AcctSessionId(3))
        .unwrap_err();
    assert!(matches!(err, RadiusError::NotFound(key) if key == "10.0.0.5:4000"));
}

#[test]
fn accounting_without_authentication_is_not_found() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = config_for(dir.path());
    let server = AcceptingServer::default();
    let store = SessionStore::open_with_config(&config).expect("open store");
    let lifecycle = SessionLifecycle::new(&config, &store, &server);

    assert!(matches!(
        lifecycle
            .accounting_start(&connect_env(), AcctSessionId(1))
            .unwrap_err(),
        RadiusError::NotFound(_)
    ));
    assert!(matches!(
        lifecycle
            .accounting_update(&SessionKey::from("10.0.0.5:4000"), AcctSessionId(1))
            .unwrap_err(),
        RadiusError::NotFound(_)
    ));
    assert!(matches!(
        lifecycle
            .accounting_stop(&connect_env(), AcctSessionId(1))
            .unwrap_err(),
        RadiusError::NotFound(_)
    ));
    assert!(server.sent.borrow().is_empty());
}

#[test]
fn accounting_finds_session_despite_different_trusted_origin() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = config_for(dir.path());
    let server = AcceptingServer::default();
    let store = SessionStore::open_with_config(&config).expect("open store");
    let lifecycle = SessionLifecycle::new(&config, &store, &server);

    lifecycle
        .authenticate(
            &alice(),
            &env(&[("untrusted_ip", "192.168.1.50"), ("untrusted_port", "55606")]),
        )
        .expect("authenticate");

    let connect = env(&[
        ("untrusted_ip", "192.168.1.50"),
        ("untrusted_port", "55606"),
        ("trusted_ip", "192.168.1.12"),
        ("trusted_port", "1194"),
        ("ifconfig_pool_remote_ip", "172.17.1.6"),
    ]);
    lifecycle
        .accounting_start(&connect, AcctSessionId(10))
        .expect("start finds the authenticated session");

    let trusted = connect.trusted_origin().expect("trusted origin");
    assert!(matches!(
        store.get(&trusted).unwrap_err(),
        RadiusError::NotFound(_)
    ));
}
