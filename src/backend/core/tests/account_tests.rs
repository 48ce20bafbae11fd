//! Account lifecycle flows: registration, lockout, and the audit trail they
//! leave behind.

use std::sync::Arc;
use warden_core::audit::ClientInfo;
use warden_core::config::SecurityConfig;
use warden_core::prelude::*;

fn harness() -> (AccountService, Arc<IdentityStore>, Arc<MemorySink>) {
    let identities = Arc::new(IdentityStore::with_seed_roles());
    let sink = Arc::new(MemorySink::new());
    let audit = AuditLogger::spawn(sink.clone(), 64);
    let service = AccountService::new(identities.clone(), audit, SecurityConfig::default());
    (service, identities, sink)
}

#[tokio::test]
async fn test_full_account_lifecycle() {
    let (service, identities, _) = harness();

    let user = service
        .register("alice", "alice@example.com", "ValidPass1!")
        .unwrap();
    assert!(user.active);
    assert_eq!(user.failed_logins, 0);

    // Stored hash is Argon2, never the plaintext.
    let stored = identities.get_user(&user.id).unwrap();
    assert!(stored.password_hash.starts_with("$argon2"));
    assert_ne!(stored.password_hash, "ValidPass1!");

    let logged_in = service
        .login("alice", "ValidPass1!", ClientInfo::default())
        .unwrap();
    assert!(logged_in.last_login.is_some());

    service
        .change_password(&user.id, "ValidPass1!", "NextPass2@")
        .unwrap();
    assert!(service
        .login("alice", "ValidPass1!", ClientInfo::default())
        .is_err());
    service
        .login("alice", "NextPass2@", ClientInfo::default())
        .unwrap();
}

#[tokio::test]
async fn test_lockout_window_end_to_end() {
    let (service, identities, _) = harness();
    let user = service
        .register("alice", "alice@example.com", "ValidPass1!")
        .unwrap();

    for attempt in 1..=5 {
        let err = service
            .login("alice", "WrongPass1!", ClientInfo::default())
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_CREDENTIALS", "attempt {attempt}");
    }

    // Locked: correct credentials are refused with the remaining cooldown.
    let err = service
        .login("alice", "ValidPass1!", ClientInfo::default())
        .unwrap_err();
    assert_eq!(err.code(), "ACCOUNT_LOCKED");
    match err {
        WardenError::AccountLocked { retry_after_secs } => {
            assert!(retry_after_secs > 0);
            assert!(retry_after_secs <= 900);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Administrative reset unlocks immediately.
    service.reset_password(&user.id, "FreshPass3#").unwrap();
    service
        .login("alice", "FreshPass3#", ClientInfo::default())
        .unwrap();
    assert_eq!(identities.get_user(&user.id).unwrap().failed_logins, 0);
}

#[tokio::test]
async fn test_concurrent_failures_all_count() {
    let (service, identities, _) = harness();
    let user = service
        .register("alice", "alice@example.com", "ValidPass1!")
        .unwrap();

    // Five racing wrong-password attempts, exactly the lockout threshold.
    // Every increment must land; a lost update would leave the counter
    // short and the account unlocked.
    std::thread::scope(|scope| {
        for _ in 0..5 {
            let svc = service.clone();
            scope.spawn(move || {
                let err = svc
                    .login("alice", "WrongPass1!", ClientInfo::default())
                    .unwrap_err();
                assert_eq!(err.code(), "INVALID_CREDENTIALS");
            });
        }
    });

    let record = identities.get_user(&user.id).unwrap();
    assert_eq!(record.failed_logins, 5);
    assert!(record.locked_until.is_some());

    let err = service
        .login("alice", "ValidPass1!", ClientInfo::default())
        .unwrap_err();
    assert_eq!(err.code(), "ACCOUNT_LOCKED");
}

#[tokio::test]
async fn test_password_policy_messages() {
    let (service, _, _) = harness();

    let cases = [
        ("short1!", "at least 8"),
        ("alllowercase1!", "uppercase"),
        ("ALLUPPERCASE1!", "lowercase"),
        ("NoDigitsHere!", "digit"),
        ("NoSymbolsHere1", "symbol"),
    ];
    for (password, expected) in cases {
        let err = service
            .register("alice", "alice@example.com", password)
            .unwrap_err();
        assert_eq!(err.code(), "POLICY_VIOLATION");
        assert!(
            err.to_string().contains(expected),
            "{password}: {err}"
        );
        // The attempted password never appears in the message.
        assert!(!err.to_string().contains(password));
    }

    service
        .register("alice", "alice@example.com", "ValidPass1!")
        .unwrap();
}

#[tokio::test]
async fn test_sensitive_operations_are_audited() {
    let (service, _, sink) = harness();

    let user = service
        .register("alice", "alice@example.com", "ValidPass1!")
        .unwrap();
    service
        .login("alice", "ValidPass1!", ClientInfo::default())
        .unwrap();
    service.reset_password(&user.id, "FreshPass2@").unwrap();

    let entries = sink.entries();
    assert_eq!(entries.len(), 3);

    assert_eq!(entries[0].access_type, AccessType::Admin);
    assert_eq!(entries[0].query.as_deref(), Some("register"));

    assert_eq!(entries[1].access_type, AccessType::Login);
    assert_eq!(entries[1].user_id, Some(user.id));

    assert_eq!(entries[2].query.as_deref(), Some("reset password"));
}

#[tokio::test]
async fn test_client_attribution_recorded() {
    let (service, _, sink) = harness();
    service
        .register("alice", "alice@example.com", "ValidPass1!")
        .unwrap();

    let client = ClientInfo {
        ip: Some("203.0.113.7".into()),
        user_agent: Some("warden-cli/1.0".into()),
    };
    service.login("alice", "ValidPass1!", client).unwrap();

    let login = sink
        .entries()
        .into_iter()
        .find(|e| e.access_type == AccessType::Login)
        .unwrap();
    assert_eq!(login.client.ip.as_deref(), Some("203.0.113.7"));
    assert_eq!(login.client.user_agent.as_deref(), Some("warden-cli/1.0"));
}
