//! Account lifecycle: registration, login with lockout, password changes.
//!
//! The lockout state machine lives here. Failed attempts are counted per
//! user under the store's shard lock, so concurrent failures cannot lose
//! increments. The lock engages on the attempt that reaches the configured
//! maximum and holds for the cooldown window; a successful login after the
//! window clears all failure state.

use chrono::{Duration, Utc};
use metrics::counter;
use std::sync::Arc;
use tracing::{info, warn};

use crate::audit::{AccessType, AuditEntry, AuditLogger, ClientInfo};
use crate::config::SecurityConfig;
use crate::error::{Result, WardenError};
use crate::rbac::models::{User, UserId};
use crate::rbac::store::IdentityStore;

use super::password::{hash_password, validate_password, verify_password};

/// Account operations over the identity store.
#[derive(Clone)]
pub struct AccountService {
    identities: Arc<IdentityStore>,
    audit: AuditLogger,
    config: SecurityConfig,
}

impl AccountService {
    pub fn new(
        identities: Arc<IdentityStore>,
        audit: AuditLogger,
        config: SecurityConfig,
    ) -> Self {
        Self {
            identities,
            audit,
            config,
        }
    }

    /// Register a new account. The password must satisfy the policy.
    pub fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User> {
        validate_password(password, &self.config.password)?;
        let hash = hash_password(password)?;
        let user = self.identities.create_user(username, email, hash)?;

        self.audit.record_sensitive(
            AuditEntry::new(username, AccessType::Admin, "users")
                .user(user.id)
                .query("register"),
        )?;
        info!(user_id = %user.id, username, "account registered");
        Ok(user)
    }

    /// Authenticate a username/password pair.
    ///
    /// Unknown usernames, deactivated accounts, and wrong passwords all
    /// return `InvalidCredentials`; only an active lock is reported
    /// distinctly, and then without the failure count.
    pub fn login(&self, username: &str, password: &str, client: ClientInfo) -> Result<User> {
        let now = Utc::now();
        let user = self
            .identities
            .find_by_username(username)
            .ok_or(WardenError::InvalidCredentials)?;

        if !user.active {
            counter!("warden_logins_total", "outcome" => "inactive").increment(1);
            return Err(WardenError::InvalidCredentials);
        }

        if let Some(until) = user.locked_until {
            if until > now {
                counter!("warden_logins_total", "outcome" => "locked").increment(1);
                let retry_after_secs = (until - now).num_seconds().max(0) as u64;
                return Err(WardenError::AccountLocked { retry_after_secs });
            }
        }

        if !verify_password(password, &user.password_hash)? {
            return self.record_failure(&user, username, now);
        }

        // Audit before mutating; a sensitive audit failure aborts the login.
        self.audit.record_sensitive(
            AuditEntry::new(username, AccessType::Login, "auth")
                .user(user.id)
                .client(client),
        )?;

        let user = self.identities.with_user_mut(&user.id, |u| {
            u.failed_logins = 0;
            u.locked_until = None;
            u.last_login = Some(now);
            u.modified_at = now;
            u.clone()
        })?;
        counter!("warden_logins_total", "outcome" => "success").increment(1);
        info!(user_id = %user.id, username, "login succeeded");
        Ok(user)
    }

    fn record_failure(
        &self,
        user: &User,
        username: &str,
        now: chrono::DateTime<Utc>,
    ) -> Result<User> {
        let max = self.config.lockout.max_failed_attempts;
        let cooldown = Duration::seconds(self.config.lockout.cooldown_secs as i64);

        let locked_now = self.identities.with_user_mut(&user.id, |u| {
            // An expired lock means the previous window is over.
            if u.locked_until.is_some_and(|t| t <= now) {
                u.locked_until = None;
                u.failed_logins = 0;
            }
            u.failed_logins += 1;
            u.modified_at = now;
            if u.failed_logins >= max {
                u.locked_until = Some(now + cooldown);
                true
            } else {
                false
            }
        })?;

        counter!("warden_logins_total", "outcome" => "failure").increment(1);
        // Failed attempts are best-effort; only the lock event is durable.
        self.audit.record_routine(
            AuditEntry::new(username, AccessType::Login, "auth")
                .user(user.id)
                .query("failed attempt"),
        );
        if locked_now {
            counter!("warden_lockouts_total").increment(1);
            warn!(user_id = %user.id, username, "account locked after repeated failures");
            self.audit.record_sensitive(
                AuditEntry::new(username, AccessType::Admin, "auth")
                    .user(user.id)
                    .query("account locked"),
            )?;
        }
        // The failing attempt itself reports a credential error; the lock
        // surfaces on the next attempt.
        Err(WardenError::InvalidCredentials)
    }

    /// Change a password, verifying the current one first.
    pub fn change_password(
        &self,
        user_id: &UserId,
        current: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self
            .identities
            .get_user(user_id)
            .ok_or(WardenError::InvalidCredentials)?;
        if !verify_password(current, &user.password_hash)? {
            return Err(WardenError::InvalidCredentials);
        }
        validate_password(new_password, &self.config.password)?;
        let hash = hash_password(new_password)?;

        self.identities.with_user_mut(user_id, |u| {
            u.password_hash = hash;
            u.modified_at = Utc::now();
        })?;
        self.audit.record_sensitive(
            AuditEntry::new(user.username, AccessType::Admin, "users")
                .user(*user_id)
                .query("change password"),
        )?;
        Ok(())
    }

    /// Administrative password reset. Clears all lockout state.
    pub fn reset_password(&self, user_id: &UserId, new_password: &str) -> Result<()> {
        validate_password(new_password, &self.config.password)?;
        let hash = hash_password(new_password)?;

        let username = self.identities.with_user_mut(user_id, |u| {
            u.password_hash = hash;
            u.failed_logins = 0;
            u.locked_until = None;
            u.modified_at = Utc::now();
            u.username.clone()
        })?;
        self.audit.record_sensitive(
            AuditEntry::new(username, AccessType::Admin, "users")
                .user(*user_id)
                .query("reset password"),
        )?;
        Ok(())
    }

    /// Mark a user's email address as verified.
    pub fn verify_email(&self, user_id: &UserId) -> Result<()> {
        self.identities.with_user_mut(user_id, |u| {
            u.email_verified = true;
            u.modified_at = Utc::now();
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemorySink;

    fn service() -> (AccountService, Arc<IdentityStore>, Arc<MemorySink>) {
        let identities = Arc::new(IdentityStore::with_seed_roles());
        let sink = Arc::new(MemorySink::new());
        let audit = AuditLogger::spawn(sink.clone(), 16);
        let service = AccountService::new(identities.clone(), audit, SecurityConfig::default());
        (service, identities, sink)
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let (service, _, sink) = service();
        let user = service
            .register("alice", "alice@example.com", "ValidPass1!")
            .unwrap();

        let logged_in = service
            .login("alice", "ValidPass1!", ClientInfo::default())
            .unwrap();
        assert_eq!(logged_in.id, user.id);
        assert!(logged_in.last_login.is_some());

        // Registration and login are both on the sensitive path.
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.entries()[1].access_type, AccessType::Login);
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password() {
        let (service, _, _) = service();
        let err = service
            .register("alice", "alice@example.com", "short1!")
            .unwrap_err();
        assert_eq!(err.code(), "POLICY_VIOLATION");
    }

    #[tokio::test]
    async fn test_unknown_user_and_wrong_password_look_alike() {
        let (service, _, _) = service();
        service
            .register("alice", "alice@example.com", "ValidPass1!")
            .unwrap();

        let unknown = service
            .login("nobody", "ValidPass1!", ClientInfo::default())
            .unwrap_err();
        let wrong = service
            .login("alice", "WrongPass1!", ClientInfo::default())
            .unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_lock_engages_on_fifth_failure() {
        let (service, identities, _) = service();
        let user = service
            .register("alice", "alice@example.com", "ValidPass1!")
            .unwrap();

        // Four failures: still just credential errors, no lock.
        for _ in 0..4 {
            let err = service
                .login("alice", "WrongPass1!", ClientInfo::default())
                .unwrap_err();
            assert_eq!(err.code(), "INVALID_CREDENTIALS");
        }
        assert!(identities.get_user(&user.id).unwrap().locked_until.is_none());

        // Fifth failure engages the lock.
        let err = service
            .login("alice", "WrongPass1!", ClientInfo::default())
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_CREDENTIALS");
        assert!(identities.get_user(&user.id).unwrap().locked_until.is_some());

        // Even the correct password is refused while locked.
        let err = service
            .login("alice", "ValidPass1!", ClientInfo::default())
            .unwrap_err();
        assert_eq!(err.code(), "ACCOUNT_LOCKED");
    }

    #[tokio::test]
    async fn test_expired_lock_allows_login_and_resets_state() {
        let (service, identities, _) = service();
        let user = service
            .register("alice", "alice@example.com", "ValidPass1!")
            .unwrap();

        for _ in 0..5 {
            let _ = service.login("alice", "WrongPass1!", ClientInfo::default());
        }
        // Rewind the lock so the cooldown has passed.
        identities
            .with_user_mut(&user.id, |u| {
                u.locked_until = Some(Utc::now() - Duration::seconds(1));
            })
            .unwrap();

        let logged_in = service
            .login("alice", "ValidPass1!", ClientInfo::default())
            .unwrap();
        assert_eq!(logged_in.failed_logins, 0);
        assert!(logged_in.locked_until.is_none());
    }

    #[tokio::test]
    async fn test_success_resets_failure_counter() {
        let (service, identities, _) = service();
        let user = service
            .register("alice", "alice@example.com", "ValidPass1!")
            .unwrap();

        for _ in 0..3 {
            let _ = service.login("alice", "WrongPass1!", ClientInfo::default());
        }
        service
            .login("alice", "ValidPass1!", ClientInfo::default())
            .unwrap();
        assert_eq!(identities.get_user(&user.id).unwrap().failed_logins, 0);

        // The window starts over: three more failures do not lock.
        for _ in 0..3 {
            let _ = service.login("alice", "WrongPass1!", ClientInfo::default());
        }
        assert!(identities.get_user(&user.id).unwrap().locked_until.is_none());
    }

    #[tokio::test]
    async fn test_failed_attempts_leave_a_trail() {
        let (service, _, sink) = service();
        let user = service
            .register("alice", "alice@example.com", "ValidPass1!")
            .unwrap();

        let _ = service.login("alice", "WrongPass1!", ClientInfo::default());
        let _ = service.login("alice", "WrongPass1!", ClientInfo::default());

        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            loop {
                let failures = sink
                    .entries()
                    .iter()
                    .filter(|e| e.query.as_deref() == Some("failed attempt"))
                    .count();
                if failures == 2 {
                    break;
                }
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("failure entries never drained");

        let entries = sink.entries();
        let failure = entries
            .iter()
            .find(|e| e.query.as_deref() == Some("failed attempt"))
            .unwrap();
        assert_eq!(failure.access_type, AccessType::Login);
        assert_eq!(failure.user_id, Some(user.id));
    }

    #[tokio::test]
    async fn test_reset_password_clears_lockout() {
        let (service, identities, _) = service();
        let user = service
            .register("alice", "alice@example.com", "ValidPass1!")
            .unwrap();
        for _ in 0..5 {
            let _ = service.login("alice", "WrongPass1!", ClientInfo::default());
        }
        assert!(identities.get_user(&user.id).unwrap().locked_until.is_some());

        service.reset_password(&user.id, "FreshPass2!").unwrap();
        let record = identities.get_user(&user.id).unwrap();
        assert_eq!(record.failed_logins, 0);
        assert!(record.locked_until.is_none());

        service
            .login("alice", "FreshPass2!", ClientInfo::default())
            .unwrap();
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let (service, _, _) = service();
        let user = service
            .register("alice", "alice@example.com", "ValidPass1!")
            .unwrap();

        let err = service
            .change_password(&user.id, "WrongPass1!", "FreshPass2!")
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_CREDENTIALS");

        service
            .change_password(&user.id, "ValidPass1!", "FreshPass2!")
            .unwrap();
        service
            .login("alice", "FreshPass2!", ClientInfo::default())
            .unwrap();
    }

    #[tokio::test]
    async fn test_deactivated_account_cannot_login() {
        let (service, identities, _) = service();
        let user = service
            .register("alice", "alice@example.com", "ValidPass1!")
            .unwrap();
        identities.deactivate_user(&user.id).unwrap();

        let err = service
            .login("alice", "ValidPass1!", ClientInfo::default())
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn test_email_verification_flag() {
        let (service, identities, _) = service();
        let user = service
            .register("alice", "alice@example.com", "ValidPass1!")
            .unwrap();
        assert!(!user.email_verified);

        service.verify_email(&user.id).unwrap();
        assert!(identities.get_user(&user.id).unwrap().email_verified);
    }
}
