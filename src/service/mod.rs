//! Credential and second-factor orchestration.
//!
//! [`CredentialService`] is stateless: every operation is a single-shot call
//! that reads and writes through the injected collaborators. There is no
//! mutual exclusion across concurrent calls for the same user; the
//! directory's last-write-wins merge is the only consistency guarantee,
//! except backup-code consumption, which the directory applies atomically.

use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;

use crate::audit::{AuditEvent, AuditSink, IpResolver, SecurityEventType};
use crate::config::ServiceConfig;
use crate::directory::{
    BackupCode, PasswordChangeKind, PasswordHistoryEntry, SecurityPatch, TwoFactorSetup,
    TwoFactorSetupRecord, UserDirectory, UserRecord,
};
use crate::error::SecurityError;
use crate::identity::{IdentityError, IdentityProvider};
use crate::security::{password, totp};

/// Request-scoped caller metadata, recorded with audit events.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
}

/// Stateless credential and second-factor manager.
pub struct CredentialService {
    directory: Arc<dyn UserDirectory>,
    identity: Arc<dyn IdentityProvider>,
    audit: Arc<dyn AuditSink>,
    ip: Arc<dyn IpResolver>,
    config: ServiceConfig,
}

impl CredentialService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        identity: Arc<dyn IdentityProvider>,
        audit: Arc<dyn AuditSink>,
        ip: Arc<dyn IpResolver>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            directory,
            identity,
            audit,
            ip,
            config,
        }
    }

    /// Change the signed-in user's password.
    ///
    /// Checks run in a fixed order: session, strength, confirmation match,
    /// second-factor requirement, second-factor code, re-authentication.
    /// The first failing check aborts before any mutation. Once the
    /// credential is committed, the record update is still fatal on failure,
    /// but audit logging and the forced sign-out are best-effort.
    pub fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
        two_factor_code: Option<&str>,
        client: &ClientInfo,
    ) -> Result<(), SecurityError> {
        let user = self
            .identity
            .current_user()
            .ok_or(SecurityError::NotAuthenticated)?;
        debug!("Password change requested for user {}", user.id);

        let strength = password::evaluate(new_password);
        if !strength.is_strong() {
            return Err(SecurityError::WeakPassword(strength.feedback.join(", ")));
        }

        if new_password != confirm_password {
            return Err(SecurityError::PasswordMismatch);
        }

        let record = self.directory.get(&user.id)?;
        if record.security.two_factor_enabled {
            let code = two_factor_code.ok_or(SecurityError::TwoFactorRequired)?;
            if !self.check_second_factor(&record, code)? {
                return Err(SecurityError::InvalidTwoFactorCode);
            }
        }

        match self.identity.reauthenticate(&user.email, current_password) {
            Ok(()) => {}
            Err(IdentityError::InvalidCredentials) => {
                return Err(SecurityError::WrongCurrentPassword)
            }
            Err(err) => return Err(err.into()),
        }

        self.identity.update_credential(new_password)?;

        let now = Utc::now();
        let ip = self.ip.resolve();
        self.directory.apply(
            &user.id,
            SecurityPatch {
                password_changed_at: Some(now),
                must_change_password: Some(false),
                push_history: Some(PasswordHistoryEntry {
                    timestamp: now,
                    ip: ip.clone(),
                    kind: PasswordChangeKind::PasswordChange,
                }),
                ..Default::default()
            },
        )?;

        self.record_audit(
            SecurityEventType::PasswordChanged,
            &user.id,
            ip,
            client,
            None,
        );
        self.force_sign_out();

        info!("Password changed for user {}", user.id);
        Ok(())
    }

    /// Replace an administrator-issued temporary password.
    ///
    /// Skips re-authentication (the temporary-credential holder is trusted
    /// by virtue of the live session) and refuses to run for users who have
    /// already completed onboarding.
    pub fn change_temporary_password(
        &self,
        new_password: &str,
        confirm_password: &str,
        client: &ClientInfo,
    ) -> Result<(), SecurityError> {
        let user = self
            .identity
            .current_user()
            .ok_or(SecurityError::NotAuthenticated)?;
        debug!("Temporary password change requested for user {}", user.id);

        let record = self.directory.get(&user.id)?;
        if !record.security.must_change_password {
            return Err(SecurityError::NotATemporaryPassword);
        }

        let strength = password::evaluate(new_password);
        if !strength.is_strong() {
            return Err(SecurityError::WeakPassword(strength.feedback.join(", ")));
        }

        if new_password != confirm_password {
            return Err(SecurityError::PasswordMismatch);
        }

        self.identity.update_credential(new_password)?;

        let now = Utc::now();
        let ip = self.ip.resolve();
        self.directory.apply(
            &user.id,
            SecurityPatch {
                password_changed_at: Some(now),
                must_change_password: Some(false),
                push_history: Some(PasswordHistoryEntry {
                    timestamp: now,
                    ip: ip.clone(),
                    kind: PasswordChangeKind::TemporaryPasswordChange,
                }),
                ..Default::default()
            },
        )?;

        self.record_audit(
            SecurityEventType::TemporaryPasswordChanged,
            &user.id,
            ip,
            client,
            None,
        );
        self.force_sign_out();

        info!("Temporary password replaced for user {}", user.id);
        Ok(())
    }

    /// Start a second-factor enrollment.
    ///
    /// Generates a fresh secret and backup codes and persists them as a
    /// pending setup, overwriting any prior pending enrollment. Does not
    /// enable the second factor. This is the only time the secret and codes
    /// are returned in plaintext.
    pub fn setup_two_factor(&self, user_id: &str) -> Result<TwoFactorSetup, SecurityError> {
        let record = self.directory.get(user_id)?;

        let secret = totp::generate_secret();
        let codes = totp::generate_backup_codes();
        let qr_code = totp::provisioning_uri(&self.config.issuer, &record.email, &secret);

        self.directory.apply(
            user_id,
            SecurityPatch {
                two_factor_setup: Some(Some(TwoFactorSetupRecord {
                    secret: secret.clone(),
                    backup_codes: codes.iter().cloned().map(BackupCode::new).collect(),
                    setup_at: Utc::now(),
                    activated: false,
                })),
                ..Default::default()
            },
        )?;

        info!("Second-factor setup generated for user {}", user_id);
        Ok(TwoFactorSetup {
            secret,
            qr_code,
            backup_codes: codes,
        })
    }

    /// Complete a pending enrollment by proving possession of the secret.
    pub fn enable_two_factor(
        &self,
        user_id: &str,
        code: &str,
        client: &ClientInfo,
    ) -> Result<(), SecurityError> {
        let record = self.directory.get(user_id)?;
        let mut setup = record
            .security
            .two_factor_setup
            .ok_or(SecurityError::SetupNotStarted)?;

        if !totp::verify(&setup.secret, code) {
            return Err(SecurityError::InvalidTwoFactorCode);
        }

        setup.activated = true;
        self.directory.apply(
            user_id,
            SecurityPatch {
                two_factor_enabled: Some(true),
                two_factor_setup: Some(Some(setup)),
                two_factor_activated_at: Some(Utc::now()),
                ..Default::default()
            },
        )?;

        let ip = self.ip.resolve();
        self.record_audit(SecurityEventType::TwoFactorEnabled, user_id, ip, client, None);

        info!("Second factor enabled for user {}", user_id);
        Ok(())
    }

    /// Turn the second factor off again.
    ///
    /// Requires a live session, the account password, and a valid code
    /// (time-based or unused backup). Clears the stored setup entirely, so a
    /// later enable must start from a fresh enrollment.
    pub fn disable_two_factor(
        &self,
        user_id: &str,
        account_password: &str,
        code: &str,
        client: &ClientInfo,
    ) -> Result<(), SecurityError> {
        let user = self
            .identity
            .current_user()
            .ok_or(SecurityError::NotAuthenticated)?;

        match self.identity.reauthenticate(&user.email, account_password) {
            Ok(()) => {}
            Err(IdentityError::InvalidCredentials) => return Err(SecurityError::WrongPassword),
            Err(err) => return Err(err.into()),
        }

        let record = self.directory.get(user_id)?;
        if !self.check_second_factor(&record, code)? {
            return Err(SecurityError::InvalidTwoFactorCode);
        }

        self.directory.apply(
            user_id,
            SecurityPatch {
                two_factor_enabled: Some(false),
                two_factor_setup: Some(None),
                two_factor_disabled_at: Some(Utc::now()),
                ..Default::default()
            },
        )?;

        let ip = self.ip.resolve();
        self.record_audit(
            SecurityEventType::TwoFactorDisabled,
            user_id,
            ip,
            client,
            None,
        );

        info!("Second factor disabled for user {}", user_id);
        Ok(())
    }

    /// Verify a second-factor code for a user.
    ///
    /// Trivially succeeds when the second factor is not enabled. Otherwise
    /// an unused backup code is consumed first; failing that, the code is
    /// checked against the time-based algorithm.
    pub fn verify_two_factor_code(
        &self,
        user_id: &str,
        code: &str,
    ) -> Result<bool, SecurityError> {
        let record = self.directory.get(user_id)?;
        self.check_second_factor(&record, code)
    }

    fn check_second_factor(
        &self,
        record: &UserRecord,
        code: &str,
    ) -> Result<bool, SecurityError> {
        if !record.security.two_factor_enabled {
            return Ok(true);
        }

        if self.directory.consume_backup_code(&record.id, code)? {
            debug!("Backup code accepted for user {}", record.id);
            return Ok(true);
        }

        let secret = match &record.security.two_factor_setup {
            Some(setup) => &setup.secret,
            // Enabled without a stored secret is an inconsistent record;
            // nothing can verify against it
            None => return Ok(false),
        };

        Ok(totp::verify(secret, code))
    }

    fn record_audit(
        &self,
        event_type: SecurityEventType,
        user_id: &str,
        ip: String,
        client: &ClientInfo,
        details: Option<String>,
    ) {
        let event = AuditEvent::new(event_type, user_id, ip, client.user_agent.clone(), details);
        if let Err(err) = self.audit.append(&event) {
            warn!(
                "Failed to append {} audit event for user {}: {:#}",
                event_type.as_str(),
                user_id,
                err
            );
        }
    }

    fn force_sign_out(&self) {
        if let Err(err) = self.identity.sign_out() {
            warn!("Forced sign-out failed after committed change: {}", err);
        }
    }
}
