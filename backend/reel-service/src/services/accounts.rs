use std::sync::Arc;

use crypto_core::JwtKeys;
use serde::Serialize;
use tracing::{info, warn};

use super::email::CodeMailer;
use super::otp::{OtpPurpose, OtpService};
use crate::domain::{normalize_email, NewUser, User};
use crate::error::{AppError, AppResult};
use crate::logging::mask_email;
use crate::repository::UserDirectory;
use crate::security::{hash_password, validate_password, verify_password};

/// Issued bearer token with the signed-in user
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Registration, sign-in and password management
#[derive(Clone)]
pub struct AccountService {
    directory: Arc<dyn UserDirectory>,
    otp: OtpService,
    mailer: Arc<dyn CodeMailer>,
    jwt: Arc<JwtKeys>,
}

fn require_email(email: &str) -> AppResult<String> {
    let email = normalize_email(email);
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AppError::Validation("A valid email is required".into())),
    }
}

/// Display name for accounts created through code login
fn default_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

impl AccountService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        otp: OtpService,
        mailer: Arc<dyn CodeMailer>,
        jwt: Arc<JwtKeys>,
    ) -> Self {
        Self {
            directory,
            otp,
            mailer,
            jwt,
        }
    }

    fn session_for(&self, user: User) -> AppResult<Session> {
        let token = self
            .jwt
            .generate_access_token(&user.email)
            .map_err(|e| AppError::Internal(format!("Failed to issue token: {e}")))?;
        Ok(Session { token, user })
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> AppResult<User> {
        let email = require_email(email)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Name is required".into()));
        }
        let password_hash = hash_password(password)?;

        let user = self
            .directory
            .create_user(NewUser {
                email,
                name: name.to_string(),
                password_hash: Some(password_hash),
            })
            .await?;
        info!(email = %mask_email(&user.email), "account created");
        Ok(user)
    }

    pub async fn password_login(&self, email: &str, password: &str) -> AppResult<Session> {
        let email = normalize_email(email);
        let invalid = || AppError::Auth("Invalid email or password".into());

        let user = self.directory.find_user(&email).await?.ok_or_else(invalid)?;
        // Accounts created through code login have no password yet
        let hash = user.password_hash.as_deref().ok_or_else(invalid)?;
        verify_password(password, hash)?;

        self.session_for(user)
    }

    pub async fn change_password(&self, email: &str, new_password: &str) -> AppResult<()> {
        let password_hash = hash_password(new_password)?;
        self.directory.set_password_hash(email, &password_hash).await?;
        info!(email = %mask_email(email), "password changed");
        Ok(())
    }

    pub async fn send_login_code(&self, email: &str) -> AppResult<()> {
        let email = require_email(email)?;
        let code = self.otp.issue(OtpPurpose::Login, &email).await?;
        self.mailer.send_code(&email, OtpPurpose::Login, &code).await
    }

    /// Consume a login code; first-time emails get an account on the spot
    pub async fn verify_login_code(&self, email: &str, code: &str) -> AppResult<Session> {
        let email = require_email(email)?;
        self.otp.verify(OtpPurpose::Login, &email, code).await?;

        let user = match self.directory.find_user(&email).await? {
            Some(user) => user,
            None => {
                let created = self
                    .directory
                    .create_user(NewUser {
                        email: email.clone(),
                        name: default_name(&email),
                        password_hash: None,
                    })
                    .await;
                match created {
                    Ok(user) => {
                        info!(email = %mask_email(&email), "account created from code login");
                        user
                    }
                    // Lost a race with a concurrent first login
                    Err(AppError::EmailTaken) => self
                        .directory
                        .find_user(&email)
                        .await?
                        .ok_or_else(|| AppError::Internal("User vanished after creation".into()))?,
                    Err(e) => return Err(e),
                }
            }
        };

        self.session_for(user)
    }

    pub async fn send_reset_code(&self, email: &str) -> AppResult<()> {
        let email = require_email(email)?;
        if self.directory.find_user(&email).await?.is_none() {
            warn!(email = %mask_email(&email), "reset requested for unknown email");
            return Err(AppError::NotFound("No account with that email".into()));
        }
        let code = self.otp.issue(OtpPurpose::Reset, &email).await?;
        self.mailer.send_code(&email, OtpPurpose::Reset, &code).await
    }

    /// The new password is checked before the code is consumed, so a weak
    /// password does not burn the code.
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let email = require_email(email)?;
        validate_password(new_password)?;
        self.otp.verify(OtpPurpose::Reset, &email, code).await?;

        let password_hash = hash_password(new_password)?;
        self.directory.set_password_hash(&email, &password_hash).await?;
        info!(email = %mask_email(&email), "password reset");
        Ok(())
    }
}
