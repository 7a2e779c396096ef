//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{Config, NotifyBackend};
use crate::accounts::validation::{check_email, check_username};
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("pagination.page_size must be greater than zero")]
    ZeroPageSize,
    #[error("pagination.max_page_size ({max}) must be >= pagination.page_size ({default})")]
    MaxPageSizeTooSmall { default: u32, max: u32 },
    #[error("members.bot_account is required")]
    MissingBotAccount,
    #[error("members.bot_email: {0}")]
    InvalidBotEmail(&'static str),
    #[error("sanctions.sweep_interval_secs must be greater than zero")]
    ZeroSweepInterval,
    #[error("auth.token_ttl_secs must be greater than zero")]
    ZeroTokenTtl,
    #[error("notify.path is required for the outbox backend")]
    OutboxPathMissing,
    #[error("notify.url is required for the webhook backend")]
    WebhookUrlMissing,
    #[error("staff block '{username}': {reason}")]
    InvalidStaffBlock { username: String, reason: String },
    #[error("staff block '{0}' names the bot account")]
    StaffIsBotAccount(String),
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.trim().is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    let pagination = &config.pagination;
    if pagination.page_size == 0 {
        errors.push(ValidationError::ZeroPageSize);
    }
    if pagination.max_page_size < pagination.page_size {
        errors.push(ValidationError::MaxPageSizeTooSmall {
            default: pagination.page_size,
            max: pagination.max_page_size,
        });
    }

    if config.members.bot_account.trim().is_empty() {
        errors.push(ValidationError::MissingBotAccount);
    }
    if let Some(email) = config.members.bot_email.as_deref()
        && let Err(reason) = check_email(email, &config.members)
    {
        errors.push(ValidationError::InvalidBotEmail(reason));
    }
    if config.sanctions.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroSweepInterval);
    }
    if config.auth.token_ttl_secs == 0 {
        errors.push(ValidationError::ZeroTokenTtl);
    }

    match config.notify.backend {
        NotifyBackend::Outbox if config.notify.path.is_none() => {
            errors.push(ValidationError::OutboxPathMissing);
        }
        NotifyBackend::Webhook if config.notify.url.is_none() => {
            errors.push(ValidationError::WebhookUrlMissing);
        }
        _ => {}
    }

    for staff in &config.staff {
        if let Err(reason) = check_username(&staff.username, config.members.username_max_length) {
            errors.push(ValidationError::InvalidStaffBlock {
                username: staff.username.clone(),
                reason: reason.to_string(),
            });
        }
        if staff.password.is_empty() {
            errors.push(ValidationError::InvalidStaffBlock {
                username: staff.username.clone(),
                reason: "password is empty".to_string(),
            });
        }
        if config.members.is_bot_account(&staff.username) {
            errors.push(ValidationError::StaffIsBotAccount(staff.username.clone()));
        }
    }

    if config.database.path != ":memory:" {
        let db_path = Path::new(&config.database.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::DatabasePathInvalid(
                config.database.path.clone(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
