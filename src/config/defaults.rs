//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

// =============================================================================
// Database Defaults
// =============================================================================

pub fn default_database_path() -> String {
    "sanctiond.db".to_string()
}

// =============================================================================
// Member Defaults
// =============================================================================

pub fn default_bot_account() -> String {
    "admin".to_string()
}

/// Disposable-address providers refused at registration.
pub fn default_forbidden_email_domains() -> Vec<String> {
    [
        "yopmail.com",
        "yopmail.fr",
        "jetable.org",
        "mailinator.com",
        "guerrillamail.com",
        "10minutemail.com",
        "trashmail.com",
    ]
    .iter()
    .map(|d| d.to_string())
    .collect()
}

pub fn default_registration_token_ttl_hours() -> u64 {
    24
}

pub fn default_username_max_length() -> usize {
    30
}

// =============================================================================
// Pagination Defaults
// =============================================================================

pub fn default_page_size() -> u32 {
    10
}

pub fn default_max_page_size() -> u32 {
    20
}

// =============================================================================
// Sanction / Auth Defaults
// =============================================================================

pub fn default_sweep_interval_secs() -> u64 {
    60
}

pub fn default_token_ttl_secs() -> u64 {
    36_000
}

// =============================================================================
// Notification Defaults
// =============================================================================

pub fn default_webhook_timeout_secs() -> u64 {
    10
}
