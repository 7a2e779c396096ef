//! Username and email checks shared by registration, profile updates and
//! configuration validation.

use crate::config::MembersConfig;
use crate::error::BLANK;
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .expect("email pattern compiles")
});

/// Check a username's shape. Uniqueness is checked against the database.
pub fn check_username(username: &str, max_length: usize) -> Result<(), &'static str> {
    if username.is_empty() {
        return Err(BLANK);
    }
    if username.trim() != username {
        return Err("Username cannot start or end with whitespace.");
    }
    if username.contains(',') {
        // Comma separates usernames in multi-recipient fields.
        return Err("Username cannot contain a comma.");
    }
    if username.chars().count() > max_length {
        return Err("Username is too long.");
    }
    Ok(())
}

/// Check an email's syntax and domain.
pub fn check_email(email: &str, members: &MembersConfig) -> Result<(), &'static str> {
    if email.is_empty() {
        return Err(BLANK);
    }
    if !EMAIL_RE.is_match(email) {
        return Err("Enter a valid email address.");
    }
    if members.is_forbidden_email(email) {
        return Err("This email provider is not allowed.");
    }
    Ok(())
}
