//! Member registry, pagination, sanction and auth configuration.

use serde::Deserialize;

use super::defaults::{
    default_bot_account, default_forbidden_email_domains, default_max_page_size,
    default_page_size, default_registration_token_ttl_hours, default_sweep_interval_secs,
    default_token_ttl_secs, default_username_max_length,
};

/// Member registry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MembersConfig {
    /// Username of the system account. It can never be sanctioned.
    #[serde(default = "default_bot_account")]
    pub bot_account: String,
    /// When set, the system account is created at startup with this address.
    #[serde(default)]
    pub bot_email: Option<String>,
    /// Email domains refused at registration and on profile update.
    /// A listed domain also covers its subdomains.
    #[serde(default = "default_forbidden_email_domains")]
    pub forbidden_email_domains: Vec<String>,
    /// Lifetime of an email confirmation token.
    #[serde(default = "default_registration_token_ttl_hours")]
    pub registration_token_ttl_hours: u64,
    /// Maximum username length in characters.
    #[serde(default = "default_username_max_length")]
    pub username_max_length: usize,
}

impl Default for MembersConfig {
    fn default() -> Self {
        Self {
            bot_account: default_bot_account(),
            bot_email: None,
            forbidden_email_domains: default_forbidden_email_domains(),
            registration_token_ttl_hours: default_registration_token_ttl_hours(),
            username_max_length: default_username_max_length(),
        }
    }
}

impl MembersConfig {
    /// Whether `username` names the protected system account.
    pub fn is_bot_account(&self, username: &str) -> bool {
        self.bot_account.eq_ignore_ascii_case(username)
    }

    /// Whether the domain part of `email` is on the forbidden list.
    pub fn is_forbidden_email(&self, email: &str) -> bool {
        let Some((_, domain)) = email.rsplit_once('@') else {
            return false;
        };
        let domain = domain.to_ascii_lowercase();
        self.forbidden_email_domains.iter().any(|forbidden| {
            let forbidden = forbidden.to_ascii_lowercase();
            domain == forbidden || domain.ends_with(&format!(".{forbidden}"))
        })
    }
}

/// Member listing pagination.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    /// Page size used when the client does not ask for one.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Upper bound for a client-supplied `page_size`.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl PaginationConfig {
    /// Resolve the effective page size from an optional client override.
    ///
    /// Non-positive overrides fall back to the default; large ones are clamped.
    pub fn effective_page_size(&self, requested: Option<i64>) -> u32 {
        match requested {
            Some(n) if n > 0 => n.min(i64::from(self.max_page_size)) as u32,
            _ => self.page_size,
        }
    }
}

/// Sanction expiry sweep configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SanctionsConfig {
    /// Seconds between two expiry sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SanctionsConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Access token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Lifetime of a bearer token issued by the password grant.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_account_match_ignores_case() {
        let config = MembersConfig {
            bot_account: "Clem".to_string(),
            ..MembersConfig::default()
        };
        assert!(config.is_bot_account("clem"));
        assert!(config.is_bot_account("CLEM"));
        assert!(!config.is_bot_account("clement"));
    }

    #[test]
    fn forbidden_domain_matches_exact_and_subdomains() {
        let config = MembersConfig::default();
        assert!(config.is_forbidden_email("clem@yopmail.com"));
        assert!(config.is_forbidden_email("clem@YOPMAIL.COM"));
        assert!(config.is_forbidden_email("clem@mx.yopmail.com"));
        assert!(!config.is_forbidden_email("clem@zestedesavoir.com"));
        assert!(!config.is_forbidden_email("clem@notyopmail.com"));
        assert!(!config.is_forbidden_email("no-at-sign"));
    }

    #[test]
    fn effective_page_size_defaults_and_clamps() {
        let config = PaginationConfig::default();
        assert_eq!(config.effective_page_size(None), 10);
        assert_eq!(config.effective_page_size(Some(0)), 10);
        assert_eq!(config.effective_page_size(Some(-3)), 10);
        assert_eq!(config.effective_page_size(Some(15)), 15);
        assert_eq!(config.effective_page_size(Some(21)), 20);
    }
}
