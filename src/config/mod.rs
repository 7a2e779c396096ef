//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, DatabaseConfig)
//! - [`members`]: Member registry tuning (MembersConfig, PaginationConfig, SanctionsConfig, AuthConfig)
//! - [`notify`]: Notification backend selection (NotifyConfig)
//! - [`staff`]: Staff account provisioning blocks (StaffBlock)
//! - [`validation`]: Startup validation

mod defaults;
mod members;
mod notify;
mod staff;
mod types;
pub mod validation;

pub use members::{AuthConfig, MembersConfig, PaginationConfig};
pub use notify::{NotifyBackend, NotifyConfig};
pub use staff::StaffBlock;
pub use types::Config;
