//! Staff account provisioning blocks.

use serde::Deserialize;

/// A staff account ensured at startup.
///
/// Missing accounts are created active; existing ones are promoted to staff.
/// The password is only used when the account is created.
#[derive(Debug, Clone, Deserialize)]
pub struct StaffBlock {
    pub username: String,
    pub email: String,
    pub password: String,
}
