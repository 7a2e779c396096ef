//! Member capability state machine.
//!
//! A member's standing is carried by two independent axes, read and write.
//! Each axis has an authoritative flag and an optional expiry. An expiry is
//! only ever present on a restricted axis and marks it as temporary; a
//! restricted axis without expiry is permanent.
//!
//! ```text
//!   ACTIVE ──ReadOnly──▶ READ_ONLY ──ReadOnlyLifted / expiry──▶ ACTIVE
//!   ACTIVE ──Ban───────▶ BANNED    ──BanLifted / expiry───────▶ ACTIVE
//! ```
//!
//! A ban only touches the read axis. Write access is derived: a member who
//! cannot read cannot write either, whatever the stored write flag says.

use serde::Serialize;
use std::fmt;

/// Which capability a sanction governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Read,
    Write,
}

impl Axis {
    /// Column holding the capability flag.
    pub(crate) fn flag_column(self) -> &'static str {
        match self {
            Axis::Read => "can_read",
            Axis::Write => "can_write",
        }
    }

    /// Column holding the expiry timestamp.
    pub(crate) fn expiry_column(self) -> &'static str {
        match self {
            Axis::Read => "end_ban_read",
            Axis::Write => "end_ban_write",
        }
    }

    /// Audit kind recorded when a temporary restriction runs out.
    pub fn expired_kind(self) -> &'static str {
        match self {
            Axis::Read => "BAN_EXPIRED",
            Axis::Write => "READ_ONLY_EXPIRED",
        }
    }

    /// Metrics label.
    pub fn label(self) -> &'static str {
        match self {
            Axis::Read => "read",
            Axis::Write => "write",
        }
    }
}

/// A staff moderation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SanctionKind {
    /// Remove write capability.
    ReadOnly,
    /// Restore write capability.
    ReadOnlyLifted,
    /// Remove read (and therefore write) capability.
    Ban,
    /// Restore read capability.
    BanLifted,
}

impl SanctionKind {
    pub fn axis(self) -> Axis {
        match self {
            SanctionKind::ReadOnly | SanctionKind::ReadOnlyLifted => Axis::Write,
            SanctionKind::Ban | SanctionKind::BanLifted => Axis::Read,
        }
    }

    /// Whether this action restricts (as opposed to lifts) its axis.
    pub fn restricts(self) -> bool {
        matches!(self, SanctionKind::ReadOnly | SanctionKind::Ban)
    }

    /// Flag and expiry this action leaves on its axis.
    pub fn target_state(self, expires_at: Option<i64>) -> (bool, Option<i64>) {
        if self.restricts() {
            (false, expires_at)
        } else {
            (true, None)
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SanctionKind::ReadOnly => "READ_ONLY",
            SanctionKind::ReadOnlyLifted => "READ_ONLY_LIFTED",
            SanctionKind::Ban => "BAN",
            SanctionKind::BanLifted => "BAN_LIFTED",
        }
    }
}

impl fmt::Display for SanctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse standing derived from the capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Standing {
    Active,
    ReadOnly,
    Banned,
}

/// Capability flags and their expiries, as stored on a member.
///
/// Timestamps are Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub can_read: bool,
    pub can_write: bool,
    pub end_ban_read: Option<i64>,
    pub end_ban_write: Option<i64>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            can_read: true,
            can_write: true,
            end_ban_read: None,
            end_ban_write: None,
        }
    }
}

/// Which axes were restored by [`Capabilities::expire`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expired {
    pub read: bool,
    pub write: bool,
}

impl Expired {
    pub fn any(self) -> bool {
        self.read || self.write
    }
}

impl Capabilities {
    pub fn standing(&self) -> Standing {
        if !self.can_read {
            Standing::Banned
        } else if !self.can_write {
            Standing::ReadOnly
        } else {
            Standing::Active
        }
    }

    pub fn may_read(&self) -> bool {
        self.can_read
    }

    /// Effective write access. A banned member never writes.
    pub fn may_write(&self) -> bool {
        self.can_read && self.can_write
    }

    fn flag_mut(&mut self, axis: Axis) -> (&mut bool, &mut Option<i64>) {
        match axis {
            Axis::Read => (&mut self.can_read, &mut self.end_ban_read),
            Axis::Write => (&mut self.can_write, &mut self.end_ban_write),
        }
    }

    /// Apply a sanction. `expires_at` is only kept for restricting kinds;
    /// lifting always clears the expiry.
    pub fn apply(&mut self, kind: SanctionKind, expires_at: Option<i64>) {
        let (flag, expiry) = self.flag_mut(kind.axis());
        (*flag, *expiry) = kind.target_state(expires_at);
    }

    /// Restore every temporary restriction whose expiry is at or before `now`.
    ///
    /// Idempotent: calling it again with the same `now` changes nothing.
    pub fn expire(&mut self, now: i64) -> Expired {
        let mut expired = Expired::default();
        for axis in [Axis::Read, Axis::Write] {
            let (flag, expiry) = self.flag_mut(axis);
            if !*flag && expiry.is_some_and(|end| now >= end) {
                *flag = true;
                *expiry = None;
                match axis {
                    Axis::Read => expired.read = true,
                    Axis::Write => expired.write = true,
                }
            }
        }
        expired
    }

    /// Copy of `self` with expired restrictions restored.
    pub fn effective_at(mut self, now: i64) -> Self {
        self.expire(now);
        self
    }
}
