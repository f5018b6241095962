//! User domain types.

use serde::{Deserialize, Serialize};

/// User permission level as injected by the gateway.
///
/// Wire format: `u8` (0 = Normal, 1 = Admin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Normal = 0,
    Admin = 1,
}

impl UserRole {
    /// Convert from `u8` wire value. Returns `None` for unknown values.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Normal),
            1 => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether step-up codes may be returned in-band to this caller
    /// instead of through the out-of-band delivery channel.
    pub fn may_relay_codes(self) -> bool {
        self >= Self::Admin
    }
}
