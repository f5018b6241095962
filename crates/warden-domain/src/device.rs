//! Device status model and fingerprint payload.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::transition::{Transition, UnknownStatus};

/// Trust status of a device.
///
/// `Hijacked` is terminal as far as this service is concerned; clearing it is an
/// administrative action outside the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Active,
    Verified,
    Hijacked,
}

/// Actions that can change a device's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAction {
    Verify,
    Hijack,
}

impl DeviceStatus {
    pub const ALL: [DeviceStatus; 3] = [Self::Active, Self::Verified, Self::Hijacked];

    /// Device transition table.
    ///
    /// | status   | verify       | hijack       |
    /// |----------|--------------|--------------|
    /// | Active   | → Verified   | → Hijacked   |
    /// | Verified | unchanged    | → Hijacked   |
    /// | Hijacked | rejected     | unchanged    |
    pub fn apply(self, action: DeviceAction) -> Transition<Self> {
        use DeviceAction::*;
        use DeviceStatus::*;
        match (self, action) {
            (Active, Verify) => Transition::To(Verified),
            (Verified, Verify) => Transition::Unchanged,
            (Hijacked, Verify) => Transition::Rejected,
            (Active | Verified, Hijack) => Transition::To(Hijacked),
            (Hijacked, Hijack) => Transition::Unchanged,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Verified => "verified",
            Self::Hijacked => "hijacked",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "verified" => Ok(Self::Verified),
            "hijacked" => Ok(Self::Hijacked),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

/// Client fingerprint captured when a device is first registered.
///
/// Derived outside this service (user-agent parsing, IP extraction) and stored
/// verbatim; never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    #[serde(default)]
    pub browser: String,
    #[serde(default)]
    pub browser_version: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub platform_version: String,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub device_type: String,
    #[serde(default)]
    pub mobile: bool,
    #[serde(default)]
    pub robot: bool,
    #[serde(default)]
    pub ip: String,
    /// Raw user-agent (or equivalent) the other fields were derived from.
    #[serde(default)]
    pub source: String,
}
