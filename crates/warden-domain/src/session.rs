//! Session status model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::transition::{Transition, UnknownStatus};

/// Status of a login session.
///
/// `Finished` is terminal. `Blocked` is only entered through device hijack
/// containment and only left through `forget` (or administrative clearance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Locked,
    Blocked,
    Finished,
}

/// Actions that can change a session's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// User logout / explicit end.
    End,
    /// Suspend pending a step-up code.
    Lock,
    /// Resume after a valid code or a successful step-up.
    Unlock,
    /// Re-issue the step-up code of a locked session.
    RefreshCode,
    /// Hijack containment.
    Block,
    /// Device forgotten: finish regardless of status.
    Forget,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 4] = [Self::Active, Self::Locked, Self::Blocked, Self::Finished];

    /// Session transition table.
    ///
    /// | status   | end        | lock      | unlock    | refresh   | block     | forget     |
    /// |----------|------------|-----------|-----------|-----------|-----------|------------|
    /// | Active   | → Finished | → Locked  | unchanged | unchanged | → Blocked | → Finished |
    /// | Locked   | → Finished | unchanged | → Active  | → Locked  | → Blocked | → Finished |
    /// | Blocked  | rejected   | unchanged | unchanged | unchanged | unchanged | → Finished |
    /// | Finished | unchanged  | unchanged | unchanged | unchanged | unchanged | unchanged  |
    pub fn apply(self, action: SessionAction) -> Transition<Self> {
        use SessionAction::*;
        use SessionStatus::*;
        match (self, action) {
            (Finished, _) => Transition::Unchanged,

            (Active | Locked, End) => Transition::To(Finished),
            (Blocked, End) => Transition::Rejected,

            (Active, Lock) => Transition::To(Locked),
            (Locked | Blocked, Lock) => Transition::Unchanged,

            (Locked, Unlock) => Transition::To(Active),
            (Active | Blocked, Unlock) => Transition::Unchanged,

            (Locked, RefreshCode) => Transition::To(Locked),
            (Active | Blocked, RefreshCode) => Transition::Unchanged,

            (Active | Locked, Block) => Transition::To(Blocked),
            (Blocked, Block) => Transition::Unchanged,

            (Active | Locked | Blocked, Forget) => Transition::To(Finished),
        }
    }

    /// `Active` and `Locked` sessions are live: they can still become usable.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Active | Self::Locked)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Locked => "locked",
            Self::Blocked => "blocked",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "locked" => Ok(Self::Locked),
            "blocked" => Ok(Self::Blocked),
            "finished" => Ok(Self::Finished),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}
