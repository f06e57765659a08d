//! Session roles for the SQL front end.
//!
//! The engine is role-agnostic. A connection's startup `user` names one of
//! these roles and the wire handler checks the matching capability before
//! dispatching a command.

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Organizer,
    Student,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Book,
    ViewSchedule,
    ViewUsage,
    ViewResources,
}

impl Role {
    pub fn can(self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Role::Admin => matches!(capability, ViewSchedule | ViewUsage | ViewResources),
            Role::Organizer => matches!(capability, Book | ViewResources),
            Role::Student => matches!(capability, ViewSchedule),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Organizer => "organizer",
            Role::Student => "student",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "organizer" => Ok(Role::Organizer),
            "student" => Ok(Role::Student),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Capability::Book => "book resources",
            Capability::ViewSchedule => "view the schedule",
            Capability::ViewUsage => "view usage statistics",
            Capability::ViewResources => "view resources",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl std::fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown role: {} (expected admin, organizer or student)", self.0)
    }
}

impl std::error::Error for UnknownRole {}
