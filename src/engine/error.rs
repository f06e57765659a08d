use ulid::Ulid;

use crate::model::Tick;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    Conflict { resource_id: String, with: Ulid },
    InvalidRange { start: Tick, end: Tick },
    UnknownResource(String),
    EmptyEventName,
    LimitExceeded(&'static str),
}

impl EngineError {
    /// Short label used for the `outcome` metric dimension.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            EngineError::Conflict { .. } => "conflict",
            EngineError::InvalidRange { .. } => "invalid_range",
            EngineError::UnknownResource(_) => "unknown_resource",
            EngineError::EmptyEventName | EngineError::LimitExceeded(_) => "rejected",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Conflict { resource_id, with } => {
                write!(f, "conflict on {resource_id} with booking {with}")
            }
            EngineError::InvalidRange { start, end } => {
                write!(f, "invalid range [{start}, {end}): start must be before end")
            }
            EngineError::UnknownResource(id) => write!(f, "unknown resource: {id}"),
            EngineError::EmptyEventName => write!(f, "event name must not be empty"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
