use serde::Serialize;

use crate::registry::contract::ContractError;
use crate::service::ServiceError;

/// Structured error type shared end to end by the command layer. Validation,
/// lookup and service failures all surface as one of these variants so callers
/// can match on the `code` tag instead of parsing messages.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "code", content = "detail")]
pub enum RpcError {
    /// A required positional slot was absent.
    #[error("Missing parameter: {name}")]
    MissingParameter { name: String },

    /// A present value failed its type or enum-membership check.
    #[error("Invalid parameter {name}, expected {expected}")]
    InvalidParameterType { name: String, expected: String },

    #[error("Unknown command: {name}")]
    UnknownCommand { name: String },

    #[error("Command already registered: {name}")]
    DuplicateCommand { name: String },

    #[error("Invalid contract: {0}")]
    InvalidContract(#[from] ContractError),

    /// Opaque downstream failure. Only produced after validation passed.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl RpcError {
    pub fn missing(name: impl Into<String>) -> Self {
        RpcError::MissingParameter { name: name.into() }
    }

    pub fn invalid(name: impl Into<String>, expected: impl Into<String>) -> Self {
        RpcError::InvalidParameterType {
            name: name.into(),
            expected: expected.into(),
        }
    }

    /// True for the two failures produced by contract validation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RpcError::MissingParameter { .. } | RpcError::InvalidParameterType { .. }
        )
    }
}
