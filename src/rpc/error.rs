//! Typed RPC failures and their wire faults

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::permission::Action;

/// Errors raised by RPC handlers
///
/// Handlers propagate these unchanged; only the dispatcher turns them into a
/// [`Fault`].
#[derive(Debug, Error, Diagnostic)]
pub enum RpcError {
    #[error("403 Forbidden: permission '{action}' is required")]
    #[diagnostic(
        code(casebook::rpc::unauthorized),
        help("ask a roster admin to grant '{action}'")
    )]
    Unauthorized { action: Action },

    #[error("{entity} matching query does not exist: {detail}")]
    #[diagnostic(code(casebook::rpc::not_found))]
    NotFound { entity: &'static str, detail: String },

    #[error("Invalid params: {0}")]
    #[diagnostic(code(casebook::rpc::invalid_params))]
    Validation(String),

    #[error("Method not found: {0}")]
    #[diagnostic(code(casebook::rpc::method_not_found))]
    MethodNotFound(String),

    #[error("Store error: {0}")]
    #[diagnostic(code(casebook::rpc::store))]
    Store(#[from] rusqlite::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(casebook::rpc::internal))]
    Internal(String),
}

impl RpcError {
    pub fn not_found(entity: &'static str, detail: impl Into<String>) -> Self {
        RpcError::NotFound {
            entity,
            detail: detail.into(),
        }
    }

    pub fn case_not_found(case_id: i64) -> Self {
        Self::not_found("TestCase", format!("no test case with id {}", case_id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        RpcError::Validation(message.into())
    }

    /// HTTP-style status carried on the wire
    pub fn code(&self) -> u16 {
        match self {
            RpcError::Unauthorized { .. } => 403,
            RpcError::NotFound { .. } => 404,
            RpcError::Validation(_) => 400,
            RpcError::MethodNotFound(_) => 501,
            RpcError::Store(_) | RpcError::Internal(_) => 500,
        }
    }

    pub fn to_fault(&self) -> Fault {
        Fault {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Caller-visible failure with a stable code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub code: u16,
    pub message: String,
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Fault {}: {}>", self.code, self.message)
    }
}

impl From<&RpcError> for Fault {
    fn from(error: &RpcError) -> Self {
        error.to_fault()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_maps_to_403() {
        let fault = RpcError::Unauthorized {
            action: Action::AddTestCaseTag,
        }
        .to_fault();
        assert_eq!(fault.code, 403);
        assert!(fault.message.contains("403 Forbidden"));
        assert!(fault.message.contains("testcases.add_testcasetag"));
    }

    #[test]
    fn test_not_found_message_names_entity() {
        let fault = RpcError::not_found("Component", "no matching component 'ui'").to_fault();
        assert_eq!(fault.code, 404);
        assert_eq!(
            fault.message,
            "Component matching query does not exist: no matching component 'ui'"
        );
    }

    #[test]
    fn test_fault_display() {
        let fault = RpcError::validation("bad").to_fault();
        assert_eq!(fault.to_string(), "<Fault 400: Invalid params: bad>");
    }
}
