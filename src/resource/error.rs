use std::fmt;

use crate::api::ApiError;

/// The kind of controller operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Load,
    Create,
    Update,
    Delete,
    ChangeStatus,
}

impl Operation {
    /// Fallback message used when the server does not supply one
    #[must_use]
    pub fn default_message(self, label: &str) -> String {
        match self {
            Self::List => format!("Cannot load {label} list"),
            Self::Load => format!("Cannot load {label}"),
            Self::Create => format!("Cannot create {label}"),
            Self::Update => format!("Cannot update {label}"),
            Self::Delete => format!("Cannot delete {label}"),
            Self::ChangeStatus => format!("Cannot change {label} status"),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::List => "list",
            Self::Load => "load",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::ChangeStatus => "change status",
        })
    }
}

/// Failure surfaced to callers of a controller operation
///
/// `message` is what the user sees: the server's own message when it sent
/// one, otherwise the per-operation default.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ResourceError {
    pub operation: Operation,
    pub message: String,
    #[source]
    pub cause: Option<ApiError>,
}

impl ResourceError {
    #[must_use]
    pub fn from_api(operation: Operation, label: &str, err: ApiError) -> Self {
        let message = err
            .server_message()
            .map_or_else(|| operation.default_message(label), ToString::to_string);
        Self {
            operation,
            message,
            cause: Some(err),
        }
    }

    /// A well-formed response that could not be turned into a record
    #[must_use]
    pub fn malformed(operation: Operation, label: &str, detail: &str) -> Self {
        log::warn!("Malformed {label} response during {operation}: {detail}");
        Self {
            operation,
            message: operation.default_message(label),
            cause: Some(ApiError::Decode(detail.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_server_message() {
        let err = ResourceError::from_api(
            Operation::Create,
            "tour",
            ApiError::Http {
                status: 400,
                message: Some("Title is required".into()),
            },
        );
        assert_eq!(err.to_string(), "Title is required");
        assert_eq!(err.operation, Operation::Create);
    }

    #[test]
    fn test_falls_back_to_operation_default() {
        let err = ResourceError::from_api(
            Operation::ChangeStatus,
            "tour",
            ApiError::Transport("connection refused".into()),
        );
        assert_eq!(err.message, "Cannot change tour status");
        assert!(std::error::Error::source(&err).is_some());
    }
}
