use serde::{Deserialize, Serialize};

use crate::error::{DevflowError, ErrorKind};
use crate::validation::FieldErrors;

/// Uniform result of every action: `{success, data?, error?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ActionError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FieldErrors>,
    #[serde(skip, default = "internal_kind")]
    pub kind: ErrorKind,
}

fn internal_kind() -> ErrorKind {
    ErrorKind::Internal
}

impl<T> ActionResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Success with no payload.
    pub fn done() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn failure(err: &DevflowError) -> Self {
        let details = match err {
            DevflowError::Validation(fields) => Some(fields.clone()),
            _ => None,
        };
        Self {
            success: false,
            data: None,
            error: Some(ActionError {
                message: err.public_message(),
                details,
                kind: err.kind(),
            }),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }
}

impl<T> From<Result<T, DevflowError>> for ActionResponse<T> {
    fn from(result: Result<T, DevflowError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::failure(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_omits_error() {
        let json = serde_json::to_value(ActionResponse::ok(5)).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": 5}));
    }

    #[test]
    fn validation_failure_carries_details() {
        let mut fields = FieldErrors::new();
        fields.push("title", "Title is required.");
        let resp: ActionResponse<()> = ActionResponse::failure(&DevflowError::Validation(fields));
        assert!(!resp.success);
        assert_eq!(resp.error_kind(), Some(ErrorKind::Validation));

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["error"]["details"]["title"][0], "Title is required.");
        assert!(json["error"].get("kind").is_none());
    }

    #[test]
    fn unauthorized_message() {
        let resp: ActionResponse<()> = Err(DevflowError::Unauthorized).into();
        assert_eq!(resp.message(), Some("Unauthorized"));
    }
}
