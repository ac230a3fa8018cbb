use thiserror::Error;

use crate::validation::FieldErrors;

#[derive(Error, Debug)]
pub enum DevflowError {
    #[error("Validation error")]
    Validation(FieldErrors),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Failed to create question")]
    QuestionCreation,

    #[error("Failed to update vote count")]
    VoteCountUpdate,

    #[error("AI request failed")]
    Ai(#[source] anyhow::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Coarse classification used by transports to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Unauthorized,
    Internal,
}

impl DevflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DevflowError::Validation(_) => ErrorKind::Validation,
            DevflowError::NotFound(_) => ErrorKind::NotFound,
            DevflowError::Unauthorized => ErrorKind::Unauthorized,
            _ => ErrorKind::Internal,
        }
    }

    /// Message safe to show a user. Storage details stay in logs.
    pub fn public_message(&self) -> String {
        match self {
            DevflowError::Validation(fields) => fields.summary(),
            DevflowError::Anyhow(_) => "An unexpected error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<FieldErrors> for DevflowError {
    fn from(errors: FieldErrors) -> Self {
        DevflowError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_hidden() {
        let err = DevflowError::from(anyhow::anyhow!("relation \"votes\" does not exist"));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.public_message(), "An unexpected error occurred");
    }

    #[test]
    fn not_found_names_the_entity() {
        let err = DevflowError::NotFound("Question");
        assert_eq!(err.public_message(), "Question not found");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
