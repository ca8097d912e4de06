//! Typed error hierarchy for the todo service.
//!
//! - `TodoError` — store and request-level failures on the server side
//!
//! Client-side failures live in `crate::client::ClientError`.

use thiserror::Error;

use crate::models::FieldErrors;

/// Errors from the item store and the operations layered over it.
#[derive(Debug, Error)]
pub enum TodoError {
    #[error("{0}")]
    Validation(FieldErrors),

    #[error("Todo {id} not found")]
    NotFound { id: String },

    #[error("Invalid table name '{name}'")]
    InvalidTableName { name: String },

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Database error: {0:#}")]
    Database(#[from] anyhow::Error),
}

impl From<FieldErrors> for TodoError {
    fn from(errors: FieldErrors) -> Self {
        TodoError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_error_not_found_carries_id() {
        let err = TodoError::NotFound { id: "abc".into() };
        match &err {
            TodoError::NotFound { id } => assert_eq!(id, "abc"),
            _ => panic!("Expected NotFound"),
        }
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn todo_error_validation_displays_field_messages() {
        let err: TodoError = FieldErrors {
            title: Some("Title is required".into()),
            description: None,
        }
        .into();
        assert_eq!(err.to_string(), "Title is required");
    }

    #[test]
    fn todo_error_converts_from_anyhow() {
        let err: TodoError = anyhow::anyhow!("disk full").into();
        assert!(matches!(err, TodoError::Database(_)));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn todo_error_implements_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&TodoError::LockPoisoned);
    }
}
