//! JSON bodies accepted and returned by the HTTP layer.

use crate::utils::error::{AppError, AppResult};

pub mod event;
pub mod order;
pub mod page;

/// Message used for every rejected input field.
pub fn invalid_field(field: &str, value: impl std::fmt::Display) -> String {
    format!("invalid '{}' with value '{}'", field, value)
}

/// Collapses field messages into one validation error.
pub fn validation_result(messages: Vec<String>) -> AppResult<()> {
    if messages.is_empty() {
        Ok(())
    } else {
        Err(AppError::ValidationError(messages.join(", ")))
    }
}
