//! Parsing error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("Invalid CSS selector for {field}: {selector} - {reason}")]
    InvalidSelector {
        field: String,
        selector: String,
        reason: String,
    },

    #[error("Required field '{field}' not found in listing")]
    RequiredFieldMissing { field: &'static str },
}

impl ParsingError {
    pub fn invalid_selector(field: &str, selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            field: field.to_string(),
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Missing fields only drop one listing; bad selectors break every page.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::RequiredFieldMissing { .. } => true,
            Self::InvalidSelector { .. } => false,
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
