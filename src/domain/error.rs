//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

/// Validation and business rule failures.
///
/// Every variant is a client error: the request is rejected before any
/// state is touched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// A required field is absent or blank
    #[error("Campo obrigatório em falta: {0}")]
    MissingField(&'static str),

    /// A field is present but malformed or out of range
    #[error("Valor inválido para {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Business rule violation
    #[error("{0}")]
    BusinessRuleViolation(String),
}

impl DomainError {
    /// Create an invalid field error
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the offending field, if the error is tied to one
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField(field) | Self::InvalidField { field, .. } => Some(field),
            Self::BusinessRuleViolation(_) => None,
        }
    }
}
