use thiserror::Error;

use crate::core::SolverConfigError;

/// Rejection raised while turning CLI flags or an API payload into loan inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("{field} {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("Invalid API payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Search(#[from] SolverConfigError),
}

impl InputError {
    pub(crate) fn field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
