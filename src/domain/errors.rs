use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Payment verification failed: {0}")]
    PaymentVerification(String),
    #[error("External service error: {0}")]
    External(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &str) -> Self {
        DomainError::NotFound(entity.to_string())
    }
}

/// Failure reported by an external collaborator (courier, payment gateway,
/// notification channel).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("request timed out")]
    Timeout,
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl From<CollaboratorError> for DomainError {
    fn from(e: CollaboratorError) -> Self {
        DomainError::External(e.to_string())
    }
}
