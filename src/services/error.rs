use thiserror::Error;

use crate::database::{Constraint, StoreError};

pub const ALREADY_IN_FAMILY: &str = "You already belong to a family";
pub const ALREADY_IN_FAMILY_JOIN: &str = "You already belong to a family. Leave your current family first.";
pub const MEMBER_LINKED_TO_ACCOUNT: &str =
    "Cannot delete a family member linked to a user account. Ask them to leave the family instead.";
pub const MEMBER_REFERENCES_INVALID: &str = "One or more family members not found";

/// Typed outcome of a failed service operation
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{}", MEMBER_LINKED_TO_ACCOUNT)]
    MemberLinkedToAccount,

    /// The principal has no (resolvable) family and must go through onboarding
    #[error("Family setup required")]
    OnboardingRequired,

    /// Storage timed out or is unreachable; safe to retry
    #[error("Service temporarily unavailable")]
    Unavailable(#[source] StoreError),

    #[error(transparent)]
    Store(StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }

    /// Errors the caller caused, as opposed to infrastructure failures
    pub fn is_expected(&self) -> bool {
        !matches!(self, ServiceError::Unavailable(_) | ServiceError::Store(_))
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        if err.is_retryable() {
            return ServiceError::Unavailable(err);
        }
        match err {
            // The conditional link and the (family, user) index both mean
            // the principal won a race into a family already
            StoreError::AlreadyLinked | StoreError::UniqueViolation(Constraint::MemberUser) => {
                ServiceError::conflict(ALREADY_IN_FAMILY)
            }
            StoreError::InvalidReference(_) => ServiceError::validation(MEMBER_REFERENCES_INVALID),
            other => ServiceError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn index_violation_reads_like_the_preemptive_check() {
        let err = ServiceError::from(StoreError::UniqueViolation(Constraint::MemberUser));
        assert!(matches!(err, ServiceError::Conflict(ref msg) if msg == ALREADY_IN_FAMILY));
        let err = ServiceError::from(StoreError::AlreadyLinked);
        assert!(matches!(err, ServiceError::Conflict(ref msg) if msg == ALREADY_IN_FAMILY));
    }

    #[test]
    fn timeouts_are_unavailable() {
        let err = ServiceError::from(StoreError::Timeout(Duration::from_secs(1)));
        assert!(matches!(err, ServiceError::Unavailable(_)));
        assert!(!err.is_expected());
    }

    #[test]
    fn invite_code_collision_is_not_a_user_conflict() {
        let err = ServiceError::from(StoreError::UniqueViolation(Constraint::InviteCode));
        assert!(matches!(err, ServiceError::Store(_)));
    }
}
