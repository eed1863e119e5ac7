use std::time::Duration;

use thiserror::Error;

/// Unique constraints the store enforces on behalf of the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// `families.invite_code`
    InviteCode,
    /// `(family_members.family_id, family_members.user_id)` where `user_id` is set
    MemberUser,
    Other(String),
}

impl Constraint {
    pub const INVITE_CODE_INDEX: &'static str = "families_invite_code_unique";
    pub const MEMBER_USER_INDEX: &'static str = "family_members_family_user_unique";

    pub fn from_index_name(name: &str) -> Self {
        match name {
            Self::INVITE_CODE_INDEX => Constraint::InviteCode,
            Self::MEMBER_USER_INDEX => Constraint::MemberUser,
            other => Constraint::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::InviteCode => f.write_str(Self::INVITE_CODE_INDEX),
            Constraint::MemberUser => f.write_str(Self::MEMBER_USER_INDEX),
            Constraint::Other(name) => f.write_str(name),
        }
    }
}

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(Constraint),

    /// The conditional write linking a user to a family found a family
    /// already linked
    #[error("User is already linked to a family")]
    AlreadyLinked,

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Deleting the member would leave the named provider with nobody
    #[error("Member is the only one served by provider {0}")]
    SoleProviderMember(String),

    #[error("Storage call timed out after {0:?}")]
    Timeout(Duration),

    /// Only produced by the in-memory store's failure injection
    #[error("Simulated storage failure: {0}")]
    Simulated(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl StoreError {
    /// Timeouts and connectivity problems are worth retrying, everything else is not
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Timeout(_) => true,
            StoreError::Sqlx(err) => matches!(
                err,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // 23505 = unique_violation
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err
                    .constraint()
                    .map(Constraint::from_index_name)
                    .unwrap_or_else(|| Constraint::Other("unknown".to_string()));
                return StoreError::UniqueViolation(constraint);
            }
        }
        StoreError::Sqlx(err)
    }
}
