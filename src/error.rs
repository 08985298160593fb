//! Error taxonomy shared by every workflow.
//!
//! Workflows never swallow errors; a failure inside a transaction drops the
//! transaction, which rolls back every write made under it.

use sea_orm::DbErr;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    /// Bad input.
    Validation(String),
    /// No authenticated actor on the request.
    Unauthenticated,
    /// Wrong role or not the owner.
    Authorization(String),
    /// Missing id. Carries the kind of resource that was looked up.
    NotFound(&'static str),
    /// A state-machine precondition was not met.
    InvalidState(String),
    /// The report was already resolved or dismissed.
    AlreadyResolved,
    /// The funder already has a pending request for this project.
    DuplicatePending,
    /// An admin targeted their own account.
    SelfAction,
    Database(DbErr),
}

impl Error {
    /// Short machine-readable name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Unauthenticated => "unauthenticated",
            Error::Authorization(_) => "authorization",
            Error::NotFound(_) => "not_found",
            Error::InvalidState(_) => "invalid_state",
            Error::AlreadyResolved => "already_resolved",
            Error::DuplicatePending => "duplicate_pending",
            Error::SelfAction => "self_action",
            Error::Database(_) => "database",
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Validation(msg) => write!(f, "{}", msg),
            Error::Unauthenticated => write!(f, "Login required"),
            Error::Authorization(msg) => write!(f, "{}", msg),
            Error::NotFound(what) => write!(f, "{} not found", what),
            Error::InvalidState(msg) => write!(f, "{}", msg),
            Error::AlreadyResolved => write!(f, "Report has already been resolved"),
            Error::DuplicatePending => write!(
                f,
                "A pending funding request already exists for this project"
            ),
            Error::SelfAction => write!(f, "You cannot perform this action on yourself"),
            Error::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DbErr> for Error {
    fn from(e: DbErr) -> Self {
        Error::Database(e)
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(e: validator::ValidationErrors) -> Self {
        Error::Validation(e.to_string())
    }
}
