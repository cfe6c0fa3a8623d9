use thiserror::Error;

use crate::models::ClientId;

/// Constraint guarding `clients.email`
pub const EMAIL_UNIQUE_CONSTRAINT: &str = "clients_email_key";
/// Constraint tying `numbers.client_id` to `clients.id`
pub const CLIENT_FK_CONSTRAINT: &str = "numbers_client_id_fkey";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("A client with email {email:?} already exists")]
    DuplicateEmail { email: String },

    #[error("Client {client_id} does not exist")]
    UnknownClient { client_id: ClientId },

    #[error("A client search needs one criterion, none was supplied")]
    MissingCriteria,

    #[error("A client search takes exactly one criterion, got: {}", .supplied.join(", "))]
    AmbiguousCriteria { supplied: Vec<&'static str> },

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Constraint {constraint} violated: {message}")]
    ConstraintViolation { constraint: String, message: String },

    #[error("Connection to the store failed: {0}")]
    ConnectionFailure(#[source] sqlx::Error),

    #[error("Schema setup failed: {0}")]
    Schema(#[source] sqlx::Error),

    #[error("Store error: {0}")]
    Store(#[source] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// How a store-side failure maps onto the registry's error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreFault {
    DuplicateEmail,
    UnknownClient,
    ValueTooLong,
    Constraint(String),
    Connection,
    Other,
}

/// Classify a PostgreSQL SQLSTATE and constraint name.
pub(crate) fn classify_sqlstate(code: &str, constraint: Option<&str>) -> StoreFault {
    match code {
        "23505" if matches!(constraint, Some(EMAIL_UNIQUE_CONSTRAINT) | None) => {
            StoreFault::DuplicateEmail
        }
        "23503" if matches!(constraint, Some(CLIENT_FK_CONSTRAINT) | None) => {
            StoreFault::UnknownClient
        }
        "22001" => StoreFault::ValueTooLong,
        c if c.starts_with("23") => {
            StoreFault::Constraint(constraint.unwrap_or("unknown").to_string())
        }
        c if c.starts_with("08") || c.starts_with("28") || c.starts_with("57P") => {
            StoreFault::Connection
        }
        _ => StoreFault::Other,
    }
}

fn classify(err: &sqlx::Error) -> StoreFault {
    match err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => classify_sqlstate(&code, db_err.constraint()),
            None => StoreFault::Other,
        },
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreFault::Connection,
        _ => StoreFault::Other,
    }
}

impl RegistryError {
    /// Translate a store error raised while working on `client_id` and/or
    /// `email` into a typed registry error.
    pub(crate) fn from_store(err: sqlx::Error, client_id: Option<ClientId>, email: Option<&str>) -> Self {
        match (classify(&err), client_id, email) {
            (StoreFault::DuplicateEmail, _, Some(email)) => RegistryError::DuplicateEmail {
                email: email.to_string(),
            },
            (StoreFault::UnknownClient, Some(client_id), _) => {
                RegistryError::UnknownClient { client_id }
            }
            (StoreFault::ValueTooLong, _, _) => RegistryError::InvalidInput {
                field: "value",
                reason: store_message(&err),
            },
            (StoreFault::Connection, _, _) => RegistryError::ConnectionFailure(err),
            (StoreFault::Other, _, _) => RegistryError::Store(err),
            (StoreFault::Constraint(constraint), _, _) => RegistryError::ConstraintViolation {
                constraint,
                message: store_message(&err),
            },
            // Duplicate email or dangling reference without the context to
            // name it: report the raw constraint.
            (StoreFault::DuplicateEmail, _, None) => RegistryError::ConstraintViolation {
                constraint: EMAIL_UNIQUE_CONSTRAINT.to_string(),
                message: store_message(&err),
            },
            (StoreFault::UnknownClient, None, _) => RegistryError::ConstraintViolation {
                constraint: CLIENT_FK_CONSTRAINT.to_string(),
                message: store_message(&err),
            },
        }
    }

    pub fn is_duplicate_email(&self) -> bool {
        matches!(self, RegistryError::DuplicateEmail { .. })
    }

    pub fn is_unknown_client(&self) -> bool {
        matches!(self, RegistryError::UnknownClient { .. })
    }
}

fn store_message(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db_err) => db_err.message().to_string(),
        other => other.to_string(),
    }
}

impl From<sqlx::Error> for RegistryError {
    fn from(err: sqlx::Error) -> Self {
        RegistryError::from_store(err, None, None)
    }
}
