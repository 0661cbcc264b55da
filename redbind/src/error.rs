use std::sync::PoisonError;
use thiserror::Error;

/// Errors surfaced by the binding layer and the store collaborators behind it.
///
/// Schema errors are produced while a class schema is being populated and are
/// fatal to application startup for the offending class. Store failures are
/// converted from the underlying engine and propagated unchanged.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("schema error: {class}.{field}: {message}")]
    Schema { class: String, field: String, message: String },

    #[error("Custom error: {0}")]
    Custom(String),
}

impl BindError {
    pub fn schema(class: &str, field: &str, message: impl Into<String>) -> Self {
        BindError::Schema { class: class.to_string(), field: field.to_string(), message: message.into() }
    }

    /// Fills in the class name on schema errors raised before it was known.
    pub(crate) fn with_class(self, class_name: &str) -> Self {
        match self {
            BindError::Schema { class, field, message } if class.is_empty() => {
                BindError::Schema { class: class_name.to_string(), field, message }
            }
            other => other,
        }
    }
}

impl<T> From<PoisonError<T>> for BindError {
    fn from(e: PoisonError<T>) -> Self {
        BindError::Custom(format!("Poison error: {:?}", e.to_string()))
    }
}

/// Aborts on an unrecoverable invariant violation.
///
/// Invoked when an operation outside a capability's supported contract is hit
/// at runtime (setting a backlink, non-optional read of data that violates the
/// declared schema, double-optional access). Continuing would corrupt
/// subsequent reads, so this never returns a best-guess value.
pub fn invariant_violation(message: impl std::fmt::Display) -> ! {
    crate::error!("invariant violation: {}", message);
    panic!("invariant violation: {}", message);
}
