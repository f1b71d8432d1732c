use td_schemas::CategoryError;
use thiserror::Error;

/// Why a candidate batch was refused. Nothing was mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchRejection {
    #[error("price update must be a JSON array of records")]
    NotASequence,

    #[error("record at index {index} is not a valid price entry")]
    InvalidEntry { index: usize },

    #[error("record id {id:?} appears more than once in the batch")]
    DuplicateId { id: String },

    #[error("record id {id:?} does not belong to category {category}")]
    OutsideCategory { id: String, category: String },
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Client-side: invalid category or batch. No side effects.
    #[error("invalid category: {0}")]
    InvalidCategory(#[from] CategoryError),

    /// Client-side: invalid batch. No side effects.
    #[error(transparent)]
    Malformed(#[from] BatchRejection),

    /// Server-side: the store was updated in memory (and the audit entries
    /// appended) but could not be written out. No notification was sent.
    #[error("persisting prices for category {category} failed: {reason}")]
    Persistence { category: String, reason: String },
}

impl ReconcileError {
    /// True for rejections caused by the request itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ReconcileError::InvalidCategory(_) | ReconcileError::Malformed(_)
        )
    }
}
