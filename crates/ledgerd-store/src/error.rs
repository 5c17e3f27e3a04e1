//! Error types for ledger storage.

use ledgerd_core::PolicyError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("not found")]
    NotFound,

    /// Grant amount is not a positive integer.
    #[error("grant amount must be a positive integer, got {amount}")]
    InvalidAmount {
        /// The offending amount.
        amount: i64,
    },

    /// Spend cost is not a positive integer.
    #[error("spend cost must be a positive integer, got {cost}")]
    InvalidCost {
        /// The offending cost.
        cost: i64,
    },

    /// The owner's usable grants do not cover the requested cost. No state
    /// was mutated; retryable after the balance changes.
    #[error("insufficient credits: available={available}, required={required}")]
    InsufficientCredits {
        /// Total remaining amount across usable grants.
        available: i64,
        /// The requested cost.
        required: i64,
    },
}

impl From<PolicyError> for StoreError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::InsufficientCredits {
                available,
                required,
            } => Self::InsufficientCredits {
                available,
                required,
            },
            PolicyError::InvalidCost { cost } => Self::InvalidCost { cost },
        }
    }
}
