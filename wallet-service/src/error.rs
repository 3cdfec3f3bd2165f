//! Error taxonomy for the wallet and access-resolution services.

use thiserror::Error;
use uuid::Uuid;

/// Service-level error type.
///
/// Validation variants are rejected before any store access.
/// `InsufficientFunds` is a normal business outcome and always carries the
/// exact shortfall so callers can offer a top-up.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Invalid coin amount: {0}")]
    InvalidAmount(i64),

    #[error("Invalid status transition: {0}")]
    InvalidStatus(String),

    #[error("Insufficient coins: required {required}, available {available}, shortfall {shortfall}")]
    InsufficientFunds {
        required: i64,
        available: i64,
        shortfall: i64,
    },

    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    #[error("Wrong endpoint: {0}")]
    WrongEndpoint(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Store unavailable: {0}")]
    Transient(anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl WalletError {
    /// Build an `InsufficientFunds` error from the requested amount and the
    /// balance observed at decision time.
    pub fn insufficient(required: i64, available: i64) -> Self {
        WalletError::InsufficientFunds {
            required,
            available,
            shortfall: required - available,
        }
    }

    /// Whether the caller may safely retry the operation as-is.
    ///
    /// The ledger's atomic unit guarantees a retry after a transient store
    /// failure cannot double-apply.
    pub fn is_transient(&self) -> bool {
        matches!(self, WalletError::Transient(_))
    }

    /// Label used for low-cardinality error metrics.
    pub fn metric_label(&self) -> &'static str {
        match self {
            WalletError::InvalidIdentifier(_) => "invalid_identifier",
            WalletError::NotFound(_) => "not_found",
            WalletError::InvalidAmount(_) => "invalid_amount",
            WalletError::InvalidStatus(_) => "invalid_status",
            WalletError::InsufficientFunds { .. } => "insufficient_funds",
            WalletError::AccountNotFound(_) => "account_not_found",
            WalletError::WrongEndpoint(_) => "wrong_endpoint",
            WalletError::Unauthorized(_) => "unauthorized",
            WalletError::Transient(_) => "transient",
            WalletError::Internal(_) => "internal",
        }
    }
}

/// Map a sqlx error to the taxonomy.
///
/// Everything the store reports is treated as retryable; constraint
/// violations that carry business meaning are intercepted before this at
/// the call site.
pub(crate) fn store_error(context: &'static str, e: sqlx::Error) -> WalletError {
    WalletError::Transient(anyhow::anyhow!("{}: {}", context, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_carries_exact_shortfall() {
        let err = WalletError::insufficient(1, 0);
        match err {
            WalletError::InsufficientFunds {
                required,
                available,
                shortfall,
            } => {
                assert_eq!(required, 1);
                assert_eq!(available, 0);
                assert_eq!(shortfall, 1);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn insufficient_display_names_all_three_numbers() {
        let err = WalletError::insufficient(500, 120);
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("120"));
        assert!(msg.contains("380"));
    }

    #[test]
    fn only_transient_is_retryable() {
        assert!(WalletError::Transient(anyhow::anyhow!("pool timeout")).is_transient());
        assert!(!WalletError::insufficient(10, 5).is_transient());
        assert!(!WalletError::InvalidAmount(0).is_transient());
    }
}
