//! Coin transaction model for the wallet ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Transaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Purchase,
    Spend,
    Earn,
    Refund,
}

impl TransactionKind {
    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Spend => "spend",
            Self::Earn => "earn",
            Self::Refund => "refund",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "purchase" => Some(Self::Purchase),
            "spend" => Some(Self::Spend),
            "earn" => Some(Self::Earn),
            "refund" => Some(Self::Refund),
            _ => None,
        }
    }

    /// Whether this kind credits the balance (everything except spend).
    pub fn is_credit(&self) -> bool {
        !matches!(self, Self::Spend)
    }

    /// Lifetime counter column the kind maintains on the account row.
    pub fn counter_column(&self) -> &'static str {
        match self {
            Self::Purchase => "total_coins_purchased",
            Self::Spend => "total_coins_spent",
            Self::Earn => "total_coins_earned",
            Self::Refund => "total_coins_refunded",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction status. Rows are written `completed`; `pending` rows come
/// from out-of-band flows and may only be finalised, never re-applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable ledger transaction row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CoinTransaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub kind: String,
    pub coin_amount: i64,
    pub rupee_amount: Option<Decimal>,
    pub related_content_type: Option<String>,
    pub related_content_id: Option<Uuid>,
    pub external_payment_id: Option<String>,
    pub status: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl CoinTransaction {
    /// Get parsed kind.
    pub fn parsed_kind(&self) -> Option<TransactionKind> {
        TransactionKind::parse(&self.kind)
    }

    /// Get parsed status.
    pub fn parsed_status(&self) -> Option<TransactionStatus> {
        TransactionStatus::parse(&self.status)
    }

    /// Signed balance effect (positive for credits, negative for spends).
    pub fn signed_amount(&self) -> i64 {
        match self.parsed_kind() {
            Some(kind) if kind.is_credit() => self.coin_amount,
            Some(_) => -self.coin_amount,
            None => 0,
        }
    }
}

/// Input for creating a ledger transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransaction {
    pub account_id: Uuid,
    pub kind: TransactionKind,
    pub coin_amount: i64,
    pub rupee_amount: Option<Decimal>,
    pub related_content_type: Option<String>,
    pub related_content_id: Option<Uuid>,
    pub external_payment_id: Option<String>,
    pub description: String,
}

/// Result of applying a transaction: the recorded row plus the balance
/// after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction: CoinTransaction,
    pub new_balance: i64,
}

/// One page of transaction history. `total` counts every row matching the
/// kind filter regardless of pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionPage {
    pub transactions: Vec<CoinTransaction>,
    pub total: i64,
}

/// History query parameters. The service clamps `limit` to 1..=100.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub limit: i64,
    pub offset: i64,
    pub kind: Option<TransactionKind>,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
            kind: None,
        }
    }
}
