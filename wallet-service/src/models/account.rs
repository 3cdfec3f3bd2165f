//! Wallet account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per-user wallet row. Mutated only by the wallet ledger service, never
/// written directly by callers.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WalletAccount {
    pub id: Uuid,
    pub coin_balance: i64,
    pub total_coins_purchased: i64,
    pub total_coins_earned: i64,
    pub total_coins_spent: i64,
    pub total_coins_refunded: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WalletAccount {
    /// Stored-counter consistency: balance equals credits minus spends.
    /// Holds after every ledger operation by construction.
    pub fn counters_consistent(&self) -> bool {
        self.coin_balance
            == self.total_coins_purchased + self.total_coins_earned + self.total_coins_refunded
                - self.total_coins_spent
    }
}

/// Balance summary returned by the balance-info lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceInfo {
    pub balance: i64,
    pub total_purchased: i64,
    pub total_earned: i64,
    pub total_spent: i64,
    pub total_refunded: i64,
    pub last_updated: DateTime<Utc>,
}

impl From<WalletAccount> for BalanceInfo {
    fn from(account: WalletAccount) -> Self {
        Self {
            balance: account.coin_balance,
            total_purchased: account.total_coins_purchased,
            total_earned: account.total_coins_earned,
            total_spent: account.total_coins_spent,
            total_refunded: account.total_coins_refunded,
            last_updated: account.updated_at,
        }
    }
}

/// Pre-flight affordability check. Advisory only: the authoritative guard
/// is the conditional decrement inside the ledger store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinSufficiency {
    pub sufficient: bool,
    pub balance: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortfall: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(balance: i64, purchased: i64, earned: i64, spent: i64, refunded: i64) -> WalletAccount {
        WalletAccount {
            id: Uuid::new_v4(),
            coin_balance: balance,
            total_coins_purchased: purchased,
            total_coins_earned: earned,
            total_coins_spent: spent,
            total_coins_refunded: refunded,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn counters_consistent_accepts_balanced_account() {
        assert!(account(300, 500, 100, 350, 50).counters_consistent());
        assert!(account(0, 0, 0, 0, 0).counters_consistent());
    }

    #[test]
    fn counters_consistent_rejects_drift() {
        assert!(!account(301, 500, 100, 350, 50).counters_consistent());
    }
}
