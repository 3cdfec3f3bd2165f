//! Coin ledger service.
//!
//! Owns every balance read and write. The wallet row is append-driven: it
//! is provisioned by the first credit, mutated only through
//! [`LedgerStore::apply_transaction`], and its lifetime counters satisfy
//!
//! `coin_balance == purchased + earned + refunded - spent`
//!
//! after every operation.

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::WalletError;
use crate::models::{
    BalanceInfo, CoinSufficiency, CreateTransaction, HistoryQuery, TransactionKind,
    TransactionPage, TransactionReceipt, TransactionStatus,
};
use crate::services::metrics::{ERRORS_TOTAL, TRANSACTIONS_TOTAL};
use crate::services::store::LedgerStore;

/// Ledger operations over an injected store.
#[derive(Clone)]
pub struct WalletService {
    store: Arc<dyn LedgerStore>,
}

impl WalletService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Current spendable balance. Wallet rows appear on first credit, so a
    /// missing row reads as zero rather than an error.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn get_balance(&self, account_id: Uuid) -> Result<i64, WalletError> {
        match self.store.balance(account_id).await {
            Ok(balance) => Ok(balance),
            Err(WalletError::AccountNotFound(_)) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Balance plus lifetime counters. Unlike [`get_balance`] this requires
    /// a provisioned wallet row.
    ///
    /// [`get_balance`]: WalletService::get_balance
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn get_balance_info(&self, account_id: Uuid) -> Result<BalanceInfo, WalletError> {
        let account = self.store.account(account_id).await?;
        Ok(BalanceInfo::from(account))
    }

    /// Advisory affordability check. Callers use this for early UX
    /// feedback; the spend itself re-checks atomically and wins any race.
    #[instrument(skip(self), fields(account_id = %account_id, amount = amount))]
    pub async fn check_sufficient_coins(
        &self,
        account_id: Uuid,
        amount: i64,
    ) -> Result<CoinSufficiency, WalletError> {
        if amount <= 0 {
            return Err(WalletError::InvalidAmount(amount));
        }

        let balance = self.get_balance(account_id).await?;
        let shortfall = if balance >= amount {
            None
        } else {
            Some(amount - balance)
        };

        Ok(CoinSufficiency {
            sufficient: shortfall.is_none(),
            balance,
            shortfall,
        })
    }

    /// Record a coin transaction and adjust the balance atomically.
    ///
    /// Spends fail with `InsufficientFunds` and no state change when the
    /// balance does not cover the amount. Replaying an
    /// `external_payment_id` returns the already-recorded transaction.
    #[instrument(skip(self, input), fields(account_id = %input.account_id, kind = %input.kind))]
    pub async fn create_transaction(
        &self,
        input: CreateTransaction,
    ) -> Result<TransactionReceipt, WalletError> {
        if input.coin_amount <= 0 {
            return Err(WalletError::InvalidAmount(input.coin_amount));
        }

        let kind = input.kind.as_str();
        match self.store.apply_transaction(&input).await {
            Ok(receipt) => {
                TRANSACTIONS_TOTAL.with_label_values(&[kind, "ok"]).inc();
                info!(
                    transaction_id = %receipt.transaction.id,
                    new_balance = receipt.new_balance,
                    "Transaction applied"
                );
                Ok(receipt)
            }
            Err(e @ WalletError::InsufficientFunds { .. }) => {
                TRANSACTIONS_TOTAL
                    .with_label_values(&[kind, "insufficient_funds"])
                    .inc();
                Err(e)
            }
            Err(e) => {
                TRANSACTIONS_TOTAL.with_label_values(&[kind, "error"]).inc();
                ERRORS_TOTAL.with_label_values(&[e.metric_label()]).inc();
                Err(e)
            }
        }
    }

    /// Credit a creator for a consumption event. Earnings can never fail
    /// for funds; the wallet row is provisioned on first earning.
    #[instrument(skip(self, description), fields(account_id = %account_id, amount = amount))]
    pub async fn record_creator_earning(
        &self,
        account_id: Uuid,
        amount: i64,
        related_content_type: &str,
        related_content_id: Uuid,
        description: &str,
    ) -> Result<TransactionReceipt, WalletError> {
        self.create_transaction(CreateTransaction {
            account_id,
            kind: TransactionKind::Earn,
            coin_amount: amount,
            rupee_amount: None,
            related_content_type: Some(related_content_type.to_string()),
            related_content_id: Some(related_content_id),
            external_payment_id: None,
            description: description.to_string(),
        })
        .await
    }

    /// Page through an account's history, newest first. `total` counts all
    /// rows matching the kind filter regardless of the window.
    #[instrument(skip(self, query), fields(account_id = %account_id))]
    pub async fn transaction_history(
        &self,
        account_id: Uuid,
        query: HistoryQuery,
    ) -> Result<TransactionPage, WalletError> {
        let query = HistoryQuery {
            limit: query.limit.min(100).max(1),
            offset: query.offset.max(0),
            kind: query.kind,
        };
        self.store.transactions_for(account_id, &query).await
    }

    /// Finalise a pending transaction to `completed` or `failed`. Returns
    /// `false` when the row is missing or already finalised. The flip is
    /// label-only and never adjusts a balance.
    #[instrument(skip(self), fields(transaction_id = %transaction_id, status = %status))]
    pub async fn update_transaction_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<bool, WalletError> {
        if status == TransactionStatus::Pending {
            return Err(WalletError::InvalidStatus(
                "pending is not a finalised status".to_string(),
            ));
        }

        let updated = self
            .store
            .set_transaction_status(transaction_id, status)
            .await?;
        Ok(updated.is_some())
    }
}
