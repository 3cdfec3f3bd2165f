//! Storage seams for the wallet and catalog.
//!
//! `Database` implements both traits against PostgreSQL; tests substitute
//! in-memory doubles. Every balance-affecting write goes through
//! [`LedgerStore::apply_transaction`], which is the single authority for
//! funds checks and idempotent replay.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::WalletError;
use crate::models::{
    CoinTransaction, ContentItem, CreateTransaction, HistoryQuery, ShareToken, TransactionPage,
    TransactionReceipt, TransactionStatus, WalletAccount,
};

/// Persistence contract for accounts and coin transactions.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Fetch an account row. `AccountNotFound` if absent.
    async fn account(&self, account_id: Uuid) -> Result<WalletAccount, WalletError>;

    /// Current spendable balance. `AccountNotFound` if absent.
    async fn balance(&self, account_id: Uuid) -> Result<i64, WalletError>;

    /// Look up a transaction by its external payment reference.
    async fn transaction_by_payment_id(
        &self,
        external_payment_id: &str,
    ) -> Result<Option<CoinTransaction>, WalletError>;

    /// Atomically record a transaction and adjust the balance.
    ///
    /// For `Spend` the decrement is conditional on sufficient funds;
    /// `InsufficientFunds` is returned without writing anything. If
    /// `external_payment_id` was already recorded the existing transaction
    /// is returned unchanged (replay, not an error). Every row lands
    /// `completed`, in the same database transaction as its balance effect.
    async fn apply_transaction(
        &self,
        input: &CreateTransaction,
    ) -> Result<TransactionReceipt, WalletError>;

    /// Page through an account's transactions, newest first.
    async fn transactions_for(
        &self,
        account_id: Uuid,
        query: &HistoryQuery,
    ) -> Result<TransactionPage, WalletError>;

    /// Finalise a pending transaction's lifecycle label. `None` when the
    /// row is missing or already finalised. Label only; the balance and
    /// lifetime counters are never touched here.
    async fn set_transaction_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<Option<CoinTransaction>, WalletError>;

    /// True when the account has a completed spend against any of the
    /// given content ids.
    async fn has_completed_spend(
        &self,
        account_id: Uuid,
        content_ids: &[Uuid],
    ) -> Result<bool, WalletError>;
}

/// Read side of the content catalog plus share-token counters.
#[async_trait]
pub trait ContentCatalog: Send + Sync {
    /// Fetch an active content item. Inactive rows resolve as absent.
    async fn content_by_id(&self, content_id: Uuid) -> Result<Option<ContentItem>, WalletError>;

    /// Fetch an active, unexpired share token. Revoked or expired tokens
    /// resolve as absent.
    async fn share_token(&self, token: &str) -> Result<Option<ShareToken>, WalletError>;

    /// Bump a token's click counter and last-accessed timestamp.
    async fn record_click(&self, token: &str) -> Result<(), WalletError>;

    /// Bump a token's conversion counter.
    async fn record_conversion(&self, token: &str) -> Result<(), WalletError>;
}
