//! PostgreSQL store for wallet-service.
//!
//! Implements [`LedgerStore`] and [`ContentCatalog`] over a shared
//! connection pool. The ledger's balance writes happen inside a single
//! database transaction with the row insert, so readers observe pre-state
//! or post-state and nothing in between.

use crate::error::{store_error, WalletError};
use crate::models::{
    CoinTransaction, ContentItem, CreateTransaction, HistoryQuery, ShareToken, TransactionKind,
    TransactionPage, TransactionReceipt, TransactionStatus, WalletAccount,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{ContentCatalog, LedgerStore};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "wallet-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, WalletError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| store_error("Failed to connect", e))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), WalletError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Health check failed", e))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), WalletError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| WalletError::Internal(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Fetch the transaction recorded under an external payment id. Used on
    /// the replay paths, where the row is known to exist.
    async fn replayed_receipt(&self, key: &str) -> Result<Option<TransactionReceipt>, WalletError> {
        let existing = sqlx::query_as::<_, CoinTransaction>(
            r#"
            SELECT id, account_id, kind, coin_amount, rupee_amount, related_content_type, related_content_id, external_payment_id, status, description, created_at
            FROM coin_transactions
            WHERE external_payment_id = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch existing transaction", e))?;

        let transaction = match existing {
            Some(t) => t,
            None => return Ok(None),
        };

        let new_balance =
            sqlx::query_scalar::<_, i64>("SELECT coin_balance FROM accounts WHERE id = $1")
                .bind(transaction.account_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| store_error("Failed to fetch balance", e))?
                .unwrap_or(0);

        Ok(Some(TransactionReceipt {
            transaction,
            new_balance,
        }))
    }
}

#[async_trait]
impl LedgerStore for Database {
    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn account(&self, account_id: Uuid) -> Result<WalletAccount, WalletError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["account"])
            .start_timer();

        let account = sqlx::query_as::<_, WalletAccount>(
            r#"
            SELECT id, coin_balance, total_coins_purchased, total_coins_earned, total_coins_spent, total_coins_refunded, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch account", e))?;

        timer.observe_duration();

        account.ok_or(WalletError::AccountNotFound(account_id))
    }

    #[instrument(skip(self), fields(account_id = %account_id))]
    async fn balance(&self, account_id: Uuid) -> Result<i64, WalletError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["balance"])
            .start_timer();

        let balance =
            sqlx::query_scalar::<_, i64>("SELECT coin_balance FROM accounts WHERE id = $1")
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| store_error("Failed to fetch balance", e))?;

        timer.observe_duration();

        balance.ok_or(WalletError::AccountNotFound(account_id))
    }

    #[instrument(skip(self, external_payment_id))]
    async fn transaction_by_payment_id(
        &self,
        external_payment_id: &str,
    ) -> Result<Option<CoinTransaction>, WalletError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["transaction_by_payment_id"])
            .start_timer();

        let transaction = sqlx::query_as::<_, CoinTransaction>(
            r#"
            SELECT id, account_id, kind, coin_amount, rupee_amount, related_content_type, related_content_id, external_payment_id, status, description, created_at
            FROM coin_transactions
            WHERE external_payment_id = $1
            "#,
        )
        .bind(external_payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch transaction", e))?;

        timer.observe_duration();

        Ok(transaction)
    }

    #[instrument(skip(self, input), fields(account_id = %input.account_id, kind = %input.kind, coin_amount = input.coin_amount))]
    async fn apply_transaction(
        &self,
        input: &CreateTransaction,
    ) -> Result<TransactionReceipt, WalletError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["apply_transaction"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("Failed to begin transaction", e))?;

        // Replay pre-check. The UNIQUE constraint is the real guard; this
        // just answers the common retry without burning a balance update.
        if let Some(key) = input.external_payment_id.as_deref() {
            let existing = sqlx::query_scalar::<_, Uuid>(
                "SELECT id FROM coin_transactions WHERE external_payment_id = $1",
            )
            .bind(key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| store_error("Failed to check payment id", e))?;

            if existing.is_some() {
                tx.rollback().await.ok();
                timer.observe_duration();
                return match self.replayed_receipt(key).await? {
                    Some(receipt) => Ok(receipt),
                    None => Err(WalletError::Internal(anyhow::anyhow!(
                        "Payment id {} recorded without a transaction row",
                        key
                    ))),
                };
            }
        }

        // Balance adjustment first so the account row lock is held for the
        // rest of the unit. Spend is a single conditional decrement: the
        // WHERE clause is the only funds authority in the system.
        let new_balance = match input.kind {
            TransactionKind::Spend => {
                let updated = sqlx::query_scalar::<_, i64>(
                    r#"
                    UPDATE accounts
                    SET coin_balance = coin_balance - $2,
                        total_coins_spent = total_coins_spent + $2,
                        updated_at = now()
                    WHERE id = $1 AND coin_balance >= $2
                    RETURNING coin_balance
                    "#,
                )
                .bind(input.account_id)
                .bind(input.coin_amount)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| store_error("Failed to debit account", e))?;

                match updated {
                    Some(balance) => balance,
                    None => {
                        // Decrement refused: funds short, or no row (zero
                        // balance). Report the balance actually observed.
                        let available = sqlx::query_scalar::<_, i64>(
                            "SELECT coin_balance FROM accounts WHERE id = $1",
                        )
                        .bind(input.account_id)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(|e| store_error("Failed to fetch balance", e))?
                        .unwrap_or(0);

                        tx.rollback().await.ok();
                        timer.observe_duration();
                        return Err(WalletError::insufficient(input.coin_amount, available));
                    }
                }
            }
            kind => {
                // Credits provision the wallet row on first touch.
                sqlx::query("INSERT INTO accounts (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
                    .bind(input.account_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| store_error("Failed to provision account", e))?;

                let credit_sql = format!(
                    r#"
                    UPDATE accounts
                    SET coin_balance = coin_balance + $2,
                        {counter} = {counter} + $2,
                        updated_at = now()
                    WHERE id = $1
                    RETURNING coin_balance
                    "#,
                    counter = kind.counter_column()
                );

                sqlx::query_scalar::<_, i64>(&credit_sql)
                    .bind(input.account_id)
                    .bind(input.coin_amount)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| store_error("Failed to credit account", e))?
            }
        };

        let transaction_id = Uuid::new_v4();
        let result = sqlx::query_as::<_, CoinTransaction>(
            r#"
            INSERT INTO coin_transactions (id, account_id, kind, coin_amount, rupee_amount, related_content_type, related_content_id, external_payment_id, status, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'completed', $9)
            RETURNING id, account_id, kind, coin_amount, rupee_amount, related_content_type, related_content_id, external_payment_id, status, description, created_at
            "#,
        )
        .bind(transaction_id)
        .bind(input.account_id)
        .bind(input.kind.as_str())
        .bind(input.coin_amount)
        .bind(input.rupee_amount)
        .bind(input.related_content_type.as_deref())
        .bind(input.related_content_id)
        .bind(input.external_payment_id.as_deref())
        .bind(&input.description)
        .fetch_one(&mut *tx)
        .await;

        let transaction = match result {
            Ok(inserted) => inserted,
            Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
                // Payment id race: another request won between our
                // pre-check and insert. Roll back our balance change and
                // return the winner's row.
                tx.rollback().await.ok();
                if let Some(key) = input.external_payment_id.as_deref() {
                    if let Some(receipt) = self.replayed_receipt(key).await? {
                        timer.observe_duration();
                        return Ok(receipt);
                    }
                }
                return Err(WalletError::Internal(anyhow::anyhow!(
                    "Duplicate transaction id"
                )));
            }
            Err(e) => {
                return Err(store_error("Failed to insert transaction", e));
            }
        };

        tx.commit()
            .await
            .map_err(|e| store_error("Failed to commit transaction", e))?;

        timer.observe_duration();

        info!(
            transaction_id = %transaction.id,
            kind = %transaction.kind,
            new_balance = new_balance,
            "Transaction recorded"
        );

        Ok(TransactionReceipt {
            transaction,
            new_balance,
        })
    }

    #[instrument(skip(self, query), fields(account_id = %account_id))]
    async fn transactions_for(
        &self,
        account_id: Uuid,
        query: &HistoryQuery,
    ) -> Result<TransactionPage, WalletError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["transactions_for"])
            .start_timer();

        let kind = query.kind.map(|k| k.as_str());

        let transactions = sqlx::query_as::<_, CoinTransaction>(
            r#"
            SELECT id, account_id, kind, coin_amount, rupee_amount, related_content_type, related_content_id, external_payment_id, status, description, created_at
            FROM coin_transactions
            WHERE account_id = $1
              AND ($2::varchar IS NULL OR kind = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(account_id)
        .bind(kind)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch transactions", e))?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM coin_transactions
            WHERE account_id = $1
              AND ($2::varchar IS NULL OR kind = $2)
            "#,
        )
        .bind(account_id)
        .bind(kind)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error("Failed to count transactions", e))?;

        timer.observe_duration();

        Ok(TransactionPage {
            transactions,
            total,
        })
    }

    #[instrument(skip(self), fields(transaction_id = %transaction_id, status = %status))]
    async fn set_transaction_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<Option<CoinTransaction>, WalletError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["set_transaction_status"])
            .start_timer();

        // Label flip only. Pending rows never carried a balance effect, so
        // finalising one must not create it.
        let updated = sqlx::query_as::<_, CoinTransaction>(
            r#"
            UPDATE coin_transactions
            SET status = $2
            WHERE id = $1 AND status = 'pending'
            RETURNING id, account_id, kind, coin_amount, rupee_amount, related_content_type, related_content_id, external_payment_id, status, description, created_at
            "#,
        )
        .bind(transaction_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to update transaction status", e))?;

        timer.observe_duration();

        Ok(updated)
    }

    #[instrument(skip(self, content_ids), fields(account_id = %account_id))]
    async fn has_completed_spend(
        &self,
        account_id: Uuid,
        content_ids: &[Uuid],
    ) -> Result<bool, WalletError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["has_completed_spend"])
            .start_timer();

        let owned = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM coin_transactions
                WHERE account_id = $1
                  AND kind = 'spend'
                  AND status = 'completed'
                  AND related_content_id = ANY($2)
            )
            "#,
        )
        .bind(account_id)
        .bind(content_ids)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error("Failed to check purchase record", e))?;

        timer.observe_duration();

        Ok(owned)
    }
}

#[async_trait]
impl ContentCatalog for Database {
    #[instrument(skip(self), fields(content_id = %content_id))]
    async fn content_by_id(&self, content_id: Uuid) -> Result<Option<ContentItem>, WalletError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["content_by_id"])
            .start_timer();

        let item = sqlx::query_as::<_, ContentItem>(
            r#"
            SELECT id, owner_account_id, title, price_coins, is_active, parent_collection_id, playback_url
            FROM content_items
            WHERE id = $1 AND is_active = TRUE
            "#,
        )
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch content", e))?;

        timer.observe_duration();

        Ok(item)
    }

    #[instrument(skip(self, token))]
    async fn share_token(&self, token: &str) -> Result<Option<ShareToken>, WalletError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["share_token"])
            .start_timer();

        let found = sqlx::query_as::<_, ShareToken>(
            r#"
            SELECT token, content_id, issuer_account_id, is_active, expires_at, click_count, conversion_count, last_accessed_at
            FROM share_tokens
            WHERE token = $1
              AND is_active = TRUE
              AND (expires_at IS NULL OR expires_at > now())
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("Failed to fetch share token", e))?;

        timer.observe_duration();

        Ok(found)
    }

    #[instrument(skip(self, token))]
    async fn record_click(&self, token: &str) -> Result<(), WalletError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_click"])
            .start_timer();

        sqlx::query(
            r#"
            UPDATE share_tokens
            SET click_count = click_count + 1, last_accessed_at = now()
            WHERE token = $1
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("Failed to record click", e))?;

        timer.observe_duration();

        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn record_conversion(&self, token: &str) -> Result<(), WalletError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_conversion"])
            .start_timer();

        sqlx::query("UPDATE share_tokens SET conversion_count = conversion_count + 1 WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("Failed to record conversion", e))?;

        timer.observe_duration();

        Ok(())
    }
}
