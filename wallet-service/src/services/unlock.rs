//! Paid unlock through a share link.
//!
//! The only purchase path in the system: a share token resolves to
//! content, the caller's coins cover the price, and one atomic spend
//! grants access. Direct content ids are refused here so that every
//! unlock is attributable to the link that produced it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::WalletError;
use crate::models::{AccessType, ContentView, CreateTransaction, TransactionKind};
use crate::services::metrics::{ERRORS_TOTAL, UNLOCKS_TOTAL};
use crate::services::resolver::{Classification, IdentifierResolver};
use crate::services::store::ContentCatalog;
use crate::services::wallet::WalletService;

/// Result of an unlock attempt. `new_balance` and `transaction_id` are
/// present only when coins actually moved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockOutcome {
    pub granted: bool,
    pub access_type: AccessType,
    pub content: ContentView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<Uuid>,
}

/// Orchestrates resolution, the coin spend and the conversion counter.
#[derive(Clone)]
pub struct UnlockService {
    resolver: Arc<IdentifierResolver>,
    wallet: Arc<WalletService>,
    catalog: Arc<dyn ContentCatalog>,
}

impl UnlockService {
    pub fn new(
        resolver: Arc<IdentifierResolver>,
        wallet: Arc<WalletService>,
        catalog: Arc<dyn ContentCatalog>,
    ) -> Self {
        Self {
            resolver,
            wallet,
            catalog,
        }
    }

    /// Unlock the content behind a share token for the calling account.
    ///
    /// Already-accessible content (own, previously bought, free) succeeds
    /// without touching the ledger. A paid unlock debits exactly the
    /// price in one atomic spend; on a funds race the late
    /// `InsufficientFunds` surfaces unchanged and nothing is granted.
    #[instrument(skip(self, identifier), fields(caller = ?caller))]
    pub async fn unlock_via_token(
        &self,
        identifier: &str,
        caller: Option<Uuid>,
    ) -> Result<UnlockOutcome, WalletError> {
        match self.try_unlock(identifier, caller).await {
            Ok(outcome) => {
                let label = if outcome.transaction_id.is_some() {
                    "granted"
                } else {
                    "already_accessible"
                };
                UNLOCKS_TOTAL.with_label_values(&[label]).inc();
                Ok(outcome)
            }
            Err(e @ WalletError::InsufficientFunds { .. }) => {
                UNLOCKS_TOTAL
                    .with_label_values(&["insufficient_funds"])
                    .inc();
                Err(e)
            }
            Err(e) => {
                UNLOCKS_TOTAL.with_label_values(&["error"]).inc();
                ERRORS_TOTAL.with_label_values(&[e.metric_label()]).inc();
                Err(e)
            }
        }
    }

    async fn try_unlock(
        &self,
        identifier: &str,
        caller: Option<Uuid>,
    ) -> Result<UnlockOutcome, WalletError> {
        let token = match self.resolver.classify(identifier).await? {
            Classification::SharedToken(token) => token,
            Classification::DirectContent(item) => {
                return Err(WalletError::WrongEndpoint(format!(
                    "{} is a content id; unlocking requires a share link",
                    item.id
                )));
            }
        };

        let (item, access) = self.resolver.token_content_access(&token, caller).await?;

        if access.has_access {
            return Ok(UnlockOutcome {
                granted: true,
                access_type: access.access_type,
                content: ContentView::new(&item, true),
                new_balance: None,
                transaction_id: None,
            });
        }

        let caller_id = caller.ok_or_else(|| {
            WalletError::Unauthorized("unlocking paid content requires a signed-in account".to_string())
        })?;

        // Early precise shortfall for the caller's top-up prompt. The
        // spend below re-checks atomically and is the authority.
        let sufficiency = self
            .wallet
            .check_sufficient_coins(caller_id, item.price_coins)
            .await?;
        if !sufficiency.sufficient {
            return Err(WalletError::insufficient(
                item.price_coins,
                sufficiency.balance,
            ));
        }

        let receipt = self
            .wallet
            .create_transaction(CreateTransaction {
                account_id: caller_id,
                kind: TransactionKind::Spend,
                coin_amount: item.price_coins,
                rupee_amount: None,
                related_content_type: Some("content".to_string()),
                related_content_id: Some(item.id),
                external_payment_id: None,
                description: format!("Unlocked \"{}\" via share link", item.title),
            })
            .await?;

        self.track_conversion(token.token.clone());

        info!(
            content_id = %item.id,
            transaction_id = %receipt.transaction.id,
            new_balance = receipt.new_balance,
            "Content unlocked"
        );

        Ok(UnlockOutcome {
            granted: true,
            access_type: AccessType::Owned,
            content: ContentView::new(&item, true),
            new_balance: Some(receipt.new_balance),
            transaction_id: Some(receipt.transaction.id),
        })
    }

    /// Detached conversion tracking. The payment has committed by now;
    /// a counter failure is logged and never unwinds it.
    fn track_conversion(&self, token: String) {
        let catalog = Arc::clone(&self.catalog);
        tokio::spawn(async move {
            if let Err(e) = catalog.record_conversion(&token).await {
                warn!(error = %e, "Conversion tracking failed");
            }
        });
    }
}
