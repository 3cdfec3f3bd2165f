//! Identifier resolution and access decisions.
//!
//! A caller hands over one opaque string. It is either a content id
//! (canonical UUID form) or a share-link token; classification settles
//! which in a single pass, and the access decision then applies a fixed
//! precedence: self, owned, free, payment required.

use std::sync::Arc;

use tracing::{instrument, warn};
use uuid::Uuid;

use crate::error::WalletError;
use crate::models::{
    AccessDecision, AccessType, ContentItem, ContentView, IdentifierKind, Resolution, ShareToken,
};
use crate::services::metrics::{ERRORS_TOTAL, RESOLUTIONS_TOTAL};
use crate::services::store::{ContentCatalog, LedgerStore};

/// What an identifier turned out to be. Misses are `NotFound` errors, so
/// a classification always carries the matched row.
#[derive(Debug, Clone)]
pub enum Classification {
    DirectContent(ContentItem),
    SharedToken(ShareToken),
}

/// Resolves opaque identifiers into content plus an access decision.
#[derive(Clone)]
pub struct IdentifierResolver {
    catalog: Arc<dyn ContentCatalog>,
    ledger: Arc<dyn LedgerStore>,
}

impl IdentifierResolver {
    pub fn new(catalog: Arc<dyn ContentCatalog>, ledger: Arc<dyn LedgerStore>) -> Self {
        Self { catalog, ledger }
    }

    /// Classify an identifier as direct content or a share token.
    ///
    /// Content wins the UUID-shaped case; a UUID that names no active
    /// content still falls through to the token lookup, since tokens are
    /// opaque and nothing stops one looking like a UUID. A token hit
    /// records a click as a detached task.
    #[instrument(skip(self, identifier))]
    pub async fn classify(&self, identifier: &str) -> Result<Classification, WalletError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(WalletError::InvalidIdentifier(
                "empty identifier".to_string(),
            ));
        }

        let direct_id = canonical_uuid(identifier);
        if let Some(content_id) = direct_id {
            if let Some(item) = self.catalog.content_by_id(content_id).await? {
                return Ok(Classification::DirectContent(item));
            }
        }

        if let Some(token) = self.catalog.share_token(identifier).await? {
            self.track_click(token.token.clone());
            return Ok(Classification::SharedToken(token));
        }

        if direct_id.is_some() {
            Err(WalletError::NotFound(anyhow::anyhow!(
                "Content {} not found",
                identifier
            )))
        } else {
            Err(WalletError::NotFound(anyhow::anyhow!(
                "Share token not found"
            )))
        }
    }

    /// Resolve an identifier for a caller: classification, access decision
    /// and the redacted content view in one call.
    ///
    /// Aside from the detached click counter this reads no mutable state,
    /// so resolving twice without intervening writes yields the same
    /// decision.
    #[instrument(skip(self, identifier), fields(caller = ?caller))]
    pub async fn resolve(
        &self,
        identifier: &str,
        caller: Option<Uuid>,
    ) -> Result<Resolution, WalletError> {
        let parts = self.resolve_parts(identifier, caller).await;

        match parts {
            Ok((kind, item, access)) => {
                RESOLUTIONS_TOTAL
                    .with_label_values(&[kind.as_str(), access.access_type.as_str()])
                    .inc();
                Ok(Resolution {
                    kind,
                    content: ContentView::new(&item, access.has_access),
                    access,
                })
            }
            Err(e) => {
                ERRORS_TOTAL.with_label_values(&[e.metric_label()]).inc();
                Err(e)
            }
        }
    }

    /// Resolution with the unredacted content row, for the unlock flow.
    pub(crate) async fn resolve_parts(
        &self,
        identifier: &str,
        caller: Option<Uuid>,
    ) -> Result<(IdentifierKind, ContentItem, AccessDecision), WalletError> {
        match self.classify(identifier).await? {
            Classification::DirectContent(item) => {
                let access = self.decide_access(&item, caller, None).await?;
                Ok((IdentifierKind::Content, item, access))
            }
            Classification::SharedToken(token) => {
                let (item, access) = self.token_content_access(&token, caller).await?;
                Ok((IdentifierKind::ShareToken, item, access))
            }
        }
    }

    /// Content row and access decision behind a classified token. The
    /// token's target may have been deactivated since issue; that reads as
    /// not found, same as a dangling id.
    pub(crate) async fn token_content_access(
        &self,
        token: &ShareToken,
        caller: Option<Uuid>,
    ) -> Result<(ContentItem, AccessDecision), WalletError> {
        let item = self
            .catalog
            .content_by_id(token.content_id)
            .await?
            .ok_or_else(|| {
                WalletError::NotFound(anyhow::anyhow!("Content behind share token not found"))
            })?;

        let access = self.decide_access(&item, caller, Some(token)).await?;
        Ok((item, access))
    }

    /// Fixed-precedence access decision: self, owned, free, then payment
    /// required (labelled `token_preview` on the token path).
    async fn decide_access(
        &self,
        item: &ContentItem,
        caller: Option<Uuid>,
        token: Option<&ShareToken>,
    ) -> Result<AccessDecision, WalletError> {
        let share_token = token.map(|t| t.token.clone());

        if let Some(caller_id) = caller {
            let is_self = caller_id == item.owner_account_id
                || token.map_or(false, |t| t.issuer_account_id == caller_id);
            if is_self {
                return Ok(AccessDecision::granted(AccessType::SelfAccess, share_token));
            }

            // A spend on the parent collection covers every member.
            let mut purchasable = vec![item.id];
            if let Some(collection_id) = item.parent_collection_id {
                purchasable.push(collection_id);
            }
            if self
                .ledger
                .has_completed_spend(caller_id, &purchasable)
                .await?
            {
                return Ok(AccessDecision::granted(AccessType::Owned, share_token));
            }
        }

        if item.price_coins == 0 {
            return Ok(AccessDecision::granted(AccessType::Free, share_token));
        }

        let access_type = if token.is_some() {
            AccessType::TokenPreview
        } else {
            AccessType::RequiresPurchase
        };
        Ok(AccessDecision::payment_required(access_type, share_token))
    }

    /// Detached click tracking. Engagement counters must never block or
    /// fail a resolution, so the write runs on its own task and failures
    /// end at a log line.
    fn track_click(&self, token: String) {
        let catalog = Arc::clone(&self.catalog);
        tokio::spawn(async move {
            if let Err(e) = catalog.record_click(&token).await {
                warn!(error = %e, "Click tracking failed");
            }
        });
    }
}

/// Exact canonical UUID form. Share tokens are opaque strings, so only the
/// 36-char hyphenated shape is read as a content id; everything else goes
/// to the token lookup untouched.
fn canonical_uuid(identifier: &str) -> Option<Uuid> {
    if identifier.len() != 36 {
        return None;
    }
    Uuid::parse_str(identifier).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_uuid_accepts_hyphenated_form_only() {
        assert!(canonical_uuid("b3e9c8a2-4f1d-4c6e-9b7a-2d8f0e1a5c43").is_some());
        // Simple form parses as a UUID but is not the canonical shape.
        assert!(canonical_uuid("b3e9c8a24f1d4c6e9b7a2d8f0e1a5c43").is_none());
        assert!(canonical_uuid("tok_4f1d4c6e9b7a").is_none());
        assert!(canonical_uuid("").is_none());
        // Right length, not a UUID.
        assert!(canonical_uuid("tok_this-is-thirty-six-characters-xx").is_none());
    }
}
