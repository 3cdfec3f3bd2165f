//! Catalog views consumed by the identifier resolver.
//!
//! The content platform owns these rows; this service reads them and, for
//! share tokens, updates the engagement counters as a best-effort side
//! effect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A piece of content as the catalog exposes it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub owner_account_id: Uuid,
    pub title: String,
    /// 0 means free; the sole free-content signal.
    pub price_coins: i64,
    pub is_active: bool,
    /// Ownership of the collection implies ownership of every member.
    pub parent_collection_id: Option<Uuid>,
    /// Asset location; must never reach a caller without access.
    pub playback_url: Option<String>,
}

/// A share-link token record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ShareToken {
    pub token: String,
    pub content_id: Uuid,
    pub issuer_account_id: Uuid,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub click_count: i64,
    pub conversion_count: i64,
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl ShareToken {
    /// Active and not past its expiry (absent expiry never expires).
    pub fn is_resolvable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.map_or(true, |at| at > now)
    }
}
