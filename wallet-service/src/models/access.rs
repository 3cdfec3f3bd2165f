//! Access-decision vocabulary returned by identifier resolution.

use crate::models::ContentItem;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How an identifier was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    Content,
    ShareToken,
}

impl IdentifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::ShareToken => "share_token",
        }
    }
}

/// Why access was (or was not) granted. The first four grant access; the
/// last two only differ by the entry path used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Owned,
    #[serde(rename = "self")]
    SelfAccess,
    Free,
    TokenPreview,
    RequiresPurchase,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owned => "owned",
            Self::SelfAccess => "self",
            Self::Free => "free",
            Self::TokenPreview => "token_preview",
            Self::RequiresPurchase => "requires_purchase",
        }
    }
}

impl std::fmt::Display for AccessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Computed entitlement for one caller and one piece of content. Derived,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessDecision {
    pub has_access: bool,
    pub access_type: AccessType,
    pub requires_purchase: bool,
    /// Present when the content was reached through a share token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_token: Option<String>,
}

impl AccessDecision {
    pub fn granted(access_type: AccessType, share_token: Option<String>) -> Self {
        Self {
            has_access: true,
            access_type,
            requires_purchase: false,
            share_token,
        }
    }

    pub fn payment_required(access_type: AccessType, share_token: Option<String>) -> Self {
        Self {
            has_access: false,
            access_type,
            requires_purchase: true,
            share_token,
        }
    }
}

/// Caller-facing content payload. The asset location is withheld unless
/// the decision grants access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentView {
    pub id: Uuid,
    pub owner_account_id: Uuid,
    pub title: String,
    pub price_coins: i64,
    pub parent_collection_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_url: Option<String>,
}

impl ContentView {
    pub fn new(item: &ContentItem, has_access: bool) -> Self {
        Self {
            id: item.id,
            owner_account_id: item.owner_account_id,
            title: item.title.clone(),
            price_coins: item.price_coins,
            parent_collection_id: item.parent_collection_id,
            playback_url: if has_access {
                item.playback_url.clone()
            } else {
                None
            },
        }
    }
}

/// Full resolution result for an opaque identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub kind: IdentifierKind,
    pub content: ContentView,
    pub access: AccessDecision,
}
