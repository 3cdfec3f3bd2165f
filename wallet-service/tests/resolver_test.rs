//! Identifier classification and access decision tests.

mod common;

use chrono::{Duration, Utc};
use common::{build_services, eventually, fund_account, seed_content, seed_token};
use uuid::Uuid;
use wallet_service::error::WalletError;
use wallet_service::models::{AccessType, ContentItem, CreateTransaction, ShareToken, TransactionKind};
use wallet_service::services::Classification;

fn spend_on(account_id: Uuid, coins: i64, content_id: Uuid) -> CreateTransaction {
    CreateTransaction {
        account_id,
        kind: TransactionKind::Spend,
        coin_amount: coins,
        rupee_amount: None,
        related_content_type: Some("content".to_string()),
        related_content_id: Some(content_id),
        external_payment_id: None,
        description: "unlock".to_string(),
    }
}

#[tokio::test]
async fn canonical_uuid_classifies_as_direct_content() {
    let services = build_services();
    let item = seed_content(&services.catalog, Uuid::new_v4(), 100);

    let classification = services
        .resolver
        .classify(&item.id.to_string())
        .await
        .expect("Failed to classify");
    match classification {
        Classification::DirectContent(found) => assert_eq!(found.id, item.id),
        Classification::SharedToken(_) => panic!("content id classified as token"),
    }
}

#[tokio::test]
async fn uuid_shaped_string_can_still_be_a_token() {
    let services = build_services();
    let item = seed_content(&services.catalog, Uuid::new_v4(), 100);

    // Nothing stops a token generator emitting something UUID-shaped.
    let uuid_shaped = Uuid::new_v4().to_string();
    services.catalog.insert_token(ShareToken {
        token: uuid_shaped.clone(),
        content_id: item.id,
        issuer_account_id: item.owner_account_id,
        is_active: true,
        expires_at: None,
        click_count: 0,
        conversion_count: 0,
        last_accessed_at: None,
    });

    let classification = services
        .resolver
        .classify(&uuid_shaped)
        .await
        .expect("Failed to classify");
    assert!(matches!(classification, Classification::SharedToken(_)));
}

#[tokio::test]
async fn classification_misses_flavour_the_error_by_shape() {
    let services = build_services();

    let err = services
        .resolver
        .classify(&Uuid::new_v4().to_string())
        .await
        .expect_err("Expected a miss");
    match &err {
        WalletError::NotFound(inner) => {
            assert!(inner.to_string().contains("Content"), "got: {}", inner)
        }
        other => panic!("unexpected error: {}", other),
    }

    let err = services
        .resolver
        .classify("st_nothing_here")
        .await
        .expect_err("Expected a miss");
    match &err {
        WalletError::NotFound(inner) => {
            assert!(inner.to_string().contains("token"), "got: {}", inner)
        }
        other => panic!("unexpected error: {}", other),
    }

    for empty in ["", "   "] {
        let err = services
            .resolver
            .classify(empty)
            .await
            .expect_err("Expected rejection");
        assert!(matches!(err, WalletError::InvalidIdentifier(_)));
    }
}

#[tokio::test]
async fn owner_gets_self_access_without_any_purchase_row() {
    let services = build_services();
    let owner = Uuid::new_v4();
    let item = seed_content(&services.catalog, owner, 500);

    let resolution = services
        .resolver
        .resolve(&item.id.to_string(), Some(owner))
        .await
        .expect("Failed to resolve");

    assert!(resolution.access.has_access);
    assert_eq!(resolution.access.access_type, AccessType::SelfAccess);
    assert!(!resolution.access.requires_purchase);
    assert!(resolution.content.playback_url.is_some());
    assert_eq!(services.ledger.transaction_count(), 0);
}

#[tokio::test]
async fn free_content_is_open_to_anonymous_callers() {
    let services = build_services();
    let item = seed_content(&services.catalog, Uuid::new_v4(), 0);

    let resolution = services
        .resolver
        .resolve(&item.id.to_string(), None)
        .await
        .expect("Failed to resolve");

    assert!(resolution.access.has_access);
    assert_eq!(resolution.access.access_type, AccessType::Free);
    assert!(!resolution.access.requires_purchase);
    assert!(resolution.content.playback_url.is_some());
}

#[tokio::test]
async fn priced_content_redacts_playback_until_purchase() {
    let services = build_services();
    let item = seed_content(&services.catalog, Uuid::new_v4(), 300);

    for caller in [None, Some(Uuid::new_v4())] {
        let resolution = services
            .resolver
            .resolve(&item.id.to_string(), caller)
            .await
            .expect("Failed to resolve");

        assert!(!resolution.access.has_access);
        assert_eq!(
            resolution.access.access_type,
            AccessType::RequiresPurchase
        );
        assert!(resolution.access.requires_purchase);
        assert_eq!(resolution.content.playback_url, None);
        assert_eq!(resolution.content.price_coins, 300);
    }
}

#[tokio::test]
async fn token_path_labels_the_locked_state_as_preview() {
    let services = build_services();
    let item = seed_content(&services.catalog, Uuid::new_v4(), 300);
    let token = seed_token(&services.catalog, item.id, item.owner_account_id);

    let resolution = services
        .resolver
        .resolve(&token, Some(Uuid::new_v4()))
        .await
        .expect("Failed to resolve");

    assert!(!resolution.access.has_access);
    assert_eq!(resolution.access.access_type, AccessType::TokenPreview);
    assert!(resolution.access.requires_purchase);
    assert_eq!(resolution.access.share_token.as_deref(), Some(token.as_str()));
    assert_eq!(resolution.content.playback_url, None);
}

#[tokio::test]
async fn token_issuer_counts_as_self_even_when_not_the_owner() {
    let services = build_services();
    let issuer = Uuid::new_v4();
    let item = seed_content(&services.catalog, Uuid::new_v4(), 300);
    let token = seed_token(&services.catalog, item.id, issuer);

    let resolution = services
        .resolver
        .resolve(&token, Some(issuer))
        .await
        .expect("Failed to resolve");

    assert!(resolution.access.has_access);
    assert_eq!(resolution.access.access_type, AccessType::SelfAccess);
}

#[tokio::test]
async fn completed_spend_grants_owned_on_both_paths() {
    let services = build_services();
    let buyer = Uuid::new_v4();
    let item = seed_content(&services.catalog, Uuid::new_v4(), 250);
    let token = seed_token(&services.catalog, item.id, item.owner_account_id);

    fund_account(&services.wallet, buyer, 250).await;
    services
        .wallet
        .create_transaction(spend_on(buyer, 250, item.id))
        .await
        .expect("Failed to spend");

    let direct = services
        .resolver
        .resolve(&item.id.to_string(), Some(buyer))
        .await
        .unwrap();
    assert_eq!(direct.access.access_type, AccessType::Owned);
    assert!(direct.content.playback_url.is_some());
    assert_eq!(direct.access.share_token, None);

    let via_token = services.resolver.resolve(&token, Some(buyer)).await.unwrap();
    assert_eq!(via_token.access.access_type, AccessType::Owned);
    assert_eq!(
        via_token.access.share_token.as_deref(),
        Some(token.as_str())
    );
}

#[tokio::test]
async fn collection_spend_covers_every_member() {
    let services = build_services();
    let buyer = Uuid::new_v4();
    let owner = Uuid::new_v4();
    let collection_id = Uuid::new_v4();

    let members: Vec<ContentItem> = (0..3)
        .map(|i| {
            let id = Uuid::new_v4();
            let item = ContentItem {
                id,
                owner_account_id: owner,
                title: format!("Episode {}", i + 1),
                price_coins: 150,
                is_active: true,
                parent_collection_id: Some(collection_id),
                playback_url: Some(format!("https://cdn.test/{}.m3u8", id.simple())),
            };
            services.catalog.insert_content(item.clone());
            item
        })
        .collect();

    fund_account(&services.wallet, buyer, 400).await;
    services
        .wallet
        .create_transaction(spend_on(buyer, 400, collection_id))
        .await
        .expect("Failed to buy collection");

    for member in &members {
        let resolution = services
            .resolver
            .resolve(&member.id.to_string(), Some(buyer))
            .await
            .unwrap();
        assert_eq!(
            resolution.access.access_type,
            AccessType::Owned,
            "collection purchase must cover {}",
            member.title
        );
    }

    // One funding row and one collection spend; no per-member rows.
    assert_eq!(services.ledger.transaction_count(), 2);
}

#[tokio::test]
async fn resolution_is_repeatable_without_intervening_writes() {
    let services = build_services();
    let item = seed_content(&services.catalog, Uuid::new_v4(), 300);
    let caller = Some(Uuid::new_v4());

    let first = services
        .resolver
        .resolve(&item.id.to_string(), caller)
        .await
        .unwrap();
    let second = services
        .resolver
        .resolve(&item.id.to_string(), caller)
        .await
        .unwrap();

    assert_eq!(first.access.has_access, second.access.has_access);
    assert_eq!(first.access.access_type, second.access.access_type);
    assert_eq!(first.content.playback_url, second.content.playback_url);
    assert_eq!(services.ledger.transaction_count(), 0);
}

#[tokio::test]
async fn dead_tokens_and_inactive_content_read_as_not_found() {
    let services = build_services();
    let item = seed_content(&services.catalog, Uuid::new_v4(), 100);

    // Expired.
    services.catalog.insert_token(ShareToken {
        token: "st_expired".to_string(),
        content_id: item.id,
        issuer_account_id: item.owner_account_id,
        is_active: true,
        expires_at: Some(Utc::now() - Duration::hours(1)),
        click_count: 0,
        conversion_count: 0,
        last_accessed_at: None,
    });
    // Revoked.
    services.catalog.insert_token(ShareToken {
        token: "st_revoked".to_string(),
        content_id: item.id,
        issuer_account_id: item.owner_account_id,
        is_active: false,
        expires_at: None,
        click_count: 0,
        conversion_count: 0,
        last_accessed_at: None,
    });

    for dead in ["st_expired", "st_revoked"] {
        let err = services
            .resolver
            .resolve(dead, None)
            .await
            .expect_err("Expected dead token to miss");
        assert!(matches!(err, WalletError::NotFound(_)), "token: {}", dead);
    }

    // Inactive content is invisible on the direct path.
    let hidden_id = Uuid::new_v4();
    services.catalog.insert_content(ContentItem {
        id: hidden_id,
        owner_account_id: Uuid::new_v4(),
        title: "Unlisted".to_string(),
        price_coins: 100,
        is_active: false,
        parent_collection_id: None,
        playback_url: Some("https://cdn.test/unlisted.m3u8".to_string()),
    });
    let err = services
        .resolver
        .resolve(&hidden_id.to_string(), None)
        .await
        .expect_err("Expected inactive content to miss");
    assert!(matches!(err, WalletError::NotFound(_)));

    // A live token whose target went inactive dangles into not-found too.
    let dangling = seed_token(&services.catalog, hidden_id, Uuid::new_v4());
    let err = services
        .resolver
        .resolve(&dangling, None)
        .await
        .expect_err("Expected dangling token to miss");
    assert!(matches!(err, WalletError::NotFound(_)));
}

#[tokio::test]
async fn token_resolution_records_a_click_eventually() {
    let services = build_services();
    let item = seed_content(&services.catalog, Uuid::new_v4(), 0);
    let token = seed_token(&services.catalog, item.id, item.owner_account_id);

    services
        .resolver
        .resolve(&token, None)
        .await
        .expect("Failed to resolve");

    let catalog = services.catalog.clone();
    let token_name = token.clone();
    assert!(
        eventually(move || catalog.click_count(&token_name) == 1).await,
        "click count never reached 1"
    );
}

#[tokio::test]
async fn click_tracking_failure_never_fails_resolution() {
    let services = build_services();
    let item = seed_content(&services.catalog, Uuid::new_v4(), 0);
    let token = seed_token(&services.catalog, item.id, item.owner_account_id);
    services.catalog.set_fail_clicks(true);

    let resolution = services
        .resolver
        .resolve(&token, None)
        .await
        .expect("Resolution must survive counter failure");
    assert!(resolution.access.has_access);

    // Give the detached task time to run and fail.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(services.catalog.click_count(&token), 0);
}
