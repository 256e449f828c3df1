//! End-to-end tests for the exchange orchestrator.
//!
//! These walk the full lifecycle through the service layer with a disabled
//! notifier: request, accept, dual confirmation with awards and badge
//! unlocks, mutual rating with rating recomputation, and every
//! authorization / state-machine rejection along the way.

use std::sync::Arc;

use assert_matches::assert_matches;
use sqlx::PgPool;

use reloop_core::error::CoreError;
use reloop_core::points::Level;
use reloop_core::types::DbId;
use reloop_db::models::item::{CreateItem, Item};
use reloop_db::models::user::{CreateUser, User};
use reloop_db::repositories::{ItemRepo, UserRepo};
use reloop_events::Notifier;
use reloop_service::{EconomyService, ExchangeService, InitiateExchange};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn services(pool: &PgPool) -> (ExchangeService, EconomyService) {
    (
        ExchangeService::new(pool.clone(), Arc::new(Notifier::disabled())),
        EconomyService::new(pool.clone()),
    )
}

async fn seed_verified_user(pool: &PgPool, name: &str) -> User {
    let created = UserRepo::create(
        pool,
        &CreateUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
        },
    )
    .await
    .unwrap();
    UserRepo::mark_verified(pool, created.id).await.unwrap().unwrap()
}

async fn seed_item(pool: &PgPool, owner_id: DbId, title: &str) -> Item {
    ItemRepo::create(
        pool,
        &CreateItem {
            owner_id,
            title: title.to_string(),
            description: Some("Still works".to_string()),
        },
    )
    .await
    .unwrap()
}

fn offer(item: &Item, giver: &User, receiver: &User) -> InitiateExchange {
    InitiateExchange {
        item_id: item.id,
        giver_id: giver.id,
        receiver_id: receiver.id,
        message: None,
        scheduled_pickup: None,
    }
}

// ---------------------------------------------------------------------------
// Test: the full happy path, including awards and badge unlocks
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_lifecycle(pool: PgPool) {
    let (exchanges, economy) = services(&pool);
    let giver = seed_verified_user(&pool, "giver").await;
    let receiver = seed_verified_user(&pool, "receiver").await;
    let item = seed_item(&pool, giver.id, "Coffee grinder").await;

    let exchange = exchanges.initiate(&offer(&item, &giver, &receiver)).await.unwrap();
    assert_eq!(exchange.status, "requested");

    let exchange = exchanges.accept(exchange.id, receiver.id, None).await.unwrap();
    assert_eq!(exchange.status, "accepted");

    let first = exchanges
        .confirm_handoff(exchange.id, giver.id, None)
        .await
        .unwrap();
    assert!(!first.completed_now);
    assert_eq!(first.exchange.status, "accepted");

    let second = exchanges
        .confirm_handoff(exchange.id, receiver.id, None)
        .await
        .unwrap();
    assert!(second.completed_now);
    assert_eq!(second.exchange.status, "completed");
    assert_eq!(second.exchange.eco_points_awarded, 125);

    // Giver: 125 completion points plus unlock rewards for First Post (10),
    // First Exchange (25), Beginner (25), and Trusted Member (50).
    let (balance, level) = economy.balance_and_level(giver.id).await.unwrap();
    assert_eq!(balance, 235);
    assert_eq!(level, Level::Beginner);

    // Receiver: 62 completion points plus First Exchange (25) and
    // Trusted Member (50); Beginner stays in progress.
    let (balance, level) = economy.balance_and_level(receiver.id).await.unwrap();
    assert_eq!(balance, 137);
    assert_eq!(level, Level::Beginner);

    let giver_badges: Vec<String> = economy
        .user_achievements(giver.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|a| a.unlocked_at.is_some())
        .map(|a| a.badge_name)
        .collect();
    for name in ["First Post", "First Exchange", "Beginner", "Trusted Member"] {
        assert!(giver_badges.iter().any(|b| b == name), "giver missing {name}");
    }

    let receiver_rows = economy.user_achievements(receiver.id).await.unwrap();
    let beginner = receiver_rows
        .iter()
        .find(|a| a.badge_name == "Beginner")
        .expect("progress row recorded");
    assert!(beginner.unlocked_at.is_none());
    assert_eq!(beginner.progress, 62.0);
    assert!(
        receiver_rows.iter().all(|a| a.badge_name != "Community Star"),
        "custom badges are never auto-tracked"
    );

    // Repeating a confirmation after completion is a quiet no-op.
    let repeat = exchanges
        .confirm_handoff(exchange.id, giver.id, None)
        .await
        .unwrap();
    assert!(!repeat.completed_now);
    let (balance, _) = economy.balance_and_level(giver.id).await.unwrap();
    assert_eq!(balance, 235, "repeat confirmation must not award again");
}

// ---------------------------------------------------------------------------
// Test: a second request for the same item is a conflict
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_request_conflicts(pool: PgPool) {
    let (exchanges, _) = services(&pool);
    let giver = seed_verified_user(&pool, "giver").await;
    let receiver = seed_verified_user(&pool, "receiver").await;
    let other = seed_verified_user(&pool, "other").await;
    let item = seed_item(&pool, giver.id, "Bookshelf").await;

    exchanges.initiate(&offer(&item, &giver, &receiver)).await.unwrap();

    let err = exchanges
        .initiate(&offer(&item, &giver, &other))
        .await
        .unwrap_err();
    assert_matches!(err.as_core(), Some(CoreError::Conflict(_)));
}

// ---------------------------------------------------------------------------
// Test: two concurrent requests race, and the loser sees a conflict
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_requests_one_wins(pool: PgPool) {
    let (exchanges, _) = services(&pool);
    let giver = seed_verified_user(&pool, "giver").await;
    let receiver = seed_verified_user(&pool, "receiver").await;
    let other = seed_verified_user(&pool, "other").await;
    let item = seed_item(&pool, giver.id, "Floor lamp").await;

    // Both callers pass the advisory pre-check before either commits, so the
    // loser is decided at the storage layer. Whichever path reports the loss
    // (reservation miss or unique index), it must read as a conflict, never
    // as a plain unavailable item.
    let offer_a = offer(&item, &giver, &receiver);
    let offer_b = offer(&item, &giver, &other);
    let (first, second) = tokio::join!(
        exchanges.initiate(&offer_a),
        exchanges.initiate(&offer_b),
    );

    let (winner, loser) = match (first, second) {
        (Ok(exchange), Err(err)) => (exchange, err),
        (Err(err), Ok(exchange)) => (exchange, err),
        (a, b) => panic!("expected exactly one winner, got {a:?} / {b:?}"),
    };
    assert_eq!(winner.status, "requested");
    assert_matches!(loser.as_core(), Some(CoreError::Conflict(_)));

    let item = ItemRepo::find_by_id(&pool, item.id).await.unwrap().unwrap();
    assert_eq!(item.status, "pending");
}

// ---------------------------------------------------------------------------
// Test: every initiation gate
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_initiation_gates(pool: PgPool) {
    let (exchanges, _) = services(&pool);
    let giver = seed_verified_user(&pool, "giver").await;
    let receiver = seed_verified_user(&pool, "receiver").await;
    let item = seed_item(&pool, giver.id, "Kettle").await;

    // Unknown item.
    let mut input = offer(&item, &giver, &receiver);
    input.item_id = 999_999;
    assert_matches!(
        exchanges.initiate(&input).await.unwrap_err().as_core(),
        Some(CoreError::NotFound { entity: "Item", .. })
    );

    // Offering someone else's item.
    let interloper = seed_verified_user(&pool, "interloper").await;
    assert_matches!(
        exchanges
            .initiate(&offer(&item, &interloper, &receiver))
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::Authorization(_))
    );

    // Self-exchange.
    assert_matches!(
        exchanges
            .initiate(&offer(&item, &giver, &giver))
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::BusinessLogic(_))
    );

    // Unverified receiver.
    let unverified = UserRepo::create(
        &pool,
        &CreateUser {
            username: "newbie".to_string(),
            email: "newbie@example.com".to_string(),
        },
    )
    .await
    .unwrap();
    assert_matches!(
        exchanges
            .initiate(&offer(&item, &giver, &unverified))
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::BusinessLogic(_))
    );

    // Giver rating below the initiation floor.
    UserRepo::update_rating(&pool, giver.id, 1.5).await.unwrap();
    assert_matches!(
        exchanges
            .initiate(&offer(&item, &giver, &receiver))
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::BusinessLogic(_))
    );
    UserRepo::update_rating(&pool, giver.id, 5.0).await.unwrap();

    // Oversized message.
    let mut input = offer(&item, &giver, &receiver);
    input.message = Some("x".repeat(1_001));
    assert_matches!(
        exchanges.initiate(&input).await.unwrap_err().as_core(),
        Some(CoreError::Validation(_))
    );
}

// ---------------------------------------------------------------------------
// Test: accept is receiver-only and single-shot
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_accept_rules(pool: PgPool) {
    let (exchanges, _) = services(&pool);
    let giver = seed_verified_user(&pool, "giver").await;
    let receiver = seed_verified_user(&pool, "receiver").await;
    let item = seed_item(&pool, giver.id, "Blender").await;
    let exchange = exchanges.initiate(&offer(&item, &giver, &receiver)).await.unwrap();

    assert_matches!(
        exchanges
            .accept(exchange.id, giver.id, None)
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::Authorization(_))
    );

    exchanges.accept(exchange.id, receiver.id, None).await.unwrap();

    assert_matches!(
        exchanges
            .accept(exchange.id, receiver.id, None)
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::BusinessLogic(_))
    );
}

// ---------------------------------------------------------------------------
// Test: confirmation guards
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_confirmation_guards(pool: PgPool) {
    let (exchanges, _) = services(&pool);
    let giver = seed_verified_user(&pool, "giver").await;
    let receiver = seed_verified_user(&pool, "receiver").await;
    let outsider = seed_verified_user(&pool, "outsider").await;
    let item = seed_item(&pool, giver.id, "Heater").await;
    let exchange = exchanges.initiate(&offer(&item, &giver, &receiver)).await.unwrap();

    // Cannot confirm a handoff that was never accepted.
    assert_matches!(
        exchanges
            .confirm_handoff(exchange.id, giver.id, None)
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::BusinessLogic(_))
    );

    exchanges.accept(exchange.id, receiver.id, None).await.unwrap();

    assert_matches!(
        exchanges
            .confirm_handoff(exchange.id, outsider.id, None)
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::Authorization(_))
    );

    assert_matches!(
        exchanges
            .confirm_handoff(exchange.id, giver.id, Some(0))
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::Validation(_))
    );

    assert_matches!(
        exchanges
            .confirm_handoff(999_999, giver.id, None)
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::NotFound { entity: "Exchange", .. })
    );
}

// ---------------------------------------------------------------------------
// Test: mutual rating recomputes both participants' public ratings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rating_flow(pool: PgPool) {
    let (exchanges, _) = services(&pool);
    let giver = seed_verified_user(&pool, "giver").await;
    let receiver = seed_verified_user(&pool, "receiver").await;
    let outsider = seed_verified_user(&pool, "outsider").await;
    let item = seed_item(&pool, giver.id, "Monitor").await;
    let exchange = exchanges.initiate(&offer(&item, &giver, &receiver)).await.unwrap();
    exchanges.accept(exchange.id, receiver.id, None).await.unwrap();

    // Not completed yet.
    assert_matches!(
        exchanges
            .rate(exchange.id, giver.id, 5, None)
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::BusinessLogic(_))
    );

    exchanges.confirm_handoff(exchange.id, giver.id, None).await.unwrap();
    exchanges
        .confirm_handoff(exchange.id, receiver.id, None)
        .await
        .unwrap();

    assert_matches!(
        exchanges
            .rate(exchange.id, giver.id, 6, None)
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::Validation(_))
    );
    let long_review = "y".repeat(501);
    assert_matches!(
        exchanges
            .rate(exchange.id, giver.id, 5, Some(long_review.as_str()))
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::Validation(_))
    );
    assert_matches!(
        exchanges
            .rate(exchange.id, outsider.id, 5, None)
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::Authorization(_))
    );

    let rated = exchanges
        .rate(exchange.id, giver.id, 4, Some("Friendly and punctual"))
        .await
        .unwrap();
    assert_eq!(rated.giver_rating_score, Some(4));

    assert_matches!(
        exchanges
            .rate(exchange.id, giver.id, 5, None)
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::BusinessLogic(_))
    );

    // One side rated: ratings are untouched until both are in.
    let receiver_row = UserRepo::find_by_id(&pool, receiver.id).await.unwrap().unwrap();
    assert!((receiver_row.rating - 5.0).abs() < f64::EPSILON);

    exchanges.rate(exchange.id, receiver.id, 5, None).await.unwrap();

    // The giver submitted 4 about the receiver; the receiver submitted 5.
    let giver_row = UserRepo::find_by_id(&pool, giver.id).await.unwrap().unwrap();
    assert!((giver_row.rating - 5.0).abs() < f64::EPSILON);
    let receiver_row = UserRepo::find_by_id(&pool, receiver.id).await.unwrap().unwrap();
    assert!((receiver_row.rating - 4.0).abs() < f64::EPSILON);

    assert!(exchanges.unrated(giver.id).await.unwrap().is_empty());
    assert!(exchanges.unrated(receiver.id).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test: cancellation rules and item release
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cancel_rules(pool: PgPool) {
    let (exchanges, _) = services(&pool);
    let giver = seed_verified_user(&pool, "giver").await;
    let receiver = seed_verified_user(&pool, "receiver").await;
    let outsider = seed_verified_user(&pool, "outsider").await;
    let item = seed_item(&pool, giver.id, "Rice cooker").await;
    let exchange = exchanges.initiate(&offer(&item, &giver, &receiver)).await.unwrap();

    assert_matches!(
        exchanges
            .cancel(exchange.id, giver.id, "   ")
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::Validation(_))
    );
    assert_matches!(
        exchanges
            .cancel(exchange.id, outsider.id, "Not mine")
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::Authorization(_))
    );

    let cancelled = exchanges
        .cancel(exchange.id, receiver.id, "Changed my mind")
        .await
        .unwrap();
    assert_eq!(cancelled.status, "cancelled");
    assert_eq!(cancelled.cancelled_by, Some(receiver.id));

    let item = ItemRepo::find_by_id(&pool, item.id).await.unwrap().unwrap();
    assert_eq!(item.status, "available");

    // Terminal: no confirming, rating, or re-cancelling.
    assert_matches!(
        exchanges
            .confirm_handoff(exchange.id, giver.id, None)
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::BusinessLogic(_))
    );
    assert_matches!(
        exchanges
            .rate(exchange.id, giver.id, 5, None)
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::BusinessLogic(_))
    );
    assert_matches!(
        exchanges
            .cancel(exchange.id, giver.id, "Again")
            .await
            .unwrap_err()
            .as_core(),
        Some(CoreError::BusinessLogic(_))
    );

    // The released item can be offered again.
    let retry = exchanges.initiate(&offer(&item, &giver, &receiver)).await.unwrap();
    assert_eq!(retry.status, "requested");

    let history = exchanges.history(giver.id).await.unwrap();
    assert_eq!(history.len(), 2);
    let active = exchanges.active(giver.id).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, retry.id);
}
