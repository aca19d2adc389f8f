//! Match lifecycle integration tests
//!
//! Records, edits and deletes matches through the service and checks the
//! resulting ratings, tallies and match records.

use rivalry_ledger::config::{AppConfig, LedgerConfig};
use rivalry_ledger::error::LedgerError;
use rivalry_ledger::matches::InMemoryMatchStore;
use rivalry_ledger::rating::InMemoryRatingStore;
use rivalry_ledger::service::MatchService;
use rivalry_ledger::types::RatingDelta;
use std::sync::Arc;
use std::time::Duration;

use crate::fixtures::{
    rating_of, seeded_service, service_with, FlakyMatchStore, FlakyRatingStore, SlowRatingStore,
};

#[tokio::test]
async fn test_rating_scenarios() {
    let cases = [
        (1200, 1200, 3, 1, RatingDelta::new(16, -16)),
        (1200, 1200, 2, 2, RatingDelta::new(0, 0)),
        (1000, 1400, 3, 1, RatingDelta::new(29, -29)),
        (1400, 1000, 3, 1, RatingDelta::new(3, -3)),
    ];

    for (rating1, rating2, goals1, goals2, expected) in cases {
        let (service, ratings) = seeded_service(&[("home", rating1), ("away", rating2)]);

        let receipt = service
            .record_match("home", "away", goals1, goals2)
            .await
            .unwrap();

        assert_eq!(receipt.record.applied_delta, expected);
        assert_eq!(
            rating_of(ratings.as_ref(), "home").await,
            rating1 + expected.player1
        );
        assert_eq!(
            rating_of(ratings.as_ref(), "away").await,
            rating2 + expected.player2
        );
        println!(
            "✅ {} vs {} at {}-{}: {}",
            rating1, rating2, goals1, goals2, expected
        );
    }
}

#[tokio::test]
async fn test_registered_players_start_at_configured_rating() {
    let mut config = AppConfig::default();
    config.rating.starting_rating = 1500;
    let service = MatchService::in_memory(&config).unwrap();

    let alice = service.register_player("alice").await.unwrap();
    service.register_player("bob").await.unwrap();

    assert_eq!(alice.rating, 1500);
    assert_eq!(alice.tally.matches_played, 0);
    assert!(matches!(
        service.register_player("alice").await,
        Err(LedgerError::PlayerAlreadyExists { .. })
    ));

    service.record_match("alice", "bob", 1, 0).await.unwrap();
    let alice = service.player(&"alice".to_string()).await.unwrap();
    assert_eq!(alice.rating, 1516);
    assert_eq!(alice.tally.points, 3);
}

#[tokio::test]
async fn test_edit_win_to_draw_returns_to_baseline() {
    let (service, ratings) = seeded_service(&[("alice", 1200), ("bob", 1200)]);

    let recorded = service.record_match("alice", "bob", 3, 1).await.unwrap();
    let edited = service
        .edit_match(recorded.record.id, 2, 2)
        .await
        .unwrap();

    assert_eq!(edited.record.applied_delta, RatingDelta::zero());
    assert_eq!(edited.record.outcome.score.player1_goals, 2);
    assert_eq!(rating_of(ratings.as_ref(), "alice").await, 1200);
    assert_eq!(rating_of(ratings.as_ref(), "bob").await, 1200);

    let stored = service.match_record(recorded.record.id).await.unwrap();
    assert_eq!(stored, edited.record);
    println!("✅ Edit from 3-1 to 2-2 restored both players to 1200");
}

#[tokio::test]
async fn test_delete_removes_only_its_own_contribution() {
    let (service, ratings) = seeded_service(&[("alice", 1200), ("bob", 1200), ("carol", 1200)]);

    let first = service.record_match("alice", "bob", 3, 1).await.unwrap();
    service.record_match("carol", "alice", 4, 0).await.unwrap();
    service.record_match("bob", "carol", 1, 1).await.unwrap();

    let alice_before = rating_of(ratings.as_ref(), "alice").await;
    let bob_before = rating_of(ratings.as_ref(), "bob").await;
    let carol_before = rating_of(ratings.as_ref(), "carol").await;

    let deleted = service.delete_match(first.record.id).await.unwrap();

    assert_eq!(deleted.reverted_delta, RatingDelta::new(16, -16));
    assert_eq!(rating_of(ratings.as_ref(), "alice").await, alice_before - 16);
    assert_eq!(rating_of(ratings.as_ref(), "bob").await, bob_before + 16);
    assert_eq!(rating_of(ratings.as_ref(), "carol").await, carol_before);
    assert!(matches!(
        service.match_record(first.record.id).await,
        Err(LedgerError::MatchNotFound { .. })
    ));

    let alice = service.player(&"alice".to_string()).await.unwrap();
    assert_eq!(alice.tally.matches_played, 1);
    assert_eq!(alice.tally.losses, 1);
    assert_eq!(alice.tally.goals_conceded, 4);
}

#[tokio::test]
async fn test_rating_store_failure_leaves_no_trace() {
    let ratings = Arc::new(FlakyRatingStore::with_players(&[("alice", 1200), ("bob", 1200)]));
    let matches = Arc::new(InMemoryMatchStore::new());
    let service = service_with(ratings.clone(), matches.clone(), LedgerConfig::default());

    ratings.set_fail_commits(true);
    let err = service.record_match("alice", "bob", 3, 1).await.unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(ratings.commit_attempts(), 1);
    assert!(service.matches().await.unwrap().is_empty());
    assert_eq!(rating_of(ratings.as_ref(), "alice").await, 1200);

    // Safe to retry in full once the store recovers
    ratings.set_fail_commits(false);
    let receipt = service.record_match("alice", "bob", 3, 1).await.unwrap();
    assert_eq!(receipt.record.applied_delta, RatingDelta::new(16, -16));
}

#[tokio::test]
async fn test_match_store_failures_are_compensated() {
    let ratings = Arc::new(InMemoryRatingStore::with_players([
        ("alice", 1200),
        ("bob", 1200),
    ]));
    let matches = Arc::new(FlakyMatchStore::new());
    let service = service_with(ratings.clone(), matches.clone(), LedgerConfig::default());

    let recorded = service.record_match("alice", "bob", 3, 1).await.unwrap();
    let alice_entry = service.player(&"alice".to_string()).await.unwrap();

    matches.set_fail_writes(true);

    assert!(service.record_match("bob", "alice", 5, 0).await.is_err());
    assert!(service.edit_match(recorded.record.id, 0, 2).await.is_err());
    assert!(service.delete_match(recorded.record.id).await.is_err());

    let alice_after = service.player(&"alice".to_string()).await.unwrap();
    assert_eq!(alice_after.rating, alice_entry.rating);
    assert_eq!(alice_after.tally, alice_entry.tally);
    assert_eq!(rating_of(ratings.as_ref(), "bob").await, 1184);
    assert_eq!(
        service.match_record(recorded.record.id).await.unwrap(),
        recorded.record
    );

    let compensated = service
        .metrics()
        .ledger()
        .compensations_total
        .with_label_values(&["edit", "success"])
        .get();
    assert_eq!(compensated, 1);
    println!("✅ Record, edit and delete failures all left ratings untouched");
}

#[tokio::test]
async fn test_failed_compensation_is_not_retryable() {
    let ratings = Arc::new(FlakyRatingStore::with_players(&[("alice", 1200), ("bob", 1200)]));
    let matches = Arc::new(FlakyMatchStore::new());
    let service = service_with(ratings.clone(), matches.clone(), LedgerConfig::default());

    // The apply commits, the insert fails, then the undo commit fails
    ratings.fail_commits_after(1);
    matches.set_fail_writes(true);

    let err = service.record_match("alice", "bob", 3, 1).await.unwrap_err();

    assert!(matches!(err, LedgerError::InconsistentState { .. }));
    assert!(!err.is_retryable());
    assert!(err.is_integrity_fault());
    assert_eq!(ratings.commit_attempts(), 2);
    assert_eq!(rating_of(ratings.as_ref(), "alice").await, 1216);
    assert!(service.matches().await.unwrap().is_empty());

    let failed = service
        .metrics()
        .ledger()
        .compensations_total
        .with_label_values(&["record", "failed"])
        .get();
    assert_eq!(failed, 1);
    println!("✅ Failed compensation surfaced as {}", err.kind());
}

#[tokio::test]
async fn test_slow_store_times_out_without_writing() {
    let ratings = Arc::new(SlowRatingStore::with_players(
        &[("alice", 1200), ("bob", 1200)],
        Duration::from_millis(500),
    ));
    let config = LedgerConfig {
        store_timeout_ms: 20,
        ..LedgerConfig::default()
    };
    let service = service_with(ratings.clone(), Arc::new(InMemoryMatchStore::new()), config);

    let err = service.record_match("alice", "bob", 1, 0).await.unwrap_err();

    assert!(matches!(err, LedgerError::StorageUnavailable { .. }));
    assert!(err.is_retryable());
    assert_eq!(rating_of(ratings.as_ref(), "alice").await, 1200);
    assert!(service.matches().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_caller_does_not_abort_started_operation() {
    let ratings = Arc::new(SlowRatingStore::with_players(
        &[("alice", 1200), ("bob", 1200)],
        Duration::from_millis(50),
    ));
    let service = service_with(
        ratings.clone(),
        Arc::new(InMemoryMatchStore::new()),
        LedgerConfig::default(),
    );

    let abandoned =
        tokio::time::timeout(Duration::from_millis(5), service.record_match("alice", "bob", 3, 1))
            .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(rating_of(ratings.as_ref(), "alice").await, 1216);
    assert_eq!(rating_of(ratings.as_ref(), "bob").await, 1184);
    assert_eq!(service.matches().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_half_to_even_rounding_from_config() {
    let config = AppConfig::from_toml_str(
        r#"
        [rating]
        k_factor = 1.0
        rounding = "half_to_even"
        "#,
    )
    .unwrap();
    let service = MatchService::in_memory(&config).unwrap();
    service.register_player("alice").await.unwrap();
    service.register_player("bob").await.unwrap();

    // Equal ratings: raw deltas are +0.5 and -0.5, which round to zero
    let receipt = service.record_match("alice", "bob", 1, 0).await.unwrap();
    assert_eq!(receipt.record.applied_delta, RatingDelta::zero());
}
