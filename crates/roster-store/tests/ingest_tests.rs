use std::sync::Arc;

use roster::test_support::{ScriptedFeed, raw_player};
use roster::{
    FetchError, IngestJob, IngestTrigger, PlayerId, PlayerRepository, Reconciler, RetryPolicy,
    RunJournal, RunOutcome, RunStatus, SystemClock, TriggerReason,
};
use roster_sleeper::{SleeperFeed, SleeperFeedConfig};
use roster_store::PlayerStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn trigger(feed: Arc<ScriptedFeed>, store: Arc<PlayerStore>) -> IngestTrigger {
    let job = IngestJob::new(feed, Reconciler::new(store.clone())).with_retry(RetryPolicy::none());
    IngestTrigger::new(job, Arc::new(SystemClock)).with_journal(store)
}

#[tokio::test]
async fn ingesting_same_feed_twice_keeps_one_row_per_player() {
    let store = Arc::new(PlayerStore::open_in_memory().unwrap());
    let feed = Arc::new(ScriptedFeed::returning(vec![
        raw_player("1", "KC"),
        raw_player("2", "BUF"),
    ]));
    let trigger = trigger(feed, store.clone());

    assert!(trigger.fire(TriggerReason::Startup).await.is_completed());
    let first = store.find_all().await.unwrap();
    assert!(trigger.fire(TriggerReason::Scheduled).await.is_completed());
    let second = store.find_all().await.unwrap();

    assert_eq!(second.len(), 2);
    assert_eq!(first, second);
}

#[tokio::test]
async fn team_change_between_runs_is_last_write_wins() {
    let store = Arc::new(PlayerStore::open_in_memory().unwrap());

    trigger(
        Arc::new(ScriptedFeed::returning(vec![raw_player("1", "KC")])),
        store.clone(),
    )
    .fire(TriggerReason::Startup)
    .await;
    trigger(
        Arc::new(ScriptedFeed::returning(vec![raw_player("1", "LV")])),
        store.clone(),
    )
    .fire(TriggerReason::Scheduled)
    .await;

    let player = store.find_by_id(&PlayerId::new("1")).await.unwrap();
    assert_eq!(player.team.as_deref(), Some("LV"));
    assert_eq!(store.find_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_record_is_skipped_and_counted() {
    let store = Arc::new(PlayerStore::open_in_memory().unwrap());
    let mut missing = raw_player("x", "KC");
    missing.external_id = None;
    let feed = Arc::new(ScriptedFeed::returning(vec![
        raw_player("1", "KC"),
        raw_player("2", "KC"),
        missing,
        raw_player("3", "KC"),
    ]));

    let outcome = trigger(feed, store.clone())
        .fire(TriggerReason::Manual)
        .await;

    let RunOutcome::Completed(report) = outcome else {
        panic!("expected completed run");
    };
    assert_eq!(report.stored, 3);
    assert_eq!(report.skipped_count(), 1);
    assert_eq!(store.find_all().await.unwrap().len(), 3);

    let last = store.last_run().await.unwrap().unwrap();
    assert_eq!(last.status, RunStatus::Completed);
    assert_eq!(last.skipped, 1);
}

#[tokio::test]
async fn badly_typed_upstream_entry_is_skipped_not_fatal() {
    let server = MockServer::start().await;
    let body = r#"{
        "1": {"player_id": "1", "full_name": "One", "team": "KC", "active": true},
        "2": {"player_id": 2, "full_name": "Numeric Id"},
        "3": {"player_id": "3", "full_name": "Three", "team": "DET", "active": false},
        "4": {"player_id": "4", "full_name": "Four", "team": null, "active": null}
    }"#;
    Mock::given(method("GET"))
        .and(path("/v1/players/nfl"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;

    let feed = Arc::new(
        SleeperFeed::new(SleeperFeedConfig {
            base_url: Some(format!("{}/v1", server.uri())),
            ..SleeperFeedConfig::default()
        })
        .unwrap(),
    );
    let store = Arc::new(PlayerStore::open_in_memory().unwrap());
    let job = IngestJob::new(feed, Reconciler::new(store.clone())).with_retry(RetryPolicy::none());
    let trigger = IngestTrigger::new(job, Arc::new(SystemClock)).with_journal(store.clone());

    let RunOutcome::Completed(report) = trigger.fire(TriggerReason::Manual).await else {
        panic!("expected completed run");
    };
    assert_eq!(report.fetched, 4);
    assert_eq!(report.stored, 3);
    assert_eq!(report.skipped_count(), 1);
    assert_eq!(report.skipped[0].index, 1);

    assert_eq!(store.find_all().await.unwrap().len(), 3);
    assert!(store.find_by_id(&PlayerId::new("2")).await.is_err());

    let last = store.last_run().await.unwrap().unwrap();
    assert_eq!((last.stored, last.skipped), (3, 1));
}

#[tokio::test]
async fn failed_fetch_leaves_store_unchanged_and_is_journaled() {
    let store = Arc::new(PlayerStore::open_in_memory().unwrap());
    trigger(
        Arc::new(ScriptedFeed::returning(vec![raw_player("1", "KC")])),
        store.clone(),
    )
    .fire(TriggerReason::Startup)
    .await;
    let before = store.find_all().await.unwrap();

    let outcome = trigger(
        Arc::new(ScriptedFeed::failing(FetchError::Network(
            "connection refused".into(),
        ))),
        store.clone(),
    )
    .fire(TriggerReason::Scheduled)
    .await;

    assert!(matches!(outcome, RunOutcome::Failed(_)));
    assert_eq!(store.find_all().await.unwrap(), before);

    let last = store.last_run().await.unwrap().unwrap();
    assert_eq!(last.status, RunStatus::Failed);
    assert_eq!(last.reason, TriggerReason::Scheduled);
    assert!(last.error.unwrap().contains("connection refused"));
}

#[tokio::test]
async fn null_active_survives_ingestion() {
    let store = Arc::new(PlayerStore::open_in_memory().unwrap());
    let mut record = raw_player("1", "KC");
    record.active = None;

    trigger(Arc::new(ScriptedFeed::returning(vec![record])), store.clone())
        .fire(TriggerReason::Manual)
        .await;

    let player = store.find_by_id(&PlayerId::new("1")).await.unwrap();
    assert_eq!(player.active, None);
}
