// Tests for the idempotent raw_weather insert
// Requires a running Postgres (DATABASE_URL)

use serial_test::serial;
use weather_etl_service::db::ObservationRepository;

mod common;
use common::{date, observation, two_day_batch};

#[tokio::test]
#[serial]
async fn test_insert_into_empty_table() {
    let pool = common::setup_test_db().await;
    common::reset_tables(&pool).await;
    let repo = ObservationRepository::new(pool.clone());

    let inserted = repo.insert_observations(&two_day_batch()).await.unwrap();

    assert_eq!(inserted, 2, "Both rows should be new");
    assert_eq!(repo.count().await.unwrap(), 2);
}

#[tokio::test]
#[serial]
async fn test_second_load_inserts_nothing() {
    let pool = common::setup_test_db().await;
    common::reset_tables(&pool).await;
    let repo = ObservationRepository::new(pool.clone());

    let first = repo.insert_observations(&two_day_batch()).await.unwrap();
    let second = repo.insert_observations(&two_day_batch()).await.unwrap();

    assert_eq!(first, 2);
    assert_eq!(second, 0, "Duplicates must be skipped, not inserted");
    assert_eq!(repo.count().await.unwrap(), 2, "Row count must not change");
}

#[tokio::test]
#[serial]
async fn test_conflicting_rows_are_not_updated() {
    let pool = common::setup_test_db().await;
    common::reset_tables(&pool).await;
    let repo = ObservationRepository::new(pool.clone());

    repo.insert_observations(&two_day_batch()).await.unwrap();

    // Same key, different values, plus one new day
    let overlapping = vec![
        observation(date(2024, 1, 2), Some(40.0), Some(30.0), 99.0, Some(99.0)),
        observation(date(2024, 1, 3), Some(31.0), Some(24.0), 1.0, Some(10.0)),
    ];
    let inserted = repo.insert_observations(&overlapping).await.unwrap();
    assert_eq!(inserted, 1, "Only the new day should be inserted");

    let stored = repo.list_all().await.unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[1].date, date(2024, 1, 2));
    assert_eq!(stored[1].temperature_max, Some(33.0), "Existing row must be kept");
    assert_eq!(stored[1].precipitation, 5.0);
}

#[tokio::test]
#[serial]
async fn test_duplicate_keys_within_one_batch() {
    let pool = common::setup_test_db().await;
    common::reset_tables(&pool).await;
    let repo = ObservationRepository::new(pool.clone());

    let batch = vec![
        observation(date(2024, 3, 1), Some(30.0), Some(24.0), 0.0, Some(9.0)),
        observation(date(2024, 3, 1), Some(31.0), Some(25.0), 2.0, Some(8.0)),
    ];
    let inserted = repo.insert_observations(&batch).await.unwrap();

    assert_eq!(inserted, 1);
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
#[serial]
async fn test_empty_batch_inserts_nothing() {
    let pool = common::setup_test_db().await;
    common::reset_tables(&pool).await;
    let repo = ObservationRepository::new(pool.clone());

    assert_eq!(repo.insert_observations(&[]).await.unwrap(), 0);
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn test_null_measurements_are_stored_as_null() {
    let pool = common::setup_test_db().await;
    common::reset_tables(&pool).await;
    let repo = ObservationRepository::new(pool.clone());

    let row = observation(date(2024, 4, 1), None, Some(24.0), 0.0, None);
    repo.insert_observations(std::slice::from_ref(&row)).await.unwrap();

    let stored = repo.list_all().await.unwrap();
    assert_eq!(stored, vec![row]);
}

#[tokio::test]
#[serial]
async fn test_large_batch_spanning_several_statements() {
    let pool = common::setup_test_db().await;
    common::reset_tables(&pool).await;
    let repo = ObservationRepository::new(pool.clone());

    let start = date(1990, 1, 1);
    let batch: Vec<_> = (0..12_000)
        .map(|i| {
            observation(
                start + chrono::Duration::days(i),
                Some(30.0),
                Some(24.0),
                0.0,
                Some(10.0),
            )
        })
        .collect();

    let inserted = repo.insert_observations(&batch).await.unwrap();
    assert_eq!(inserted, 12_000);
    assert_eq!(repo.insert_observations(&batch).await.unwrap(), 0);
    assert_eq!(repo.count().await.unwrap(), 12_000);
}
