//! Integration tests for the SQLite repositories.
//!
//! Each test gets its own in-memory database.

mod common;

use common::contract;
use pulse_repository::{DatabasePool, Repositories};

async fn repositories() -> Repositories {
    DatabasePool::in_memory()
        .await
        .expect("Failed to open in-memory database")
        .repositories()
}

#[tokio::test]
async fn test_upsert_then_find() {
    contract::upsert_then_find(&repositories().await).await;
}

#[tokio::test]
async fn test_overwrite_preserves_created_at() {
    contract::overwrite_preserves_created_at(&repositories().await).await;
}

#[tokio::test]
async fn test_delete_expired_is_inclusive() {
    contract::delete_expired_is_inclusive(&repositories().await).await;
}

#[tokio::test]
async fn test_delete_matching_scopes() {
    contract::delete_matching_scopes(&repositories().await).await;
}

#[tokio::test]
async fn test_prefix_wildcards_are_literal() {
    contract::prefix_wildcards_are_literal(&repositories().await).await;
}

#[tokio::test]
async fn test_job_runs_newest_first() {
    contract::job_runs_newest_first(&repositories().await).await;
}

#[tokio::test]
async fn test_job_state_upsert() {
    contract::job_state_upsert(&repositories().await).await;
}

#[tokio::test]
async fn test_file_database_survives_reopen() {
    use pulse_config::DatabaseConfig;
    use pulse_repository::DatabasePoolInterface;
    use serde_json::json;

    let dir = tempfile::TempDir::new().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("pulse.db").display()),
        ..DatabaseConfig::default()
    };

    let pool = DatabasePool::new(&config).await.unwrap();
    pool.run_migrations().await.unwrap();
    let written = common::entry("k", json!({"v": 1}), common::t0(), 60);
    pool.repositories().cache.upsert(&written).await.unwrap();
    pool.close().await;

    let reopened = DatabasePool::new(&config).await.unwrap();
    reopened.run_migrations().await.unwrap();
    let found = reopened.repositories().cache.find_entry(&written.key).await.unwrap();
    assert_eq!(found, Some(written));
}

#[tokio::test]
async fn test_complete_leaves_newer_run_alone() {
    contract::complete_leaves_newer_run_alone(&repositories().await).await;
}
