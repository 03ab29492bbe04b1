//! Behaviour every backend must share, run against each pool.

use super::{entry, t0};
use chrono::Duration;
use pulse_core::{CacheKey, InvalidationScope, JobPhase, JobRunLog, JobRunStatus, JobState, RunId};
use pulse_repository::Repositories;
use serde_json::json;

fn key(k: &str) -> CacheKey {
    CacheKey::new(k).unwrap()
}

pub async fn upsert_then_find(repos: &Repositories) {
    let written = entry("metrics:github:2024-01", json!({"commits": 42}), t0(), 60);
    repos.cache.upsert(&written).await.unwrap();

    let found = repos.cache.find_entry(&written.key).await.unwrap().unwrap();
    assert_eq!(found, written);
    assert!(repos.cache.find_entry(&key("metrics:unknown")).await.unwrap().is_none());
}

pub async fn overwrite_preserves_created_at(repos: &Repositories) {
    repos.cache.upsert(&entry("a", json!(1), t0(), 60)).await.unwrap();

    let later = t0() + Duration::seconds(30);
    let mut rewrite = entry("a", json!(2), later, 120);
    rewrite.created_at = later;
    repos.cache.upsert(&rewrite).await.unwrap();

    let found = repos.cache.find_entry(&key("a")).await.unwrap().unwrap();
    assert_eq!(found.payload, json!(2));
    assert_eq!(found.updated_at, later);
    assert_eq!(found.expires_at, later + Duration::seconds(120));
    assert_eq!(found.created_at, t0());
    assert_eq!(repos.cache.count().await.unwrap(), 1);
}

pub async fn delete_expired_is_inclusive(repos: &Repositories) {
    repos.cache.upsert(&entry("a", json!(1), t0(), 60)).await.unwrap();
    repos.cache.upsert(&entry("b", json!(2), t0(), 0)).await.unwrap();
    repos.cache.upsert(&entry("c", json!(3), t0(), 30)).await.unwrap();

    assert_eq!(repos.cache.delete_expired(t0()).await.unwrap(), 1);
    assert_eq!(repos.cache.delete_expired(t0() + Duration::seconds(30)).await.unwrap(), 1);
    assert_eq!(repos.cache.delete_expired(t0() + Duration::seconds(30)).await.unwrap(), 0);
    assert!(repos.cache.find_entry(&key("a")).await.unwrap().is_some());
}

pub async fn delete_matching_scopes(repos: &Repositories) {
    for k in ["metrics:github", "metrics:dune", "metrics_x", "Metrics:upper", "social:foo"] {
        repos.cache.upsert(&entry(k, json!(k), t0(), 60)).await.unwrap();
    }

    let removed = repos
        .cache
        .delete_matching(&InvalidationScope::Prefix("metrics:".to_string()))
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert!(repos.cache.find_entry(&key("metrics_x")).await.unwrap().is_some());
    assert!(repos.cache.find_entry(&key("Metrics:upper")).await.unwrap().is_some());

    let removed = repos
        .cache
        .delete_matching(&InvalidationScope::Exact("social:foo".to_string()))
        .await
        .unwrap();
    assert_eq!(removed, 1);

    let removed = repos
        .cache
        .delete_matching(&InvalidationScope::Exact("social:foo".to_string()))
        .await
        .unwrap();
    assert_eq!(removed, 0);

    let removed = repos.cache.delete_matching(&InvalidationScope::All).await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(repos.cache.count().await.unwrap(), 0);
}

pub async fn prefix_wildcards_are_literal(repos: &Repositories) {
    repos.cache.upsert(&entry("rate_100%:a", json!(1), t0(), 60)).await.unwrap();
    repos.cache.upsert(&entry("rateX100Y:b", json!(2), t0(), 60)).await.unwrap();

    let removed = repos
        .cache
        .delete_matching(&InvalidationScope::Prefix("rate_100%".to_string()))
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert!(repos.cache.find_entry(&key("rateX100Y:b")).await.unwrap().is_some());
}

pub async fn job_runs_newest_first(repos: &Repositories) {
    for (i, job) in ["refresh_cache", "other", "refresh_cache"].into_iter().enumerate() {
        let start = t0() + Duration::minutes(i64::try_from(i).unwrap());
        let run = JobRunLog::success(RunId::new(), job, format!("run {}", i), start, start + Duration::seconds(1));
        repos.job_runs.append(&run).await.unwrap();
    }
    let failed = JobRunLog::failure(
        RunId::new(),
        "refresh_cache",
        "Storage error: down",
        t0() + Duration::minutes(10),
        t0() + Duration::minutes(10),
    );
    repos.job_runs.append(&failed).await.unwrap();

    let all = repos.job_runs.recent(None, 10).await.unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(all[0], failed);

    let refresh = repos.job_runs.recent(Some("refresh_cache"), 2).await.unwrap();
    assert_eq!(refresh.len(), 2);
    assert_eq!(refresh[0].status, JobRunStatus::Error);
    assert_eq!(refresh[1].message, "run 2");

    assert!(repos.job_runs.recent(Some("missing"), 10).await.unwrap().is_empty());
}

pub async fn job_state_upsert(repos: &Repositories) {
    assert!(repos.job_states.find("refresh_cache").await.unwrap().is_none());

    let started = JobState::started("refresh_cache", RunId::new(), t0());
    repos.job_states.save(&started).await.unwrap();
    let found = repos.job_states.find("refresh_cache").await.unwrap().unwrap();
    assert_eq!(found, started);

    let finished = started.finish(JobRunStatus::Success, "Cleaned 0 expired entries, invalidated 0 entries", t0() + Duration::seconds(2));
    assert!(repos.job_states.complete(&finished).await.unwrap());
    let found = repos.job_states.find("refresh_cache").await.unwrap().unwrap();
    assert_eq!(found.phase, JobPhase::Succeeded);
    assert_eq!(found, finished);

    repos.job_states.save(&JobState::started("another", RunId::new(), t0())).await.unwrap();
    let names: Vec<String> = repos.job_states.list().await.unwrap().into_iter().map(|s| s.job_name).collect();
    assert_eq!(names, vec!["another".to_string(), "refresh_cache".to_string()]);
}

pub async fn complete_leaves_newer_run_alone(repos: &Repositories) {
    let first = JobState::started("refresh_cache", RunId::new(), t0());
    let second = JobState::started("refresh_cache", RunId::new(), t0() + Duration::seconds(1));
    repos.job_states.save(&first).await.unwrap();
    repos.job_states.save(&second).await.unwrap();

    let first_done = first.finish(JobRunStatus::Success, "done", t0() + Duration::seconds(2));
    assert!(!repos.job_states.complete(&first_done).await.unwrap());
    let found = repos.job_states.find("refresh_cache").await.unwrap().unwrap();
    assert_eq!(found, second);

    let second_done = second.finish(JobRunStatus::Error, "Storage error: down", t0() + Duration::seconds(3));
    assert!(repos.job_states.complete(&second_done).await.unwrap());
    let found = repos.job_states.find("refresh_cache").await.unwrap().unwrap();
    assert_eq!(found, second_done);

    // A run whose start was never written still leaves a record behind.
    let orphan = JobState::started("unseen", RunId::new(), t0()).finish(JobRunStatus::Success, "done", t0());
    assert!(repos.job_states.complete(&orphan).await.unwrap());
    assert_eq!(repos.job_states.find("unseen").await.unwrap().unwrap(), orphan);
}
