//! Runs against a live PostgreSQL. Enable with `--features db-tests` and set DATABASE_URL.
#![cfg(feature = "db-tests")]

use bookstore::{
    bootstrap, ensure_database_exists, resolve, AppError, AppState, CrudService, Fetched, FullConfig, PgStore, Seed,
    Store,
};
use serde_json::{json, Map, Value};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

fn body(v: Value) -> Map<String, Value> {
    v.as_object().cloned().unwrap()
}

fn service(state: &AppState, path_segment: &str) -> CrudService {
    state
        .services()
        .into_iter()
        .find(|s| s.entity().path_segment == path_segment)
        .unwrap()
}

/// One sequential scenario; every step shares the same tables.
#[tokio::test]
async fn bookstore_against_postgres() {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for db-tests");
    ensure_database_exists(&url).await.unwrap();
    let pool = PgPoolOptions::new().max_connections(8).connect(&url).await.unwrap();
    let store = Arc::new(PgStore::new(pool));
    store.ping().await.unwrap();

    let model = resolve(&FullConfig::bookstore().unwrap()).unwrap();
    let report = bootstrap(store.as_ref(), &model, &Seed::bookstore().unwrap())
        .await
        .unwrap();
    assert_eq!(report.rows, 22);
    assert_eq!(report.links, 15);
    let state = AppState::new(store, model);
    let authors = service(&state, "authors");
    let books = service(&state, "books");

    match authors.read(Some(12)).await.unwrap() {
        Fetched::One(r) => assert_eq!(r.fields["name"].as_deref(), Some("C.A.R. Hoare")),
        Fetched::Many(_) => panic!("read by id returned many"),
    }
    assert_eq!(books.create(&body(json!({"name": "Test Book"}))).await.unwrap(), 11);

    // Concurrent upserts of one pair store exactly one row.
    let engine = authors.relations().unwrap().clone();
    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let engine = engine.clone();
        tasks.spawn(async move { engine.link(1, 4).await });
    }
    let mut inserted = 0;
    while let Some(joined) = tasks.join_next().await {
        if joined.unwrap().unwrap() {
            inserted += 1;
        }
    }
    assert_eq!(inserted, 1);
    assert_eq!(books.count_related(4).await.unwrap(), 5);

    let err = authors.update(1, &body(json!({"book_id": 999}))).await.unwrap_err();
    assert!(matches!(err, AppError::Referential(_)));

    let err = authors
        .update(2, &body(json!({"name": "Changed", "book_id": 999})))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Referential(_)));
    match authors.read(Some(2)).await.unwrap() {
        Fetched::One(r) => assert_eq!(r.fields["name"].as_deref(), Some("Brian Kernighan")),
        Fetched::Many(_) => panic!("read by id returned many"),
    }

    authors.delete(5).await.unwrap();
    assert_eq!(books.count_related(4).await.unwrap(), 4);
    let listed: Vec<i64> = books.list_related(4).await.unwrap().iter().map(|r| r.id).collect();
    assert!(!listed.contains(&5));
    assert!(matches!(authors.delete(5).await, Err(AppError::NotFound(_))));
}
