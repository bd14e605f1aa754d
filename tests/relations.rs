//! Service-level behaviour of CRUD and relation operations over the in-memory store.

mod common;

use bookstore::{bootstrap, AppError, Fetched, Seed};
use common::{seeded_state, service};
use serde_json::{json, Map, Value};

fn body(v: Value) -> Map<String, Value> {
    v.as_object().cloned().unwrap()
}

#[tokio::test]
async fn concurrent_upserts_store_one_link() {
    let state = seeded_state().await;
    let authors = service(&state, "authors");
    let engine = authors.relations().unwrap().clone();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..16 {
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

    let books = service(&state, "books");
    assert_eq!(books.count_related(4).await.unwrap(), 5);
}

#[tokio::test]
async fn upsert_from_either_side_is_the_same_pair() {
    let state = seeded_state().await;
    let authors = service(&state, "authors");
    let books = service(&state, "books");

    let outcome = books.update(4, &body(json!({"author_id": 1}))).await.unwrap();
    assert_eq!(outcome.linked, Some(true));
    assert!(outcome.modified());

    let outcome = authors.update(1, &body(json!({"book_id": 4}))).await.unwrap();
    assert_eq!(outcome.linked, Some(false));
    assert!(!outcome.modified());
    assert_eq!(authors.count_related(1).await.unwrap(), 2);
}

#[tokio::test]
async fn count_matches_list_for_every_row() {
    let state = seeded_state().await;
    for svc in state.services() {
        let ids: Vec<i64> = match svc.read(None).await.unwrap() {
            Fetched::Many(rows) => rows.iter().map(|r| r.id).collect(),
            Fetched::One(_) => panic!("list returned one row"),
        };
        for id in ids {
            let count = svc.count_related(id).await.unwrap();
            let list = svc.list_related(id).await.unwrap();
            assert_eq!(count, list.len() as i64, "{} {}", svc.entity().table_name, id);
        }
    }
    let authors = service(&state, "authors");
    for id in [2, 3, 9] {
        assert_eq!(authors.count_related(id).await.unwrap(), 2);
    }
}

#[tokio::test]
async fn create_then_read_round_trips() {
    let state = seeded_state().await;
    let authors = service(&state, "authors");
    for name in ["Grace Hopper", "Edsger W. Dijkstra", "Ada Lovelace ★", "n".repeat(32).as_str()] {
        let id = authors.create(&body(json!({ "name": name }))).await.unwrap();
        match authors.read(Some(id)).await.unwrap() {
            Fetched::One(record) => {
                assert_eq!(record.id, id);
                assert_eq!(record.fields["name"].as_deref(), Some(name));
            }
            Fetched::Many(_) => panic!("read by id returned many"),
        }
    }
}

#[tokio::test]
async fn ids_are_never_reused() {
    let state = seeded_state().await;
    let books = service(&state, "books");
    let first = books.create(&body(json!({"name": "Draft"}))).await.unwrap();
    assert_eq!(first, 11);
    books.delete(first).await.unwrap();
    let second = books.create(&body(json!({"name": "Draft"}))).await.unwrap();
    assert_eq!(second, 12);
    assert!(matches!(books.delete(first).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn failed_update_applies_nothing() {
    let state = seeded_state().await;
    let authors = service(&state, "authors");

    let err = authors
        .update(1, &body(json!({"name": "Changed", "book_id": 999})))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Referential(_)));
    match authors.read(Some(1)).await.unwrap() {
        Fetched::One(record) => assert_eq!(record.fields["name"].as_deref(), Some("Dennis Ritchie")),
        Fetched::Many(_) => panic!("read by id returned many"),
    }

    let err = authors.update(1, &body(json!({"name": ""}))).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    let err = authors.update(1, &body(json!({"name": null}))).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn missing_rows_are_not_found() {
    let state = seeded_state().await;
    let books = service(&state, "books");
    assert!(matches!(books.read(Some(0)).await, Err(AppError::NotFound(_))));
    assert!(matches!(
        books.update(404, &body(json!({"name": "Ghost"}))).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(books.update(404, &Map::new()).await, Err(AppError::NotFound(_))));
    assert!(matches!(books.delete(404).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn reset_restores_the_seed() {
    let state = seeded_state().await;
    let authors = service(&state, "authors");
    authors.delete(1).await.unwrap();
    authors.create(&body(json!({"name": "Extra"}))).await.unwrap();

    let report = bootstrap(state.store.as_ref(), &state.model, &Seed::bookstore().unwrap())
        .await
        .unwrap();
    assert_eq!(report.links, 15);
    match authors.read(None).await.unwrap() {
        Fetched::Many(rows) => {
            assert_eq!(rows.len(), 12);
            assert_eq!(rows[0].fields["name"].as_deref(), Some("Dennis Ritchie"));
        }
        Fetched::One(_) => panic!("list returned one row"),
    }
    assert_eq!(authors.count_related(1).await.unwrap(), 1);
}
