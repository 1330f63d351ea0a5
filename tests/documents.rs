use std::sync::Arc;
use std::time::Duration;

use firebase_facade::documents::{DocumentError, Documents};
use firebase_facade::firestore::{
    data_from_json, DocumentData, FilterOperator, Firestore, FirestoreClient, FirestoreValue,
    InMemoryDatastore, OrderDirection, QuerySnapshot, WriteOperation, WriteRule,
};
use serde_json::json;

fn record(value: serde_json::Value) -> DocumentData {
    data_from_json(value).expect("json object")
}

fn with_datastore(datastore: InMemoryDatastore) -> Documents {
    Documents::new(FirestoreClient::new(Firestore::default(), Arc::new(datastore)))
}

async fn seed_cities(documents: &Documents) {
    for (id, name, population) in [
        ("bcn", "Barcelona", 1_620_000),
        ("lis", "Lisbon", 545_000),
        ("opo", "Porto", 232_000),
        ("mad", "Madrid", 3_300_000),
        ("vlc", "Valencia", 790_000),
    ] {
        documents
            .create_with_id("cities", id, record(json!({"name": name, "population": population})))
            .await
            .unwrap();
    }
}

async fn next(receiver: &async_channel::Receiver<QuerySnapshot>) -> QuerySnapshot {
    tokio::time::timeout(Duration::from_secs(5), receiver.recv())
        .await
        .expect("snapshot")
        .unwrap()
}

#[tokio::test]
async fn created_record_reads_back_equal() {
    let documents = Documents::in_memory();
    let data = record(json!({
        "title": "Dune",
        "pages": 412,
        "tags": ["sf", "classic"],
        "meta": {"isbn": "978-0441013593"}
    }));
    let reference = documents.create("books", data.clone(), None).await.unwrap();
    assert_eq!(reference.id().len(), 20);

    let snapshot = documents.get("books", reference.id()).await.unwrap();
    assert!(snapshot.exists());
    assert_eq!(snapshot.data(), Some(&data));
}

#[tokio::test]
async fn delete_is_idempotent_and_exists_follows_lifecycle() {
    let documents = Documents::in_memory();
    assert!(!documents.exists("notes", "n1").await.unwrap());

    documents
        .create_with_id("notes", "n1", record(json!({"body": "hi"})))
        .await
        .unwrap();
    assert!(documents.exists("notes", "n1").await.unwrap());

    documents.delete("notes", "n1").await.unwrap();
    assert!(!documents.exists("notes", "n1").await.unwrap());
    documents.delete("notes", "n1").await.unwrap();
    assert!(!documents.get("notes", "n1").await.unwrap().exists());
}

#[tokio::test]
async fn update_requires_record_but_upsert_creates_it() {
    let documents = Documents::in_memory();
    let err = documents
        .update("profiles", "p1", record(json!({"name": "Ada"})))
        .await
        .unwrap_err();
    assert!(err.is_write());
    assert_eq!(err.code_str(), "firestore/not-found");

    documents
        .upsert("profiles", "p1", record(json!({"name": "Ada", "langs": {"main": "rust"}})))
        .await
        .unwrap();
    documents
        .update("profiles", "p1", record(json!({"langs.main": "ocaml"})))
        .await
        .unwrap();

    let snapshot = documents.get("profiles", "p1").await.unwrap();
    assert_eq!(snapshot.get("name").and_then(FirestoreValue::as_str), Some("Ada"));
    let langs = snapshot.get("langs").and_then(FirestoreValue::as_map).unwrap();
    assert_eq!(langs.get("main").and_then(FirestoreValue::as_str), Some("ocaml"));
}

#[tokio::test]
async fn query_order_and_limit() {
    let documents = Documents::in_memory();
    seed_cities(&documents).await;

    let large = documents
        .query("cities", "population", FilterOperator::GreaterThan, 1_000_000i64)
        .await
        .unwrap();
    assert_eq!(large.ids(), ["bcn", "mad"]);

    let by_population = documents
        .order_by("cities", "population", OrderDirection::Descending)
        .await
        .unwrap();
    assert_eq!(by_population.ids(), ["mad", "bcn", "vlc", "lis", "opo"]);

    let first_two = documents.limit("cities", 2).await.unwrap();
    assert_eq!(first_two.len(), 2);
    assert_eq!(documents.list("cities").await.unwrap().len(), 5);
}

#[tokio::test]
async fn paginate_walks_the_collection_then_runs_dry() {
    let documents = Documents::in_memory();
    seed_cities(&documents).await;

    let first = documents.limit("cities", 2).await.unwrap();
    assert_eq!(first.ids(), ["bcn", "lis"]);
    let second = documents
        .paginate("cities", first.last().unwrap(), 2)
        .await
        .unwrap();
    assert_eq!(second.ids(), ["mad", "opo"]);
    let third = documents
        .paginate("cities", second.last().unwrap(), 2)
        .await
        .unwrap();
    assert_eq!(third.ids(), ["vlc"]);
    let done = documents
        .paginate("cities", third.last().unwrap(), 2)
        .await
        .unwrap();
    assert!(done.is_empty());
}

#[tokio::test]
async fn paginate_ordered_follows_field_order() {
    let documents = Documents::in_memory();
    seed_cities(&documents).await;

    let ordered = documents
        .order_by("cities", "population", OrderDirection::Ascending)
        .await
        .unwrap();
    let cursor = &ordered.documents()[1];
    assert_eq!(cursor.id(), "lis");

    let page = documents
        .paginate_ordered("cities", "population", OrderDirection::Ascending, cursor, 2)
        .await
        .unwrap();
    assert_eq!(page.ids(), ["vlc", "bcn"]);
}

#[tokio::test]
async fn batch_create_and_delete() {
    let documents = Documents::in_memory();
    let references = documents
        .batch_create(
            "tasks",
            vec![record(json!({"n": 1})), record(json!({"n": 2})), record(json!({"n": 3}))],
        )
        .await
        .unwrap();
    assert_eq!(references.len(), 3);
    assert_eq!(documents.list("tasks").await.unwrap().len(), 3);

    let ids: Vec<&str> = references.iter().map(|reference| reference.id()).collect();
    documents.batch_delete("tasks", ids).await.unwrap();
    assert!(documents.list("tasks").await.unwrap().is_empty());
}

#[tokio::test]
async fn denied_batch_writes_nothing() {
    let rule: WriteRule = Arc::new(|write: &WriteOperation| match write {
        WriteOperation::Set { data, .. } => data.get("blocked").is_none(),
        _ => true,
    });
    let documents = with_datastore(InMemoryDatastore::with_write_rule(rule));

    let err = documents
        .batch_create(
            "tasks",
            vec![
                record(json!({"n": 1})),
                record(json!({"n": 2, "blocked": true})),
                record(json!({"n": 3})),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentError::Write(_)));
    assert_eq!(err.code_str(), "firestore/permission-denied");
    assert!(documents.list("tasks").await.unwrap().is_empty());
}

#[tokio::test]
async fn denied_delete_keeps_whole_batch() {
    let datastore = InMemoryDatastore::new();
    let documents = with_datastore(datastore.clone());
    for id in ["a", "b", "c"] {
        documents
            .create_with_id("tasks", id, record(json!({"id": id})))
            .await
            .unwrap();
    }
    let rule: WriteRule = Arc::new(|write: &WriteOperation| {
        !matches!(write, WriteOperation::Delete { key } if key.id() == "b")
    });
    datastore.set_write_rule(Some(rule));

    let err = documents
        .batch_delete("tasks", ["a", "b", "c"])
        .await
        .unwrap_err();
    assert!(err.is_write());
    assert_eq!(err.code_str(), "firestore/permission-denied");
    assert_eq!(documents.list("tasks").await.unwrap().ids(), ["a", "b", "c"]);
}

#[tokio::test]
async fn oversized_batch_is_rejected_before_writing() {
    let documents = Documents::in_memory();
    let records = (0..501).map(|n| record(json!({"n": n}))).collect();
    let err = documents.batch_create("bulk", records).await.unwrap_err();
    assert_eq!(err.code_str(), "firestore/resource-exhausted");
    assert!(documents.list("bulk").await.unwrap().is_empty());
}

#[tokio::test]
async fn watch_delivers_initial_and_changes_until_removed() {
    let documents = Documents::in_memory();
    let (sender, receiver) = async_channel::unbounded::<QuerySnapshot>();
    let registration = documents
        .watch("rooms", move |event| {
            if let Ok(snapshot) = event {
                let _ = sender.try_send(snapshot);
            }
        })
        .await
        .unwrap();

    assert!(next(&receiver).await.is_empty());

    documents
        .create_with_id("rooms", "r1", record(json!({"topic": "rust"})))
        .await
        .unwrap();
    assert_eq!(next(&receiver).await.ids(), ["r1"]);

    documents.delete("rooms", "r1").await.unwrap();
    assert!(next(&receiver).await.is_empty());

    registration.remove();
    documents
        .create_with_id("rooms", "r2", record(json!({"topic": "go"})))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(receiver.try_recv().is_err());
}
