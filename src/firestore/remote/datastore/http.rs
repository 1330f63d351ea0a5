use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;

use crate::firestore::api::query::QueryDefinition;
use crate::firestore::api::{
    DeliveryGate, DocumentSnapshot, Firestore, ListenerRegistration, QuerySnapshot,
    SnapshotListener,
};
use crate::firestore::error::{FirestoreErrorCode, FirestoreResult};
use crate::firestore::model::{DatabaseId, DocumentKey, FieldPath};
use crate::firestore::remote::connection::{Connection, ConnectionBuilder};
use crate::firestore::remote::serializer::JsonProtoSerializer;
use crate::firestore::value::MapValue;
use crate::util::{sleep, spawn_detached};

use super::{Datastore, NoopTokenProvider, TokenProviderArc, WriteOperation};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Datastore speaking the Firestore REST v1 API.
///
/// REST has no push channel, so [`Datastore::listen`] polls `:runQuery` on
/// `poll_interval` and emits whenever the result set differs from the last one.
#[derive(Clone)]
pub struct HttpDatastore {
    connection: Connection,
    serializer: JsonProtoSerializer,
    auth_provider: TokenProviderArc,
    poll_interval: Duration,
}

#[derive(Clone)]
pub struct HttpDatastoreBuilder {
    database_id: DatabaseId,
    connection_builder: ConnectionBuilder,
    auth_provider: TokenProviderArc,
    poll_interval: Duration,
}

impl HttpDatastoreBuilder {
    fn new(database_id: DatabaseId) -> Self {
        Self {
            connection_builder: Connection::builder(database_id.clone()),
            database_id,
            auth_provider: Arc::new(NoopTokenProvider),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_auth_provider(mut self, provider: TokenProviderArc) -> Self {
        self.auth_provider = provider;
        self
    }

    pub fn with_connection_builder(mut self, builder: ConnectionBuilder) -> Self {
        self.connection_builder = builder;
        self
    }

    pub fn with_emulator_host(mut self, host: impl Into<String>) -> Self {
        self.connection_builder = self.connection_builder.with_emulator_host(host);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn build(self) -> FirestoreResult<HttpDatastore> {
        Ok(HttpDatastore {
            connection: self.connection_builder.build()?,
            serializer: JsonProtoSerializer::new(self.database_id),
            auth_provider: self.auth_provider,
            poll_interval: self.poll_interval,
        })
    }
}

impl HttpDatastore {
    pub fn builder(database_id: DatabaseId) -> HttpDatastoreBuilder {
        HttpDatastoreBuilder::new(database_id)
    }

    /// Builder preconfigured from the app options behind `firestore`, including the emulator host.
    pub fn for_firestore(firestore: &Firestore) -> FirestoreResult<HttpDatastoreBuilder> {
        let mut builder = Self::builder(firestore.database_id().clone());
        if let Some(host) = firestore
            .app()
            .and_then(|app| app.options().firestore_emulator_host.clone())
        {
            builder = builder.with_emulator_host(host);
        }
        Ok(builder)
    }

    async fn token(&self) -> FirestoreResult<Option<String>> {
        self.auth_provider.get_token().await
    }

    async fn execute(&self, method: Method, path: &str, body: Option<serde_json::Value>) -> FirestoreResult<serde_json::Value> {
        let token = self.token().await?;
        let result = self
            .connection
            .invoke_json(method, path, body, token.as_deref())
            .await;
        self.observe(result)
    }

    fn observe<T>(&self, result: FirestoreResult<T>) -> FirestoreResult<T> {
        if let Err(err) = &result {
            if err.code == FirestoreErrorCode::Unauthenticated {
                self.auth_provider.invalidate_token();
            }
        }
        result
    }
}

#[async_trait]
impl Datastore for HttpDatastore {
    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot> {
        let path = format!("documents/{}", key.path());
        let token = self.token().await?;
        let response = self.observe(
            self.connection
                .invoke_json_optional(Method::GET, &path, None, token.as_deref())
                .await,
        )?;
        match response {
            Some(document) => self.serializer.decode_document(&document),
            None => Ok(DocumentSnapshot::missing(key.clone())),
        }
    }

    async fn set_document(
        &self,
        key: &DocumentKey,
        data: MapValue,
        mask: Option<Vec<FieldPath>>,
    ) -> FirestoreResult<()> {
        self.commit(vec![WriteOperation::Set {
            key: key.clone(),
            data,
            mask,
        }])
        .await
    }

    async fn update_document(
        &self,
        key: &DocumentKey,
        data: MapValue,
        field_paths: Vec<FieldPath>,
    ) -> FirestoreResult<()> {
        self.commit(vec![WriteOperation::Update {
            key: key.clone(),
            data,
            field_paths,
        }])
        .await
    }

    async fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()> {
        self.commit(vec![WriteOperation::Delete { key: key.clone() }])
            .await
    }

    async fn run_query(&self, query: &QueryDefinition) -> FirestoreResult<Vec<DocumentSnapshot>> {
        let path = format!("{}:runQuery", self.serializer.query_parent(query));
        let body = self.serializer.encode_run_query_body(query);
        let response = self.execute(Method::POST, &path, Some(body)).await?;
        self.serializer.decode_run_query_response(&response)
    }

    async fn commit(&self, writes: Vec<WriteOperation>) -> FirestoreResult<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let body = self.serializer.encode_commit_body(&writes);
        self.execute(Method::POST, "documents:commit", Some(body))
            .await
            .map(|_| ())
    }

    /// Polls `:runQuery` every `poll_interval` and emits when the result set
    /// differs from the last emitted one.
    ///
    /// Delivery is per poll, not per write: several writes between two polls
    /// arrive as one snapshot, and a change that is undone before the next
    /// poll is never reported.
    async fn listen(
        &self,
        query: QueryDefinition,
        listener: SnapshotListener,
    ) -> FirestoreResult<ListenerRegistration> {
        let gate = DeliveryGate::new();
        let datastore = self.clone();
        let poll_gate = Arc::clone(&gate);

        spawn_detached(async move {
            let mut last: Option<Vec<DocumentSnapshot>> = None;
            while poll_gate.is_open() {
                match datastore.run_query(&query).await {
                    Ok(documents) => {
                        if last.as_ref() != Some(&documents) {
                            let snapshot = QuerySnapshot::new(documents.clone());
                            if poll_gate.deliver(|| listener(Ok(snapshot))) {
                                last = Some(documents);
                            }
                        }
                    }
                    Err(err) => {
                        log::warn!(
                            "polling {} failed: {err}",
                            query.collection_path()
                        );
                        poll_gate.deliver(|| listener(Err(err)));
                    }
                }
                sleep(datastore.poll_interval).await;
            }
            log::debug!("stopped polling {}", query.collection_path());
        });

        Ok(ListenerRegistration::new(move || gate.close()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{FirebaseApp, FirebaseOptions};
    use crate::firestore::value::{DocumentData, FirestoreValue};
    use crate::test_support::start_mock_server;
    use httpmock::prelude::*;
    use serde_json::json;

    const DB_PATH: &str = "/v1/projects/demo-project/databases/(default)";

    fn datastore(server: &MockServer) -> HttpDatastore {
        HttpDatastore::builder(DatabaseId::new("demo-project", "(default)"))
            .with_emulator_host(server.address().to_string())
            .with_poll_interval(Duration::from_millis(20))
            .build()
            .expect("datastore")
    }

    fn users_query() -> QueryDefinition {
        Firestore::with_database_id(DatabaseId::new("demo-project", "(default)"))
            .query("users")
            .unwrap()
            .definition()
    }

    #[tokio::test]
    async fn get_document_decodes_fields_and_maps_404_to_missing() {
        let server = start_mock_server().await;
        let found = server.mock(|when, then| {
            when.method(GET).path(format!("{DB_PATH}/documents/users/ada"));
            then.status(200).json_body(json!({
                "name": "projects/demo-project/databases/(default)/documents/users/ada",
                "fields": { "name": { "stringValue": "Ada" } }
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path(format!("{DB_PATH}/documents/users/ghost"));
            then.status(404).json_body(json!({
                "error": { "code": 404, "message": "not found", "status": "NOT_FOUND" }
            }));
        });

        let datastore = datastore(&server);
        let ada = datastore
            .get_document(&DocumentKey::from_string("users/ada").unwrap())
            .await
            .unwrap();
        found.assert();
        assert_eq!(ada.get("name"), Some(&FirestoreValue::from("Ada")));

        let ghost = datastore
            .get_document(&DocumentKey::from_string("users/ghost").unwrap())
            .await
            .unwrap();
        assert!(!ghost.exists());
    }

    #[tokio::test]
    async fn for_firestore_targets_app_emulator_host() {
        let server = start_mock_server().await;
        let lookup = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/projects/emulated/databases/(default)/documents/users/ada");
            then.status(404).body("");
        });
        let app = FirebaseApp::new(
            "http-emulator",
            FirebaseOptions {
                project_id: Some("emulated".into()),
                firestore_emulator_host: Some(server.address().to_string()),
                ..Default::default()
            },
        );
        let firestore = Firestore::new(app).unwrap();
        let datastore = HttpDatastore::for_firestore(&firestore).unwrap().build().unwrap();

        let snapshot = datastore
            .get_document(&DocumentKey::from_string("users/ada").unwrap())
            .await
            .unwrap();
        lookup.assert();
        assert!(!snapshot.exists());
    }

    #[tokio::test]
    async fn commit_posts_all_writes_in_one_request() {
        let server = start_mock_server().await;
        let commit = server.mock(|when, then| {
            when.method(POST)
                .path(format!("{DB_PATH}/documents:commit"))
                .json_body(json!({
                    "writes": [
                        {
                            "update": {
                                "name": "projects/demo-project/databases/(default)/documents/users/a",
                                "fields": { "n": { "integerValue": "1" } }
                            }
                        },
                        { "delete": "projects/demo-project/databases/(default)/documents/users/b" }
                    ]
                }));
            then.status(200).json_body(json!({ "writeResults": [{}, {}] }));
        });

        let data = MapValue::new(DocumentData::from([("n".to_string(), FirestoreValue::from(1))]));
        datastore(&server)
            .commit(vec![
                WriteOperation::Set {
                    key: DocumentKey::from_string("users/a").unwrap(),
                    data,
                    mask: None,
                },
                WriteOperation::Delete {
                    key: DocumentKey::from_string("users/b").unwrap(),
                },
            ])
            .await
            .unwrap();
        commit.assert();
    }

    #[tokio::test]
    async fn permission_errors_pass_through() {
        let server = start_mock_server().await;
        server.mock(|when, then| {
            when.method(POST).path(format!("{DB_PATH}/documents:commit"));
            then.status(403).json_body(json!({
                "error": { "code": 403, "message": "Missing or insufficient permissions.", "status": "PERMISSION_DENIED" }
            }));
        });
        let err = datastore(&server)
            .delete_document(&DocumentKey::from_string("users/a").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "firestore/permission-denied");
        assert_eq!(err.message(), "Missing or insufficient permissions.");
    }

    #[tokio::test]
    async fn run_query_posts_structured_query() {
        let server = start_mock_server().await;
        let run_query = server.mock(|when, then| {
            when.method(POST)
                .path(format!("{DB_PATH}/documents:runQuery"))
                .json_body(json!({
                    "structuredQuery": {
                        "from": [{ "collectionId": "users" }],
                        "orderBy": [{ "field": { "fieldPath": "__name__" }, "direction": "ASCENDING" }]
                    }
                }));
            then.status(200).json_body(json!([
                { "document": { "name": "projects/demo-project/databases/(default)/documents/users/a" } },
                { "document": { "name": "projects/demo-project/databases/(default)/documents/users/b" } },
                { "readTime": "2024-01-01T00:00:00Z" }
            ]));
        });

        let documents = datastore(&server).run_query(&users_query()).await.unwrap();
        run_query.assert();
        let ids: Vec<_> = documents.iter().map(DocumentSnapshot::id).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn listen_polls_and_emits_initial_result() {
        let server = start_mock_server().await;
        server.mock(|when, then| {
            when.method(POST).path(format!("{DB_PATH}/documents:runQuery"));
            then.status(200).json_body(json!([
                { "document": { "name": "projects/demo-project/databases/(default)/documents/users/a" } }
            ]));
        });

        let (tx, rx) = async_channel::unbounded();
        let registration = datastore(&server)
            .listen(
                users_query(),
                Arc::new(move |event: FirestoreResult<QuerySnapshot>| {
                    let _ = tx.try_send(event.map(|snapshot| snapshot.len()));
                }),
            )
            .await
            .unwrap();

        let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("initial snapshot")
            .unwrap();
        assert_eq!(first.unwrap(), 1);

        // Unchanged results are not re-emitted.
        let repeat = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(repeat.is_err());
        registration.remove();
    }
}
