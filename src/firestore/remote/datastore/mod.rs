use std::sync::Arc;

use async_trait::async_trait;

use crate::firestore::api::query::QueryDefinition;
use crate::firestore::api::{DocumentSnapshot, ListenerRegistration, SnapshotListener};
use crate::firestore::error::FirestoreResult;
use crate::firestore::model::{DocumentKey, FieldPath};
use crate::firestore::value::MapValue;

pub mod http;
pub mod in_memory;

/// One mutation inside an atomic commit.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOperation {
    /// Replaces the document, or with a mask only touches the masked fields.
    Set {
        key: DocumentKey,
        data: MapValue,
        mask: Option<Vec<FieldPath>>,
    },
    /// Touches `field_paths` of an existing document; fails when it is missing.
    Update {
        key: DocumentKey,
        data: MapValue,
        field_paths: Vec<FieldPath>,
    },
    Delete {
        key: DocumentKey,
    },
}

impl WriteOperation {
    pub fn key(&self) -> &DocumentKey {
        match self {
            WriteOperation::Set { key, .. }
            | WriteOperation::Update { key, .. }
            | WriteOperation::Delete { key } => key,
        }
    }
}

/// Backend that stores documents. No implementation retries failed calls.
#[async_trait]
pub trait Datastore: Send + Sync + 'static {
    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot>;
    async fn set_document(
        &self,
        key: &DocumentKey,
        data: MapValue,
        mask: Option<Vec<FieldPath>>,
    ) -> FirestoreResult<()>;
    async fn update_document(
        &self,
        key: &DocumentKey,
        data: MapValue,
        field_paths: Vec<FieldPath>,
    ) -> FirestoreResult<()>;
    async fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()>;
    async fn run_query(&self, query: &QueryDefinition) -> FirestoreResult<Vec<DocumentSnapshot>>;
    /// Applies every write or none of them.
    async fn commit(&self, writes: Vec<WriteOperation>) -> FirestoreResult<()>;
    /// Delivers the current result of `query`, then a fresh result after every change.
    async fn listen(
        &self,
        query: QueryDefinition,
        listener: SnapshotListener,
    ) -> FirestoreResult<ListenerRegistration>;
}

/// Supplies the bearer token attached to REST requests.
#[async_trait]
pub trait TokenProvider: Send + Sync + 'static {
    async fn get_token(&self) -> FirestoreResult<Option<String>>;
    fn invalidate_token(&self);
}

#[derive(Default, Clone)]
pub struct NoopTokenProvider;

#[async_trait]
impl TokenProvider for NoopTokenProvider {
    async fn get_token(&self) -> FirestoreResult<Option<String>> {
        Ok(None)
    }

    fn invalidate_token(&self) {}
}

pub type TokenProviderArc = Arc<dyn TokenProvider>;

pub use http::{HttpDatastore, HttpDatastoreBuilder};
pub use in_memory::{InMemoryDatastore, WriteRule};
