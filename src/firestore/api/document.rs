use std::sync::Arc;

use crate::firestore::api::operations::{encode_set_data, encode_update_data, SetOptions};
use crate::firestore::api::query::{Query, QuerySnapshot};
use crate::firestore::api::snapshot::DocumentSnapshot;
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::DocumentKey;
use crate::firestore::remote::datastore::{Datastore, HttpDatastore, InMemoryDatastore, TokenProviderArc};
use crate::firestore::value::DocumentData;

use super::database::Firestore;
use super::listener::{ListenerRegistration, SnapshotListener};
use super::reference::{CollectionReference, DocumentReference};
use super::write_batch::WriteBatch;

/// Entry point for document reads, writes, queries and listeners.
#[derive(Clone)]
pub struct FirestoreClient {
    firestore: Firestore,
    datastore: Arc<dyn Datastore>,
}

impl FirestoreClient {
    pub fn new(firestore: Firestore, datastore: Arc<dyn Datastore>) -> Self {
        Self { firestore, datastore }
    }

    /// Returns a client that stores documents in memory only.
    pub fn with_in_memory(firestore: Firestore) -> Self {
        Self::new(firestore, Arc::new(InMemoryDatastore::new()))
    }

    /// Builds a client that talks to the REST endpoints without credentials.
    ///
    /// The endpoint honours `firestore_emulator_host` from the app options.
    pub fn with_http_datastore(firestore: Firestore) -> FirestoreResult<Self> {
        let datastore = HttpDatastore::for_firestore(&firestore)?.build()?;
        Ok(Self::new(firestore, Arc::new(datastore)))
    }

    /// Like [`with_http_datastore`](Self::with_http_datastore) but attaches a bearer token to every request.
    pub fn with_http_datastore_authenticated(
        firestore: Firestore,
        auth_provider: TokenProviderArc,
    ) -> FirestoreResult<Self> {
        let datastore = HttpDatastore::for_firestore(&firestore)?
            .with_auth_provider(auth_provider)
            .build()?;
        Ok(Self::new(firestore, Arc::new(datastore)))
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    pub fn collection(&self, path: &str) -> FirestoreResult<CollectionReference> {
        self.firestore.collection(path)
    }

    /// Creates a new write batch bound to this client's datastore.
    pub fn batch(&self) -> WriteBatch {
        WriteBatch::new(self.firestore.clone(), Arc::clone(&self.datastore))
    }

    /// Fetches the document at `path`; a missing document yields a snapshot without data.
    pub async fn get_doc(&self, path: &str) -> FirestoreResult<DocumentSnapshot> {
        let key = DocumentKey::from_string(path)?;
        self.datastore.get_document(&key).await
    }

    /// Writes `data` into the document at `path`, replacing it unless `options` request a merge.
    pub async fn set_doc(&self, path: &str, data: DocumentData, options: Option<SetOptions>) -> FirestoreResult<()> {
        let key = DocumentKey::from_string(path)?;
        let encoded = encode_set_data(data, &options.unwrap_or_default())?;
        self.datastore.set_document(&key, encoded.map, encoded.mask).await
    }

    /// Applies a partial update to an existing document.
    ///
    /// # Errors
    /// Returns `firestore/invalid-argument` if `data` is empty and
    /// `firestore/not-found` if the document does not exist.
    pub async fn update_doc(&self, path: &str, data: DocumentData) -> FirestoreResult<()> {
        let key = DocumentKey::from_string(path)?;
        let encoded = encode_update_data(data)?;
        self.datastore
            .update_document(&key, encoded.map, encoded.field_paths)
            .await
    }

    /// Deletes the document at `path`. Deleting a missing document succeeds.
    pub async fn delete_doc(&self, path: &str) -> FirestoreResult<()> {
        let key = DocumentKey::from_string(path)?;
        self.datastore.delete_document(&key).await
    }

    /// Adds a document with a generated identifier and returns its reference.
    pub async fn add_doc(&self, collection_path: &str, data: DocumentData) -> FirestoreResult<DocumentReference> {
        let reference = self.collection(collection_path)?.doc(None)?;
        self.set_doc(&reference.path().canonical_string(), data, None)
            .await?;
        Ok(reference)
    }

    pub async fn get_docs(&self, query: &Query) -> FirestoreResult<QuerySnapshot> {
        self.ensure_same_database(query.firestore())?;
        let documents = self.datastore.run_query(&query.definition()).await?;
        Ok(QuerySnapshot::new(documents))
    }

    /// Registers `listener` for the current result of `query` and every later change.
    pub async fn on_snapshot(&self, query: &Query, listener: SnapshotListener) -> FirestoreResult<ListenerRegistration> {
        self.ensure_same_database(query.firestore())?;
        self.datastore.listen(query.definition(), listener).await
    }

    fn ensure_same_database(&self, firestore: &Firestore) -> FirestoreResult<()> {
        if self.firestore.database_id() != firestore.database_id() {
            return Err(invalid_argument(
                "Query targets a different Firestore instance than this client",
            ));
        }
        Ok(())
    }
}
