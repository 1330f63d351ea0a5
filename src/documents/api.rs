use std::sync::{Arc, LazyLock};

use crate::firestore::error::resource_exhausted;
use crate::firestore::{
    DocumentData, DocumentReference, DocumentSnapshot, FilterOperator, Firestore, FirestoreClient,
    FirestoreResult, FirestoreValue, ListenerRegistration, OrderDirection, Query, QuerySnapshot,
    SetOptions, MAX_BATCH_WRITES,
};
use crate::logger::Logger;

use super::error::{DocumentError, DocumentResult};

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@firebase-facade/documents"));

/// One call per document-store operation, addressed by collection name and
/// document id.
///
/// Every method forwards to the wrapped [`FirestoreClient`] and returns its
/// result; failures surface as [`DocumentError::Write`] or
/// [`DocumentError::Read`] around the untouched store error. Nothing is retried.
#[derive(Clone)]
pub struct Documents {
    client: FirestoreClient,
}

impl Documents {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// A facade over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(FirestoreClient::with_in_memory(Firestore::default()))
    }

    pub fn client(&self) -> &FirestoreClient {
        &self.client
    }

    /// Writes `data` to `collection/doc_id`, replacing any existing record, or
    /// to a store-generated id when `doc_id` is `None`.
    pub async fn create(
        &self,
        collection: &str,
        data: DocumentData,
        doc_id: Option<&str>,
    ) -> DocumentResult<DocumentReference> {
        let reference = self
            .client
            .collection(collection)
            .and_then(|collection| collection.doc(doc_id))
            .map_err(DocumentError::Write)?;
        self.client
            .set_doc(&document_path(&reference), data, None)
            .await
            .map_err(DocumentError::Write)?;
        Ok(reference)
    }

    /// [`create`](Self::create) with a mandatory id.
    pub async fn create_with_id(
        &self,
        collection: &str,
        doc_id: &str,
        data: DocumentData,
    ) -> DocumentResult<DocumentReference> {
        self.create(collection, data, Some(doc_id)).await
    }

    /// Deletes the record; deleting a missing record succeeds.
    pub async fn delete(&self, collection: &str, doc_id: &str) -> DocumentResult<()> {
        let path = self.path(collection, doc_id).map_err(DocumentError::Write)?;
        self.client
            .delete_doc(&path)
            .await
            .map_err(DocumentError::Write)
    }

    /// Merges `partial` into an existing record.
    ///
    /// Top-level keys are field paths (`"address.city"` touches one nested
    /// field). Fails with `firestore/not-found` when the record is missing; use
    /// [`upsert`](Self::upsert) to create it instead.
    pub async fn update(&self, collection: &str, doc_id: &str, partial: DocumentData) -> DocumentResult<()> {
        let path = self.path(collection, doc_id).map_err(DocumentError::Write)?;
        self.client
            .update_doc(&path, partial)
            .await
            .map_err(DocumentError::Write)
    }

    /// Merges `partial` into the record, creating it when missing.
    pub async fn upsert(&self, collection: &str, doc_id: &str, partial: DocumentData) -> DocumentResult<()> {
        let path = self.path(collection, doc_id).map_err(DocumentError::Write)?;
        self.client
            .set_doc(&path, partial, Some(SetOptions::merge_all()))
            .await
            .map_err(DocumentError::Write)
    }

    /// Reads one record; a missing record yields a snapshot whose `exists()` is false.
    pub async fn get(&self, collection: &str, doc_id: &str) -> DocumentResult<DocumentSnapshot> {
        let path = self.path(collection, doc_id).map_err(DocumentError::Read)?;
        self.client.get_doc(&path).await.map_err(DocumentError::Read)
    }

    pub async fn exists(&self, collection: &str, doc_id: &str) -> DocumentResult<bool> {
        Ok(self.get(collection, doc_id).await?.exists())
    }

    /// Every record in the collection, in document id order.
    pub async fn list(&self, collection: &str) -> DocumentResult<QuerySnapshot> {
        self.read(collection, Ok).await
    }

    /// Records whose `field` relates to `value` by `operator`.
    pub async fn query(
        &self,
        collection: &str,
        field: &str,
        operator: FilterOperator,
        value: impl Into<FirestoreValue>,
    ) -> DocumentResult<QuerySnapshot> {
        let value = value.into();
        self.read(collection, |query| query.where_field(field, operator, value))
            .await
    }

    /// Records sorted by `field`; records without the field are left out.
    pub async fn order_by(
        &self,
        collection: &str,
        field: &str,
        direction: OrderDirection,
    ) -> DocumentResult<QuerySnapshot> {
        self.read(collection, |query| query.order_by(field, direction))
            .await
    }

    /// At most `n` records. `n` must be positive.
    pub async fn limit(&self, collection: &str, n: u32) -> DocumentResult<QuerySnapshot> {
        self.read(collection, |query| query.limit(n)).await
    }

    /// Up to `n` records strictly after `cursor` in document id order.
    ///
    /// Returns an empty snapshot once the collection is exhausted.
    pub async fn paginate(
        &self,
        collection: &str,
        cursor: &DocumentSnapshot,
        n: u32,
    ) -> DocumentResult<QuerySnapshot> {
        self.read(collection, |query| query.start_after(cursor)?.limit(n))
            .await
    }

    /// Up to `n` records strictly after `cursor` in `field` order, ties broken
    /// by document id.
    pub async fn paginate_ordered(
        &self,
        collection: &str,
        field: &str,
        direction: OrderDirection,
        cursor: &DocumentSnapshot,
        n: u32,
    ) -> DocumentResult<QuerySnapshot> {
        self.read(collection, |query| {
            query.order_by(field, direction)?.start_after(cursor)?.limit(n)
        })
        .await
    }

    /// Calls `on_change` with the collection's current records and again after
    /// every change, until the returned registration is removed or dropped.
    pub async fn watch<F>(&self, collection: &str, on_change: F) -> DocumentResult<ListenerRegistration>
    where
        F: Fn(DocumentResult<QuerySnapshot>) + Send + Sync + 'static,
    {
        let query = self.client.firestore().query(collection).map_err(DocumentError::Read)?;
        self.client
            .on_snapshot(
                &query,
                Arc::new(move |event: FirestoreResult<QuerySnapshot>| {
                    on_change(event.map_err(DocumentError::Read))
                }),
            )
            .await
            .map_err(DocumentError::Read)
    }

    /// Atomically creates one record per entry, each under a generated id.
    ///
    /// References are returned in input order. More than
    /// [`MAX_BATCH_WRITES`] records fail with `firestore/resource-exhausted`
    /// before anything is written.
    pub async fn batch_create(
        &self,
        collection: &str,
        records: Vec<DocumentData>,
    ) -> DocumentResult<Vec<DocumentReference>> {
        ensure_batch_size(records.len())?;
        let collection_ref = self.client.collection(collection).map_err(DocumentError::Write)?;
        let mut batch = self.client.batch();
        let mut references = Vec::with_capacity(records.len());
        for data in records {
            let reference = collection_ref.doc(None).map_err(DocumentError::Write)?;
            batch
                .set(&reference, data, None)
                .map_err(DocumentError::Write)?;
            references.push(reference);
        }
        LOGGER.debug(format!("committing {} creates in {collection}", references.len()));
        batch.commit().await.map_err(DocumentError::Write)?;
        Ok(references)
    }

    /// Atomically deletes every named record.
    pub async fn batch_delete<I, S>(&self, collection: &str, doc_ids: I) -> DocumentResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let doc_ids: Vec<S> = doc_ids.into_iter().collect();
        ensure_batch_size(doc_ids.len())?;
        let collection_ref = self.client.collection(collection).map_err(DocumentError::Write)?;
        let mut batch = self.client.batch();
        for doc_id in &doc_ids {
            let reference = collection_ref
                .doc(Some(doc_id.as_ref()))
                .map_err(DocumentError::Write)?;
            batch.delete(&reference).map_err(DocumentError::Write)?;
        }
        LOGGER.debug(format!("committing {} deletes in {collection}", doc_ids.len()));
        batch.commit().await.map_err(DocumentError::Write)
    }

    fn path(&self, collection: &str, doc_id: &str) -> FirestoreResult<String> {
        let reference = self.client.collection(collection)?.doc(Some(doc_id))?;
        Ok(document_path(&reference))
    }

    async fn read<F>(&self, collection: &str, build: F) -> DocumentResult<QuerySnapshot>
    where
        F: FnOnce(Query) -> FirestoreResult<Query>,
    {
        let query = self
            .client
            .firestore()
            .query(collection)
            .and_then(build)
            .map_err(DocumentError::Read)?;
        self.client
            .get_docs(&query)
            .await
            .map_err(DocumentError::Read)
    }
}

fn document_path(reference: &DocumentReference) -> String {
    reference.path().canonical_string()
}

fn ensure_batch_size(len: usize) -> DocumentResult<()> {
    if len > MAX_BATCH_WRITES {
        return Err(DocumentError::Write(resource_exhausted(format!(
            "A batch holds at most {MAX_BATCH_WRITES} writes, got {len}"
        ))));
    }
    Ok(())
}
