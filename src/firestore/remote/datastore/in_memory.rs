use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use async_channel::{Receiver, Sender};
use async_trait::async_trait;

use crate::firestore::api::operations::apply_field_mask;
use crate::firestore::api::query::QueryDefinition;
use crate::firestore::api::{
    DeliveryGate, DocumentSnapshot, ListenerRegistration, QuerySnapshot, SnapshotListener,
};
use crate::firestore::error::{not_found, permission_denied, FirestoreResult};
use crate::firestore::model::{DocumentKey, FieldPath, ResourcePath};
use crate::firestore::query_evaluator::apply_query_to_documents;
use crate::firestore::value::MapValue;
use crate::util::spawn_detached;

use super::{Datastore, WriteOperation};

/// Decides whether a write is allowed; a denied write fails its whole commit with
/// `firestore/permission-denied`.
pub type WriteRule = Arc<dyn Fn(&WriteOperation) -> bool + Send + Sync + 'static>;

type Documents = BTreeMap<DocumentKey, MapValue>;
type SnapshotEvent = FirestoreResult<QuerySnapshot>;

/// Process-local datastore with atomic commits and push listeners.
#[derive(Clone, Default)]
pub struct InMemoryDatastore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    documents: Mutex<Documents>,
    listeners: Mutex<BTreeMap<u64, ListenerEntry>>,
    next_listener_id: AtomicU64,
    write_rule: RwLock<Option<WriteRule>>,
}

struct ListenerEntry {
    query: QueryDefinition,
    sender: Sender<SnapshotEvent>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_write_rule(rule: WriteRule) -> Self {
        let datastore = Self::new();
        datastore.set_write_rule(Some(rule));
        datastore
    }

    /// Installs or clears the rule checked against every write.
    pub fn set_write_rule(&self, rule: Option<WriteRule>) {
        *self.inner.write_rule.write().unwrap() = rule;
    }

    /// Number of documents currently stored, across all collections.
    pub fn len(&self) -> usize {
        self.inner.documents.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().unwrap().len()
    }

    fn apply_writes(&self, writes: Vec<WriteOperation>) -> FirestoreResult<()> {
        let rule = self.inner.write_rule.read().unwrap().clone();
        let mut documents = self.inner.documents.lock().unwrap();

        let mut staged = documents.clone();
        let mut touched = BTreeSet::new();
        for write in writes {
            if let Some(rule) = &rule {
                if !rule(&write) {
                    return Err(permission_denied(format!(
                        "Missing or insufficient permissions to write {}",
                        write.key().path()
                    )));
                }
            }
            touched.insert(write.key().collection_path());
            apply_write(&mut staged, write)?;
        }
        *documents = staged;

        // Queued while the documents lock is held so listeners observe commit order.
        self.notify_listeners(&documents, &touched);
        Ok(())
    }

    fn notify_listeners(&self, documents: &Documents, touched: &BTreeSet<ResourcePath>) {
        let listeners = self.inner.listeners.lock().unwrap();
        for entry in listeners.values() {
            if touched.contains(entry.query.collection_path()) {
                let _ = entry.sender.try_send(Ok(evaluate(documents, &entry.query)));
            }
        }
    }

    fn remove_listener(inner: &Weak<Inner>, id: u64) {
        if let Some(inner) = inner.upgrade() {
            if let Some(entry) = inner.listeners.lock().unwrap().remove(&id) {
                entry.sender.close();
            }
        }
    }
}

fn apply_write(documents: &mut Documents, write: WriteOperation) -> FirestoreResult<()> {
    match write {
        WriteOperation::Set { key, data, mask: None } => {
            documents.insert(key, data);
        }
        WriteOperation::Set {
            key,
            data,
            mask: Some(mask),
        } => merge_into(documents, key, &data, &mask),
        WriteOperation::Update {
            key,
            data,
            field_paths,
        } => {
            if !documents.contains_key(&key) {
                return Err(not_found(format!("No document to update: {}", key.path())));
            }
            merge_into(documents, key, &data, &field_paths);
        }
        WriteOperation::Delete { key } => {
            documents.remove(&key);
        }
    }
    Ok(())
}

fn merge_into(documents: &mut Documents, key: DocumentKey, data: &MapValue, mask: &[FieldPath]) {
    let mut fields = documents
        .remove(&key)
        .map(MapValue::into_fields)
        .unwrap_or_default();
    apply_field_mask(&mut fields, data.fields(), mask);
    documents.insert(key, MapValue::new(fields));
}

fn evaluate(documents: &Documents, query: &QueryDefinition) -> QuerySnapshot {
    let candidates = documents
        .iter()
        .filter(|(key, _)| &key.collection_path() == query.collection_path())
        .map(|(key, data)| DocumentSnapshot::new(key.clone(), Some(data.clone())))
        .collect();
    QuerySnapshot::new(apply_query_to_documents(candidates, query))
}

async fn deliver(receiver: Receiver<SnapshotEvent>, gate: Arc<DeliveryGate>, listener: SnapshotListener) {
    while let Ok(event) = receiver.recv().await {
        if !gate.deliver(|| listener(event)) {
            break;
        }
    }
}

#[async_trait]
impl Datastore for InMemoryDatastore {
    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot> {
        let documents = self.inner.documents.lock().unwrap();
        Ok(DocumentSnapshot::new(key.clone(), documents.get(key).cloned()))
    }

    async fn set_document(
        &self,
        key: &DocumentKey,
        data: MapValue,
        mask: Option<Vec<FieldPath>>,
    ) -> FirestoreResult<()> {
        self.apply_writes(vec![WriteOperation::Set {
            key: key.clone(),
            data,
            mask,
        }])
    }

    async fn update_document(
        &self,
        key: &DocumentKey,
        data: MapValue,
        field_paths: Vec<FieldPath>,
    ) -> FirestoreResult<()> {
        self.apply_writes(vec![WriteOperation::Update {
            key: key.clone(),
            data,
            field_paths,
        }])
    }

    async fn delete_document(&self, key: &DocumentKey) -> FirestoreResult<()> {
        self.apply_writes(vec![WriteOperation::Delete { key: key.clone() }])
    }

    async fn run_query(&self, query: &QueryDefinition) -> FirestoreResult<Vec<DocumentSnapshot>> {
        let documents = self.inner.documents.lock().unwrap();
        Ok(evaluate(&documents, query).into_documents())
    }

    async fn commit(&self, writes: Vec<WriteOperation>) -> FirestoreResult<()> {
        self.apply_writes(writes)
    }

    async fn listen(
        &self,
        query: QueryDefinition,
        listener: SnapshotListener,
    ) -> FirestoreResult<ListenerRegistration> {
        let (sender, receiver) = async_channel::unbounded();
        let gate = DeliveryGate::new();
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);

        {
            let documents = self.inner.documents.lock().unwrap();
            let _ = sender.try_send(Ok(evaluate(&documents, &query)));
            self.inner
                .listeners
                .lock()
                .unwrap()
                .insert(id, ListenerEntry { query, sender });
        }

        spawn_detached(deliver(receiver, Arc::clone(&gate), listener));

        let inner = Arc::downgrade(&self.inner);
        Ok(ListenerRegistration::new(move || {
            InMemoryDatastore::remove_listener(&inner, id);
            gate.close();
        }))
    }
}
