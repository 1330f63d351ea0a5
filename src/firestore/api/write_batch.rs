use std::sync::Arc;

use crate::firestore::error::{invalid_argument, resource_exhausted, FirestoreResult};
use crate::firestore::remote::datastore::{Datastore, WriteOperation};
use crate::firestore::value::DocumentData;

use super::database::Firestore;
use super::operations::{encode_set_data, encode_update_data, SetOptions};
use super::reference::DocumentReference;

/// Maximum number of writes the store accepts in a single commit.
pub const MAX_BATCH_WRITES: usize = 500;

/// Aggregates write operations and commits them atomically.
#[derive(Clone)]
pub struct WriteBatch {
    firestore: Firestore,
    datastore: Arc<dyn Datastore>,
    writes: Vec<WriteOperation>,
}

impl WriteBatch {
    pub(crate) fn new(firestore: Firestore, datastore: Arc<dyn Datastore>) -> Self {
        Self {
            firestore,
            datastore,
            writes: Vec::new(),
        }
    }

    pub fn set(
        &mut self,
        reference: &DocumentReference,
        data: DocumentData,
        options: Option<SetOptions>,
    ) -> FirestoreResult<&mut Self> {
        self.ensure_capacity()?;
        self.ensure_same_firestore(reference)?;
        let encoded = encode_set_data(data, &options.unwrap_or_default())?;
        self.writes.push(WriteOperation::Set {
            key: reference.key().clone(),
            data: encoded.map,
            mask: encoded.mask,
        });
        Ok(self)
    }

    pub fn update(&mut self, reference: &DocumentReference, data: DocumentData) -> FirestoreResult<&mut Self> {
        self.ensure_capacity()?;
        self.ensure_same_firestore(reference)?;
        let encoded = encode_update_data(data)?;
        self.writes.push(WriteOperation::Update {
            key: reference.key().clone(),
            data: encoded.map,
            field_paths: encoded.field_paths,
        });
        Ok(self)
    }

    pub fn delete(&mut self, reference: &DocumentReference) -> FirestoreResult<&mut Self> {
        self.ensure_capacity()?;
        self.ensure_same_firestore(reference)?;
        self.writes.push(WriteOperation::Delete {
            key: reference.key().clone(),
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Commits all queued writes; either every write applies or none does.
    pub async fn commit(self) -> FirestoreResult<()> {
        if self.writes.is_empty() {
            return Ok(());
        }
        self.datastore.commit(self.writes).await
    }

    fn ensure_same_firestore(&self, reference: &DocumentReference) -> FirestoreResult<()> {
        if self.firestore.database_id() != reference.firestore().database_id() {
            return Err(invalid_argument(
                "All WriteBatch operations must target the same Firestore instance",
            ));
        }
        Ok(())
    }

    fn ensure_capacity(&self) -> FirestoreResult<()> {
        if self.writes.len() >= MAX_BATCH_WRITES {
            return Err(resource_exhausted(format!(
                "WriteBatch cannot contain more than {MAX_BATCH_WRITES} operations"
            )));
        }
        Ok(())
    }
}
