use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::fmt::{Display, Formatter};

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{DocumentKey, ResourcePath};

use super::database::Firestore;
use super::query::Query;

const AUTO_ID_LENGTH: usize = 20;

#[derive(Clone, Debug)]
pub struct CollectionReference {
    firestore: Firestore,
    path: ResourcePath,
}

impl CollectionReference {
    pub(crate) fn new(firestore: Firestore, path: ResourcePath) -> FirestoreResult<Self> {
        if path.len() % 2 == 0 {
            return Err(invalid_argument(format!(
                "Collection references must point to a collection (odd number of segments), got '{path}'"
            )));
        }
        Ok(Self { firestore, path })
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// The last segment of the collection path.
    pub fn id(&self) -> &str {
        self.path.last_segment().unwrap_or_default()
    }

    /// Returns a reference to the document identified by `document_id`.
    ///
    /// When `document_id` is `None`, a random 20 character identifier is generated.
    pub fn doc(&self, document_id: Option<&str>) -> FirestoreResult<DocumentReference> {
        let id = match document_id {
            Some(id) if id.trim().is_empty() => {
                return Err(invalid_argument("Document ID cannot be empty"))
            }
            Some(id) if id.contains('/') => {
                return Err(invalid_argument("Document ID cannot contain '/'"))
            }
            Some(id) => id.to_string(),
            None => generate_auto_id(),
        };
        DocumentReference::new(self.firestore.clone(), self.path.child([id]))
    }

    /// Creates a query that targets every document of this collection.
    pub fn query(&self) -> Query {
        Query::new(self.firestore.clone(), self.path.clone())
    }
}

impl Display for CollectionReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CollectionReference({})", self.path)
    }
}

#[derive(Clone, Debug)]
pub struct DocumentReference {
    firestore: Firestore,
    key: DocumentKey,
}

impl DocumentReference {
    pub(crate) fn new(firestore: Firestore, path: ResourcePath) -> FirestoreResult<Self> {
        let key = DocumentKey::from_path(path)?;
        Ok(Self { firestore, key })
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    /// The document identifier (the last segment of its path).
    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn path(&self) -> &ResourcePath {
        self.key.path()
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    /// The parent collection containing this document.
    pub fn parent(&self) -> CollectionReference {
        CollectionReference {
            firestore: self.firestore.clone(),
            path: self.key.collection_path(),
        }
    }
}

impl PartialEq for DocumentReference {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.firestore.database_id() == other.firestore.database_id()
    }
}

impl Display for DocumentReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentReference({})", self.key.path())
    }
}

fn generate_auto_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(AUTO_ID_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_and_doc_paths() {
        let firestore = Firestore::default();
        let users = firestore.collection("users").unwrap();
        let alice = users.doc(Some("alice")).unwrap();
        assert_eq!(alice.path().canonical_string(), "users/alice");
        assert_eq!(alice.parent().id(), "users");
        assert!(firestore.collection("users/alice").is_err());
    }

    #[test]
    fn auto_ids_are_twenty_alphanumerics() {
        let users = Firestore::default().collection("users").unwrap();
        let first = users.doc(None).unwrap();
        let second = users.doc(None).unwrap();
        assert_eq!(first.id().len(), 20);
        assert!(first.id().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn rejects_invalid_document_ids() {
        let users = Firestore::default().collection("users").unwrap();
        assert!(users.doc(Some("a/b")).is_err());
        assert!(users.doc(Some(" ")).is_err());
    }
}
