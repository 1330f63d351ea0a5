use std::sync::Arc;

use crate::app::FirebaseApp;
use crate::firestore::error::FirestoreResult;
use crate::firestore::model::{DatabaseId, ResourcePath};

use super::query::Query;
use super::reference::{CollectionReference, DocumentReference};

/// Handle to one logical database; cheap to clone.
#[derive(Clone, Debug)]
pub struct Firestore {
    inner: Arc<FirestoreInner>,
}

#[derive(Debug)]
struct FirestoreInner {
    app: Option<FirebaseApp>,
    database_id: DatabaseId,
}

impl Firestore {
    /// Scopes a database handle to `app`; the app options must carry a project id.
    pub fn new(app: FirebaseApp) -> FirestoreResult<Self> {
        let database_id = DatabaseId::from_app(&app)?;
        Ok(Self {
            inner: Arc::new(FirestoreInner {
                app: Some(app),
                database_id,
            }),
        })
    }

    /// A handle that is not bound to any app, used with local datastores.
    pub fn with_database_id(database_id: DatabaseId) -> Self {
        Self {
            inner: Arc::new(FirestoreInner {
                app: None,
                database_id,
            }),
        }
    }

    pub fn app(&self) -> Option<&FirebaseApp> {
        self.inner.app.as_ref()
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.inner.database_id
    }

    /// Creates a `CollectionReference` pointing at `path` (e.g. `"users"` or `"users/alice/posts"`).
    pub fn collection(&self, path: &str) -> FirestoreResult<CollectionReference> {
        let resource = ResourcePath::from_string(path)?;
        CollectionReference::new(self.clone(), resource)
    }

    /// Creates a `DocumentReference`; the path must contain collection/doc pairs.
    pub fn doc(&self, path: &str) -> FirestoreResult<DocumentReference> {
        let resource = ResourcePath::from_string(path)?;
        DocumentReference::new(self.clone(), resource)
    }

    pub fn query(&self, collection_path: &str) -> FirestoreResult<Query> {
        Ok(self.collection(collection_path)?.query())
    }
}

impl Default for Firestore {
    fn default() -> Self {
        Self::with_database_id(DatabaseId::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::FirebaseOptions;
    use crate::test_support::test_firebase_app;

    #[test]
    fn binds_project_from_app_options() {
        let firestore = Firestore::new(test_firebase_app("demo-project")).unwrap();
        assert_eq!(firestore.database_id().project_id(), "demo-project");
        assert_eq!(firestore.database_id().database(), "(default)");
        assert_eq!(firestore.app().map(FirebaseApp::name), Some("test-demo-project"));
    }

    #[test]
    fn requires_project_id() {
        let app = FirebaseApp::new("no-project", FirebaseOptions::default());
        let err = Firestore::new(app).unwrap_err();
        assert_eq!(err.code_str(), "firestore/missing-project-id");
    }

    #[test]
    fn document_paths_need_even_segments() {
        let firestore = Firestore::default();
        assert_eq!(firestore.doc("users/ada").unwrap().id(), "ada");
        assert!(firestore.doc("users").is_err());
        assert!(firestore.collection("users/ada").is_err());
    }
}
