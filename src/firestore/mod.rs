//! Client for the Firestore document store.
//!
//! [`FirestoreClient`] is the entry point: it pairs a [`Firestore`] handle
//! (project and database) with a [`Datastore`] backend. Two backends ship
//! with the crate: [`InMemoryDatastore`] for tests and local tooling, and
//! [`HttpDatastore`] for the REST v1 API or the emulator.
//!
//! ```
//! # async fn demo() -> firebase_facade::firestore::FirestoreResult<()> {
//! use firebase_facade::firestore::{Firestore, FirestoreClient, FirestoreValue};
//! use std::collections::BTreeMap;
//!
//! let client = FirestoreClient::with_in_memory(Firestore::default());
//! let mut data = BTreeMap::new();
//! data.insert("name".to_string(), FirestoreValue::from("Ada"));
//! client.set_doc("users/ada", data, None).await?;
//! assert!(client.get_doc("users/ada").await?.exists());
//! # Ok(())
//! # }
//! ```
pub mod api;
pub mod error;
pub mod model;
pub(crate) mod query_evaluator;
pub mod remote;
pub mod value;

pub use api::{
    Bound, CollectionReference, DocumentReference, DocumentSnapshot, FieldFilter, FilterOperator,
    Firestore, FirestoreClient, ListenerRegistration, OrderBy, OrderDirection, Query,
    QueryDefinition, QuerySnapshot, SetOptions, SnapshotListener, WriteBatch, MAX_BATCH_WRITES,
};
pub use error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
pub use model::{DatabaseId, DocumentKey, FieldPath, ResourcePath, Timestamp};
pub use remote::{
    Datastore, HttpDatastore, InMemoryDatastore, TokenProvider, TokenProviderArc, WriteOperation,
    WriteRule,
};
pub use value::{data_from_json, data_to_json, DocumentData, FirestoreValue, MapValue};
