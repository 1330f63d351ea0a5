mod database;
pub mod document;
mod listener;
pub(crate) mod operations;
pub(crate) mod query;
mod reference;
mod snapshot;
mod write_batch;

pub use database::Firestore;
pub use document::FirestoreClient;
pub(crate) use listener::DeliveryGate;
pub use listener::{ListenerRegistration, SnapshotListener};
pub use operations::SetOptions;
pub use query::{
    Bound, FieldFilter, FilterOperator, OrderBy, OrderDirection, Query, QueryDefinition,
    QuerySnapshot,
};
pub use reference::{CollectionReference, DocumentReference};
pub use snapshot::DocumentSnapshot;
pub use write_batch::{WriteBatch, MAX_BATCH_WRITES};
