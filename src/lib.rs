//! Document access and session helpers for Firebase applications.
//!
//! The crate is split the way the services it talks to are split:
//!
//! - [`documents`]: one call per document-store operation (create, read,
//!   update, delete, query, paginate, watch, batches) addressed by collection
//!   name and document id.
//! - [`session`]: a [`Session`](session::Session) record that mirrors auth
//!   state, refined from the `users/{uid}` profile and persisted locally,
//!   plus the register/login/logout flows in [`Accounts`](session::Accounts).
//! - [`firestore`], [`auth`], [`storage`]: the collaborators underneath, each
//!   with an in-memory implementation and (for the first two) a REST one.
//! - [`app`]: project configuration and the named app registry.
//!
//! ```
//! use firebase_facade::documents::Documents;
//! use firebase_facade::firestore::{DocumentData, FirestoreValue};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let documents = Documents::in_memory();
//! let mut city = DocumentData::new();
//! city.insert("name".into(), FirestoreValue::from("Lisbon"));
//! documents.create_with_id("cities", "lis", city).await.unwrap();
//! assert!(documents.exists("cities", "lis").await.unwrap());
//! # });
//! ```

pub mod app;
pub mod auth;
pub mod documents;
pub mod firestore;
pub mod logger;
pub mod session;
pub mod storage;
pub mod util;

#[cfg(test)]
mod test_support;
