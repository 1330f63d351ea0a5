//! Collection-and-id access to the document store.
//!
//! ```
//! # async fn demo() -> firebase_facade::documents::DocumentResult<()> {
//! use firebase_facade::documents::Documents;
//! use firebase_facade::firestore::{DocumentData, FirestoreValue};
//!
//! let documents = Documents::in_memory();
//! let mut data = DocumentData::new();
//! data.insert("title".into(), FirestoreValue::from("Hello"));
//! documents.create_with_id("posts", "p1", data).await?;
//! assert!(documents.exists("posts", "p1").await?);
//! # Ok(())
//! # }
//! ```
mod api;
mod error;

pub use api::Documents;
pub use error::{DocumentError, DocumentResult};
