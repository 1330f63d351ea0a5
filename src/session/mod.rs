//! The application's view of who is signed in.
//!
//! [`SessionManager`] mirrors auth state into a [`Session`] record, refines
//! it from the `users/{uid}` profile and persists it to local storage.
//! [`Accounts`] bundles the register, login and logout flows that keep that
//! profile collection in step with the auth account.
mod accounts;
mod manager;
mod model;

#[doc(inline)]
pub use accounts::{AccountError, AccountResult, Accounts};

#[doc(inline)]
pub use manager::{SessionListener, SessionManager, SessionSubscription};

#[doc(inline)]
pub use model::{LoginMethod, Session, SESSION_STORAGE_KEY, USERS_COLLECTION};
