//! App configuration and the registry of named apps.
mod api;
mod errors;
mod logger;
mod types;

#[doc(inline)]
pub use api::{delete_app, get_app, get_apps, initialize_app};

#[doc(inline)]
pub use errors::{AppError, AppResult};

#[doc(inline)]
pub use types::{
    FirebaseApp, FirebaseAppSettings, FirebaseOptions, DEFAULT_DATABASE_ID, DEFAULT_ENTRY_NAME,
};
