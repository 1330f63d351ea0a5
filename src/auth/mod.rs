//! Sign-in, sign-up and identity-change notifications.
//!
//! [`Auth`] delegates every account operation to an [`AuthBackend`]:
//! [`RestAuthBackend`] talks to Identity Toolkit (or the Auth emulator) and
//! [`InMemoryAuthBackend`] keeps accounts in process memory. Federated
//! sign-in runs the interactive step through an application-supplied
//! [`OAuthPopupHandler`].
mod api;
mod backend;
mod error;
mod model;
mod oauth;
mod token_provider;

#[doc(inline)]
pub use api::{Auth, AuthBuilder, AuthStateListener, AuthStateSubscription};

#[doc(inline)]
pub use backend::{
    AuthBackend, InMemoryAuthBackend, OutOfBandEmail, OutOfBandKind, RestAuthBackend,
};

#[doc(inline)]
pub use error::{AuthError, AuthResult};

#[doc(inline)]
pub use model::{AuthCredential, EmailAuthProvider, IdTokenResponse, User, UserCredential, UserInfo};

#[doc(inline)]
pub use oauth::{GoogleAuthProvider, OAuthPopupHandler, OAuthProvider, OAuthRequest};

#[doc(inline)]
pub use token_provider::{auth_token_provider_arc, AuthTokenProvider};
