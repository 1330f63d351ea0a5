use async_trait::async_trait;

use crate::auth::error::AuthResult;
use crate::auth::model::{AuthCredential, IdTokenResponse};

pub mod in_memory;
pub mod rest;

pub use in_memory::{InMemoryAuthBackend, OutOfBandEmail, OutOfBandKind};
pub use rest::RestAuthBackend;

/// Account operations the [`Auth`](crate::auth::Auth) service delegates to.
#[async_trait]
pub trait AuthBackend: Send + Sync + 'static {
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<IdTokenResponse>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<IdTokenResponse>;

    /// Exchanges a federated provider credential for a session, creating the
    /// account on first use.
    async fn sign_in_with_idp(
        &self,
        credential: &AuthCredential,
        request_uri: &str,
    ) -> AuthResult<IdTokenResponse>;

    async fn send_password_reset_email(&self, email: &str) -> AuthResult<()>;

    async fn send_email_verification(&self, id_token: &str) -> AuthResult<()>;

    async fn update_profile(
        &self,
        id_token: &str,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> AuthResult<()>;
}
