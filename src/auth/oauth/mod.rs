mod provider;
mod providers;

pub use provider::OAuthProvider;
pub use providers::GoogleAuthProvider;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::auth::error::AuthResult;
use crate::auth::model::AuthCredential;

/// Parameters needed to run an interactive OAuth sign-in.
///
/// `auth_url` is the fully built authorization URL; the other fields are
/// kept separately for handlers that render their own UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthRequest {
    /// Provider identifier (e.g. `google.com`).
    pub provider_id: String,
    pub auth_url: String,
    pub display_name: Option<String>,
    pub language_code: Option<String>,
    pub custom_parameters: HashMap<String, String>,
}

impl OAuthRequest {
    pub fn new(provider_id: impl Into<String>, auth_url: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            auth_url: auth_url.into(),
            display_name: None,
            language_code: None,
            custom_parameters: HashMap::new(),
        }
    }

    pub fn with_display_name(mut self, value: impl Into<String>) -> Self {
        self.display_name = Some(value.into());
        self
    }

    pub fn with_language_code(mut self, value: impl Into<String>) -> Self {
        self.language_code = Some(value.into());
        self
    }

    pub fn with_custom_parameters(mut self, parameters: HashMap<String, String>) -> Self {
        self.custom_parameters = parameters;
        self
    }
}

/// Performs the interactive step of a popup sign-in.
///
/// Implementations open a browser window or dialog, complete the provider
/// handshake and return the provider's token response as an
/// [`AuthCredential`]; the auth backend then exchanges it for a session.
#[async_trait]
pub trait OAuthPopupHandler: Send + Sync {
    async fn open_popup(&self, request: OAuthRequest) -> AuthResult<AuthCredential>;
}
