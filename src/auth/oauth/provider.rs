use std::collections::HashMap;

use url::Url;

use super::OAuthRequest;
use crate::app::FirebaseOptions;
use crate::auth::error::{AuthError, AuthResult};

/// Configuration of an OAuth identity provider.
///
/// Scopes, custom parameters and language hints are folded into the
/// authorization URL by [`build_request`](Self::build_request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProvider {
    provider_id: String,
    authorization_endpoint: String,
    scopes: Vec<String>,
    custom_parameters: HashMap<String, String>,
    display_name: Option<String>,
    language_code: Option<String>,
}

impl OAuthProvider {
    pub fn new(provider_id: impl Into<String>, authorization_endpoint: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            authorization_endpoint: authorization_endpoint.into(),
            scopes: Vec::new(),
            custom_parameters: HashMap::new(),
            display_name: None,
            language_code: None,
        }
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn authorization_endpoint(&self) -> &str {
        &self.authorization_endpoint
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn custom_parameters(&self) -> &HashMap<String, String> {
        &self.custom_parameters
    }

    /// Adds a scope to the provider if it has not been added yet.
    pub fn add_scope(&mut self, scope: impl Into<String>) {
        let value = scope.into();
        if !self.scopes.contains(&value) {
            self.scopes.push(value);
        }
    }

    pub fn set_custom_parameters(&mut self, parameters: HashMap<String, String>) -> &mut Self {
        self.custom_parameters = parameters;
        self
    }

    pub fn set_display_name(&mut self, value: impl Into<String>) -> &mut Self {
        self.display_name = Some(value.into());
        self
    }

    pub fn set_language_code(&mut self, value: impl Into<String>) -> &mut Self {
        self.language_code = Some(value.into());
        self
    }

    /// Builds the request handed to an [`OAuthPopupHandler`](super::OAuthPopupHandler).
    pub fn build_request(&self, options: Option<&FirebaseOptions>) -> AuthResult<OAuthRequest> {
        let mut url = Url::parse(&self.authorization_endpoint).map_err(|err| {
            AuthError::InvalidCredential(format!(
                "Invalid authorization endpoint for provider {}: {err}",
                self.provider_id
            ))
        })?;

        {
            let mut pairs = url.query_pairs_mut();
            if !self.scopes.is_empty() {
                pairs.append_pair("scope", &self.scopes.join(" "));
            }
            if let Some(lang) = &self.language_code {
                pairs.append_pair("hl", lang);
            }
            if let Some(options) = options {
                if let Some(auth_domain) = &options.auth_domain {
                    pairs.append_pair("auth_domain", auth_domain);
                }
                if let Some(api_key) = &options.api_key {
                    pairs.append_pair("apiKey", api_key);
                }
            }
            let mut custom: Vec<_> = self.custom_parameters.iter().collect();
            custom.sort();
            for (key, value) in custom {
                pairs.append_pair(key, value);
            }
        }

        let mut request = OAuthRequest::new(self.provider_id.clone(), String::from(url));
        if let Some(display) = &self.display_name {
            request = request.with_display_name(display.clone());
        }
        if let Some(lang) = &self.language_code {
            request = request.with_language_code(lang.clone());
        }
        Ok(request.with_custom_parameters(self.custom_parameters.clone()))
    }
}
