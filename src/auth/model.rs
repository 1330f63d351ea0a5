use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Public profile of an account as reported by the auth backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    pub provider_id: String,
}

/// A signed-in account together with its tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    info: UserInfo,
    email_verified: bool,
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<Duration>,
}

impl User {
    pub fn new(info: UserInfo) -> Self {
        Self {
            info,
            email_verified: false,
            id_token: None,
            refresh_token: None,
            expires_in: None,
        }
    }

    pub(crate) fn from_response(response: &IdTokenResponse) -> Self {
        Self {
            info: UserInfo {
                uid: response.local_id.clone(),
                display_name: response.display_name.clone(),
                email: response.email.clone(),
                photo_url: response.photo_url.clone(),
                provider_id: response.provider_id.clone(),
            },
            email_verified: response.email_verified,
            id_token: Some(response.id_token.clone()),
            refresh_token: response.refresh_token.clone(),
            expires_in: response.expires_in,
        }
    }

    pub fn uid(&self) -> &str {
        &self.info.uid
    }

    pub fn email(&self) -> Option<&str> {
        self.info.email.as_deref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.info.display_name.as_deref()
    }

    pub fn photo_url(&self) -> Option<&str> {
        self.info.photo_url.as_deref()
    }

    /// Provider that authenticated this session, `password` or e.g. `google.com`.
    pub fn provider_id(&self) -> &str {
        &self.info.provider_id
    }

    pub fn email_verified(&self) -> bool {
        self.email_verified
    }

    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expires_in(&self) -> Option<Duration> {
        self.expires_in
    }

    pub fn info(&self) -> &UserInfo {
        &self.info
    }

    pub(crate) fn with_profile(&self, display_name: Option<&str>, photo_url: Option<&str>) -> Self {
        let mut next = self.clone();
        if let Some(name) = display_name {
            next.info.display_name = Some(name.to_string());
        }
        if let Some(url) = photo_url {
            next.info.photo_url = Some(url.to_string());
        }
        next
    }
}

#[derive(Clone, Debug)]
pub struct UserCredential {
    pub user: Arc<User>,
    pub provider_id: Option<String>,
    /// `signIn` or `signUp`.
    pub operation_type: Option<String>,
    pub is_new_user: bool,
}

/// Provider response handed back by an interactive sign-in step.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthCredential {
    pub provider_id: String,
    pub sign_in_method: String,
    pub token_response: Value,
}

pub struct EmailAuthProvider;

impl EmailAuthProvider {
    pub const PROVIDER_ID: &'static str = "password";
}

/// Account state returned by every successful backend sign-in or sign-up.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdTokenResponse {
    pub local_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub provider_id: String,
    pub email_verified: bool,
    pub id_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<Duration>,
    pub is_new_user: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_update_keeps_unspecified_fields() {
        let user = User::from_response(&IdTokenResponse {
            local_id: "uid-1".into(),
            email: Some("ada@example.com".into()),
            display_name: Some("Ada".into()),
            provider_id: EmailAuthProvider::PROVIDER_ID.into(),
            id_token: "token".into(),
            ..Default::default()
        });
        let renamed = user.with_profile(Some("Ada L."), None);
        assert_eq!(renamed.display_name(), Some("Ada L."));
        assert_eq!(renamed.email(), Some("ada@example.com"));
        assert_eq!(renamed.id_token(), Some("token"));
        assert_eq!(user.display_name(), Some("Ada"));
    }
}
