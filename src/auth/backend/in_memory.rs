use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;

use crate::auth::error::{AuthError, AuthResult};
use crate::auth::model::{AuthCredential, EmailAuthProvider, IdTokenResponse};

use super::AuthBackend;

const MIN_PASSWORD_LENGTH: usize = 6;
const UID_LENGTH: usize = 28;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutOfBandKind {
    PasswordReset,
    VerifyEmail,
}

/// An email the backend would have sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutOfBandEmail {
    pub kind: OutOfBandKind,
    pub email: String,
}

#[derive(Clone, Debug)]
struct Account {
    uid: String,
    email: String,
    password: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    email_verified: bool,
    disabled: bool,
}

#[derive(Default)]
struct State {
    // Keyed by lower-cased email.
    accounts: BTreeMap<String, Account>,
    tokens: BTreeMap<String, String>,
    outbox: Vec<OutOfBandEmail>,
}

/// Auth backend keeping accounts in process memory.
///
/// Mirrors the server's validation: passwords need at least six characters,
/// emails are unique case-insensitively, and disabled accounts cannot sign in.
#[derive(Clone, Default)]
pub struct InMemoryAuthBackend {
    state: Arc<Mutex<State>>,
}

impl InMemoryAuthBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emails queued by password-reset and verification requests, oldest first.
    pub fn sent_emails(&self) -> Vec<OutOfBandEmail> {
        self.state.lock().unwrap().outbox.clone()
    }

    pub fn account_count(&self) -> usize {
        self.state.lock().unwrap().accounts.len()
    }

    /// Disables or re-enables the account registered under `email`.
    pub fn set_disabled(&self, email: &str, disabled: bool) -> AuthResult<()> {
        let mut state = self.state.lock().unwrap();
        let account = state
            .accounts
            .get_mut(&normalize_email(email))
            .ok_or_else(|| AuthError::UserNotFound(email.to_string()))?;
        account.disabled = disabled;
        Ok(())
    }

    fn issue(state: &mut State, account: &Account, provider_id: &str, is_new_user: bool) -> IdTokenResponse {
        let id_token = random_string(40);
        state.tokens.insert(id_token.clone(), account.uid.clone());
        IdTokenResponse {
            local_id: account.uid.clone(),
            email: Some(account.email.clone()),
            display_name: account.display_name.clone(),
            photo_url: account.photo_url.clone(),
            provider_id: provider_id.to_string(),
            email_verified: account.email_verified,
            id_token,
            refresh_token: Some(random_string(40)),
            expires_in: None,
            is_new_user,
        }
    }

    fn account_for_token<'a>(state: &'a mut State, id_token: &str) -> AuthResult<&'a mut Account> {
        let uid = state
            .tokens
            .get(id_token)
            .cloned()
            .ok_or_else(|| AuthError::InvalidCredential("Unknown ID token".into()))?;
        state
            .accounts
            .values_mut()
            .find(|account| account.uid == uid)
            .ok_or_else(|| AuthError::UserNotFound(uid))
    }
}

#[async_trait]
impl AuthBackend for InMemoryAuthBackend {
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<IdTokenResponse> {
        validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword(format!(
                "Password should be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        let mut state = self.state.lock().unwrap();
        let key = normalize_email(email);
        if state.accounts.contains_key(&key) {
            return Err(AuthError::EmailAlreadyInUse(email.to_string()));
        }
        let account = Account {
            uid: random_string(UID_LENGTH),
            email: email.to_string(),
            password: Some(password.to_string()),
            display_name: None,
            photo_url: None,
            email_verified: false,
            disabled: false,
        };
        state.accounts.insert(key, account.clone());
        Ok(Self::issue(&mut state, &account, EmailAuthProvider::PROVIDER_ID, true))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<IdTokenResponse> {
        let mut state = self.state.lock().unwrap();
        let account = state
            .accounts
            .get(&normalize_email(email))
            .cloned()
            .ok_or_else(|| AuthError::UserNotFound(email.to_string()))?;
        if account.password.as_deref() != Some(password) {
            return Err(AuthError::InvalidCredential(
                "The password is invalid or the user does not have a password".into(),
            ));
        }
        if account.disabled {
            return Err(AuthError::UserDisabled(email.to_string()));
        }
        Ok(Self::issue(&mut state, &account, EmailAuthProvider::PROVIDER_ID, false))
    }

    async fn sign_in_with_idp(
        &self,
        credential: &AuthCredential,
        _request_uri: &str,
    ) -> AuthResult<IdTokenResponse> {
        let response = &credential.token_response;
        let has_token = ["idToken", "oauthIdToken", "accessToken", "oauthAccessToken"]
            .iter()
            .any(|key| response.get(*key).and_then(Value::as_str).is_some());
        if !has_token {
            return Err(AuthError::InvalidCredential(
                "OAuth token response missing id_token/access_token".into(),
            ));
        }
        let email = response
            .get("email")
            .and_then(Value::as_str)
            .ok_or_else(|| AuthError::InvalidCredential("OAuth token response missing email".into()))?;
        let text = |key: &str| response.get(key).and_then(Value::as_str).map(str::to_string);

        let mut state = self.state.lock().unwrap();
        let key = normalize_email(email);
        let is_new_user = !state.accounts.contains_key(&key);
        let account = state.accounts.entry(key).or_insert_with(|| Account {
            uid: random_string(UID_LENGTH),
            email: email.to_string(),
            password: None,
            display_name: None,
            photo_url: None,
            email_verified: true,
            disabled: false,
        });
        if account.disabled {
            return Err(AuthError::UserDisabled(email.to_string()));
        }
        if account.display_name.is_none() {
            account.display_name = text("displayName");
        }
        if account.photo_url.is_none() {
            account.photo_url = text("photoUrl");
        }
        let account = account.clone();
        Ok(Self::issue(&mut state, &account, &credential.provider_id, is_new_user))
    }

    async fn send_password_reset_email(&self, email: &str) -> AuthResult<()> {
        let mut state = self.state.lock().unwrap();
        let account = state
            .accounts
            .get(&normalize_email(email))
            .cloned()
            .ok_or_else(|| AuthError::UserNotFound(email.to_string()))?;
        state.outbox.push(OutOfBandEmail {
            kind: OutOfBandKind::PasswordReset,
            email: account.email,
        });
        Ok(())
    }

    async fn send_email_verification(&self, id_token: &str) -> AuthResult<()> {
        let mut state = self.state.lock().unwrap();
        let email = Self::account_for_token(&mut state, id_token)?.email.clone();
        state.outbox.push(OutOfBandEmail {
            kind: OutOfBandKind::VerifyEmail,
            email,
        });
        Ok(())
    }

    async fn update_profile(
        &self,
        id_token: &str,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> AuthResult<()> {
        let mut state = self.state.lock().unwrap();
        let account = Self::account_for_token(&mut state, id_token)?;
        if let Some(name) = display_name {
            account.display_name = Some(name.to_string());
        }
        if let Some(url) = photo_url {
            account.photo_url = Some(url.to_string());
        }
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn validate_email(email: &str) -> AuthResult<()> {
    match email.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AuthError::InvalidCredential(format!("Invalid email address '{email}'"))),
    }
}

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
