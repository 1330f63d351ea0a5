use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::form_urlencoded::Serializer;

use crate::app::FirebaseApp;
use crate::auth::error::{AuthError, AuthResult};
use crate::auth::model::{AuthCredential, EmailAuthProvider, IdTokenResponse};

use super::AuthBackend;

const DEFAULT_IDENTITY_TOOLKIT_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";

/// Identity Toolkit REST client.
#[derive(Clone, Debug)]
pub struct RestAuthBackend {
    client: Client,
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(rename = "returnSecureToken")]
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
struct SignInWithIdpRequest<'a> {
    #[serde(rename = "postBody")]
    post_body: String,
    #[serde(rename = "requestUri")]
    request_uri: &'a str,
    #[serde(rename = "returnIdpCredential")]
    return_idp_credential: bool,
    #[serde(rename = "returnSecureToken")]
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
struct SendOobCodeRequest<'a> {
    #[serde(rename = "requestType")]
    request_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(rename = "idToken", skip_serializing_if = "Option::is_none")]
    id_token: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct UpdateProfileRequest<'a> {
    #[serde(rename = "idToken")]
    id_token: &'a str,
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(rename = "photoUrl", skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    #[serde(rename = "returnSecureToken")]
    return_secure_token: bool,
}

/// Union of the fields returned by `signUp`, `signInWithPassword` and `signInWithIdp`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    id_token: String,
    refresh_token: Option<String>,
    expires_in: Option<String>,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    provider_id: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    is_new_user: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl RestAuthBackend {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: DEFAULT_IDENTITY_TOOLKIT_ENDPOINT.to_string(),
        }
    }

    /// Uses the app's API key and, when configured, its Auth emulator host.
    pub fn for_app(app: &FirebaseApp) -> AuthResult<Self> {
        let options = app.options();
        let backend = Self::new(options.require_api_key()?);
        Ok(match options.auth_emulator_host.as_deref() {
            Some(host) => backend.with_emulator_host(host),
            None => backend,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Targets an emulator at `host:port`.
    pub fn with_emulator_host(self, host: &str) -> Self {
        let host = host
            .trim_start_matches("http://")
            .trim_start_matches("https://")
            .trim_end_matches('/');
        self.with_endpoint(format!("http://{host}/identitytoolkit.googleapis.com/v1"))
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}?key={}", self.endpoint.trim_end_matches('/'), path, self.api_key)
    }

    async fn post<TRequest, TResponse>(&self, path: &str, request: &TRequest) -> AuthResult<TResponse>
    where
        TRequest: Serialize + ?Sized,
        TResponse: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(request)
            .send()
            .await
            .map_err(|err| AuthError::Network(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| AuthError::Network(err.to_string()))?;
        if !status.is_success() {
            return Err(map_error(status, &body));
        }
        let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
        serde_json::from_str(body)
            .map_err(|err| AuthError::Internal(format!("Malformed {path} response: {err}")))
    }

    async fn sign_in(&self, path: &str, request: &impl Serialize, provider_id: &str) -> AuthResult<IdTokenResponse> {
        let response: TokenResponse = self.post(path, request).await?;
        into_id_token_response(response, provider_id)
    }
}

#[async_trait]
impl AuthBackend for RestAuthBackend {
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<IdTokenResponse> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let mut response = self
            .sign_in("accounts:signUp", &request, EmailAuthProvider::PROVIDER_ID)
            .await?;
        response.is_new_user = true;
        Ok(response)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<IdTokenResponse> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        self.sign_in("accounts:signInWithPassword", &request, EmailAuthProvider::PROVIDER_ID)
            .await
    }

    async fn sign_in_with_idp(
        &self,
        credential: &AuthCredential,
        request_uri: &str,
    ) -> AuthResult<IdTokenResponse> {
        let request = SignInWithIdpRequest {
            post_body: build_post_body(credential)?,
            request_uri,
            return_idp_credential: true,
            return_secure_token: true,
        };
        self.sign_in("accounts:signInWithIdp", &request, &credential.provider_id)
            .await
    }

    async fn send_password_reset_email(&self, email: &str) -> AuthResult<()> {
        let request = SendOobCodeRequest {
            request_type: "PASSWORD_RESET",
            email: Some(email),
            id_token: None,
        };
        self.post::<_, Value>("accounts:sendOobCode", &request).await.map(|_| ())
    }

    async fn send_email_verification(&self, id_token: &str) -> AuthResult<()> {
        let request = SendOobCodeRequest {
            request_type: "VERIFY_EMAIL",
            email: None,
            id_token: Some(id_token),
        };
        self.post::<_, Value>("accounts:sendOobCode", &request).await.map(|_| ())
    }

    async fn update_profile(
        &self,
        id_token: &str,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> AuthResult<()> {
        let request = UpdateProfileRequest {
            id_token,
            display_name,
            photo_url,
            return_secure_token: false,
        };
        self.post::<_, Value>("accounts:update", &request).await.map(|_| ())
    }
}

/// Builds the form-encoded `postBody` expected by `signInWithIdp`.
fn build_post_body(credential: &AuthCredential) -> AuthResult<String> {
    let response = &credential.token_response;
    let field = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| response.get(*key).and_then(Value::as_str))
    };
    let mut serializer = Serializer::new(String::new());
    let mut has_credential = false;
    if let Some(id_token) = field(&["idToken", "oauthIdToken"]) {
        serializer.append_pair("id_token", id_token);
        has_credential = true;
    }
    if let Some(access_token) = field(&["accessToken", "oauthAccessToken"]) {
        serializer.append_pair("access_token", access_token);
        has_credential = true;
    }
    if !has_credential {
        return Err(AuthError::InvalidCredential(
            "OAuth token response missing id_token/access_token".into(),
        ));
    }
    serializer.append_pair("providerId", &credential.provider_id);
    Ok(serializer.finish())
}

fn into_id_token_response(response: TokenResponse, provider_id: &str) -> AuthResult<IdTokenResponse> {
    let expires_in = response
        .expires_in
        .as_deref()
        .map(|value| {
            value
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|err| AuthError::Internal(format!("Invalid expiresIn value: {err}")))
        })
        .transpose()?;
    Ok(IdTokenResponse {
        local_id: response.local_id,
        email: response.email,
        display_name: response.display_name.filter(|name| !name.is_empty()),
        photo_url: response.photo_url,
        provider_id: response.provider_id.unwrap_or_else(|| provider_id.to_string()),
        email_verified: response.email_verified,
        id_token: response.id_token,
        refresh_token: response.refresh_token,
        expires_in,
        is_new_user: response.is_new_user,
    })
}

fn map_error(status: StatusCode, body: &str) -> AuthError {
    if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) {
        if let Some(message) = parsed.error.and_then(|error| error.message) {
            return AuthError::from_server_message(&message);
        }
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return AuthError::TooManyRequests(body.to_string());
    }
    AuthError::Internal(format!("Request failed with status {status}: {body}"))
}
