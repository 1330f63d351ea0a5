use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value as JsonValue;

use crate::firestore::error::{internal_error, unavailable, FirestoreResult};
use crate::firestore::model::DatabaseId;

use super::rpc_error::map_http_error;

const FIRESTORE_API_HOST: &str = "https://firestore.googleapis.com";
const FIRESTORE_API_VERSION: &str = "v1";

/// HTTP transport bound to one database's REST root.
#[derive(Clone, Debug)]
pub struct Connection {
    client: Client,
    base_url: String,
}

#[derive(Clone, Debug)]
pub struct ConnectionBuilder {
    database_id: DatabaseId,
    client: Option<Client>,
    emulator_host: Option<String>,
}

impl ConnectionBuilder {
    pub fn new(database_id: DatabaseId) -> Self {
        Self {
            database_id,
            client: None,
            emulator_host: None,
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Routes requests to `http://{host}` instead of the production endpoint.
    pub fn with_emulator_host(mut self, host: impl Into<String>) -> Self {
        self.emulator_host = Some(host.into());
        self
    }

    pub fn build(self) -> FirestoreResult<Connection> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .build()
                .map_err(|err| internal_error(err.to_string()))?,
        };
        let base_url = build_base_url(&self.database_id, self.emulator_host.as_deref());
        Ok(Connection { client, base_url })
    }
}

impl Connection {
    pub fn builder(database_id: DatabaseId) -> ConnectionBuilder {
        ConnectionBuilder::new(database_id)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn invoke_json(
        &self,
        method: Method,
        path: &str,
        body: Option<JsonValue>,
        auth_token: Option<&str>,
    ) -> FirestoreResult<JsonValue> {
        match self.invoke(method, path, body, auth_token, false).await? {
            Some(value) => Ok(value),
            None => Err(internal_error("Unexpected empty response")),
        }
    }

    /// Like [`invoke_json`](Self::invoke_json) but maps HTTP 404 to `Ok(None)`.
    pub async fn invoke_json_optional(
        &self,
        method: Method,
        path: &str,
        body: Option<JsonValue>,
        auth_token: Option<&str>,
    ) -> FirestoreResult<Option<JsonValue>> {
        self.invoke(method, path, body, auth_token, true).await
    }

    async fn invoke(
        &self,
        method: Method,
        path: &str,
        body: Option<JsonValue>,
        auth_token: Option<&str>,
        not_found_is_none: bool,
    ) -> FirestoreResult<Option<JsonValue>> {
        let mut request = self.build_request(method, path, auth_token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .map_err(|err| unavailable(err.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| unavailable(err.to_string()))?;
        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Some(JsonValue::Null));
            }
            return serde_json::from_str(&text)
                .map(Some)
                .map_err(|err| internal_error(format!("Malformed response body: {err}")));
        }
        if not_found_is_none && status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Err(map_http_error(status, &text))
    }

    fn build_request(&self, method: Method, path: &str, auth_token: Option<&str>) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut builder = self.client.request(method, url);
        if let Some(token) = auth_token {
            builder = builder.bearer_auth(token);
        }
        builder.header("Content-Type", "application/json")
    }
}

fn build_base_url(database_id: &DatabaseId, emulator_host: Option<&str>) -> String {
    let host = match emulator_host {
        Some(host) if host.starts_with("http://") || host.starts_with("https://") => {
            host.trim_end_matches('/').to_string()
        }
        Some(host) => format!("http://{host}"),
        None => FIRESTORE_API_HOST.to_string(),
    };
    format!(
        "{host}/{FIRESTORE_API_VERSION}/{}",
        database_id.resource_name()
    )
}
