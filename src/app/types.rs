use std::env;
use std::sync::Arc;

use serde::Deserialize;

use crate::app::errors::{AppError, AppResult};

pub const DEFAULT_ENTRY_NAME: &str = "[DEFAULT]";
pub const DEFAULT_DATABASE_ID: &str = "(default)";

/// Project-level configuration shared by the Firestore and Auth backends.
///
/// Field names deserialize from the camelCase keys used by Firebase web
/// config snippets, so a `firebaseConfig` object can be loaded verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FirebaseOptions {
    pub api_key: Option<String>,
    pub auth_domain: Option<String>,
    pub project_id: Option<String>,
    /// Firestore database name; `(default)` when unset.
    pub database_id: Option<String>,
    /// `host:port` of a Firestore emulator.
    pub firestore_emulator_host: Option<String>,
    /// `host:port` of an Auth emulator.
    pub auth_emulator_host: Option<String>,
}

impl FirebaseOptions {
    /// Reads options from the process environment.
    ///
    /// Recognised variables: `FIREBASE_API_KEY`, `FIREBASE_AUTH_DOMAIN`,
    /// `FIREBASE_PROJECT_ID`, `FIRESTORE_DATABASE_ID`,
    /// `FIRESTORE_EMULATOR_HOST` and `FIREBASE_AUTH_EMULATOR_HOST`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            api_key: read("FIREBASE_API_KEY"),
            auth_domain: read("FIREBASE_AUTH_DOMAIN"),
            project_id: read("FIREBASE_PROJECT_ID"),
            database_id: read("FIRESTORE_DATABASE_ID"),
            firestore_emulator_host: read("FIRESTORE_EMULATOR_HOST"),
            auth_emulator_host: read("FIREBASE_AUTH_EMULATOR_HOST"),
        }
    }

    pub fn from_json_str(json: &str) -> AppResult<Self> {
        serde_json::from_str(json).map_err(|err| AppError::InvalidConfig {
            message: err.to_string(),
        })
    }

    pub fn database_id_or_default(&self) -> &str {
        self.database_id.as_deref().unwrap_or(DEFAULT_DATABASE_ID)
    }

    pub fn require_project_id(&self) -> AppResult<&str> {
        self.project_id
            .as_deref()
            .ok_or(AppError::MissingOption { option: "project_id" })
    }

    pub fn require_api_key(&self) -> AppResult<&str> {
        self.api_key
            .as_deref()
            .ok_or(AppError::MissingOption { option: "api_key" })
    }

    pub(crate) fn is_defined(&self) -> bool {
        self.api_key.is_some() || self.project_id.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FirebaseAppSettings {
    pub name: Option<String>,
}

#[derive(Clone, Debug)]
pub struct FirebaseApp {
    inner: Arc<FirebaseAppInner>,
}

#[derive(Debug)]
struct FirebaseAppInner {
    name: String,
    options: FirebaseOptions,
}

impl FirebaseApp {
    pub fn new(name: impl Into<String>, options: FirebaseOptions) -> Self {
        Self {
            inner: Arc::new(FirebaseAppInner {
                name: name.into(),
                options,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn options(&self) -> &FirebaseOptions {
        &self.inner.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn reads_options_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("FIREBASE_API_KEY", "key"),
            ("FIREBASE_PROJECT_ID", "demo"),
            ("FIRESTORE_EMULATOR_HOST", "127.0.0.1:8080"),
            ("FIREBASE_AUTH_DOMAIN", "  "),
        ]
        .into_iter()
        .collect();

        let options = FirebaseOptions::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(options.api_key.as_deref(), Some("key"));
        assert_eq!(options.project_id.as_deref(), Some("demo"));
        assert_eq!(options.firestore_emulator_host.as_deref(), Some("127.0.0.1:8080"));
        assert_eq!(options.auth_domain, None);
        assert_eq!(options.database_id_or_default(), "(default)");
    }

    #[test]
    fn parses_web_config_snippet() {
        let options = FirebaseOptions::from_json_str(
            r#"{"apiKey":"abc","authDomain":"demo.firebaseapp.com","projectId":"demo","appId":"1:2:web:3"}"#,
        )
        .unwrap();
        assert_eq!(options.api_key.as_deref(), Some("abc"));
        assert_eq!(options.require_project_id().unwrap(), "demo");
        assert_eq!(
            options.auth_emulator_host, None,
            "unknown keys are ignored and missing keys default"
        );
    }

    #[test]
    fn reports_missing_required_options() {
        let options = FirebaseOptions::default();
        let err = options.require_api_key().unwrap_err();
        assert_eq!(err.code_str(), "app/missing-option");
    }
}
