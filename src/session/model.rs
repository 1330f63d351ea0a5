use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Storage key of the persisted session snapshot.
pub const SESSION_STORAGE_KEY: &str = "user";

/// Collection holding one profile record per user id.
pub const USERS_COLLECTION: &str = "users";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginMethod {
    Email,
    Google,
}

impl LoginMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            LoginMethod::Email => "email",
            LoginMethod::Google => "google",
        }
    }
}

impl fmt::Display for LoginMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoginMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(LoginMethod::Email),
            "google" => Ok(LoginMethod::Google),
            other => Err(format!("unknown login method '{other}'")),
        }
    }
}

/// The signed-in identity as the application sees it.
///
/// `is_logged_in` is true exactly when `id` is set. Serializes with the
/// camelCase keys used by the persisted snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub is_logged_in: bool,
    pub login_method: Option<LoginMethod>,
}

impl Session {
    /// The cleared state: every field null or false.
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub(crate) fn signed_in(id: String, email: Option<String>, name: String) -> Self {
        Self {
            id: Some(id),
            email,
            name: Some(name),
            is_logged_in: true,
            login_method: None,
        }
    }

    pub fn is_signed_out(&self) -> bool {
        self == &Self::signed_out()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_camel_case_keys() {
        let mut session = Session::signed_in("uid-1".into(), Some("a@b.c".into()), "Ada".into());
        session.login_method = Some(LoginMethod::Google);
        assert_eq!(
            serde_json::to_value(&session).unwrap(),
            json!({
                "id": "uid-1",
                "email": "a@b.c",
                "name": "Ada",
                "isLoggedIn": true,
                "loginMethod": "google"
            })
        );
    }

    #[test]
    fn cleared_state_serializes_nulls() {
        let session = Session::signed_out();
        assert!(session.is_signed_out());
        assert_eq!(
            serde_json::to_value(&session).unwrap(),
            json!({
                "id": null,
                "email": null,
                "name": null,
                "isLoggedIn": false,
                "loginMethod": null
            })
        );
    }

    #[test]
    fn parses_login_methods() {
        assert_eq!("google".parse::<LoginMethod>().unwrap(), LoginMethod::Google);
        assert!("github".parse::<LoginMethod>().is_err());
    }
}
