use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::auth::{Auth, AuthError, GoogleAuthProvider, User, UserCredential};
use crate::documents::{DocumentError, Documents};
use crate::firestore::{DocumentData, FirestoreValue, Timestamp};
use crate::logger::Logger;

use super::model::{LoginMethod, USERS_COLLECTION};

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@firebase-facade/accounts"));

pub type AccountResult<T> = Result<T, AccountError>;

/// Failure of an account flow: either the auth step or the profile write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountError {
    Auth(AuthError),
    Store(DocumentError),
}

impl AccountError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AccountError::Auth(err) => err.code_str(),
            AccountError::Store(err) => err.code_str(),
        }
    }
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountError::Auth(err) => write!(f, "{err}"),
            AccountError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AccountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AccountError::Auth(err) => Some(err),
            AccountError::Store(err) => Some(err),
        }
    }
}

impl From<AuthError> for AccountError {
    fn from(err: AuthError) -> Self {
        AccountError::Auth(err)
    }
}

impl From<DocumentError> for AccountError {
    fn from(err: DocumentError) -> Self {
        AccountError::Store(err)
    }
}

/// Register, sign-in and sign-out flows that keep the `users` profile
/// collection alongside the auth account.
#[derive(Clone)]
pub struct Accounts {
    auth: Auth,
    documents: Documents,
}

impl Accounts {
    pub fn new(auth: Auth, documents: Documents) -> Self {
        Self { auth, documents }
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Creates the account and signs it in.
    ///
    /// A string `name` in `profile` becomes the display name. A non-empty
    /// `profile` is also stored as `users/{uid}`, on top of the `uid`,
    /// `email`, `createdAt`, `isActive` and `loginMethod` fields.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        profile: DocumentData,
    ) -> AccountResult<UserCredential> {
        let mut credential = self
            .auth
            .create_user_with_email_and_password(email, password)
            .await?;

        if let Some(name) = profile.get("name").and_then(FirestoreValue::as_str) {
            credential.user = self.auth.update_profile(Some(name), None).await?;
        }

        if !profile.is_empty() {
            let user = &credential.user;
            let mut record = base_record(user);
            record.insert(
                "loginMethod".into(),
                FirestoreValue::from(LoginMethod::Email.as_str()),
            );
            record.extend(profile);
            self.documents
                .create_with_id(USERS_COLLECTION, user.uid(), record)
                .await?;
            LOGGER.debug(format!("stored profile for {}", user.uid()));
        }
        Ok(credential)
    }

    pub async fn login(&self, email: &str, password: &str) -> AccountResult<UserCredential> {
        Ok(self.auth.sign_in_with_email_and_password(email, password).await?)
    }

    /// Signs in through the Google popup flow and merges the provider
    /// profile into `users/{uid}`.
    pub async fn login_with_google(&self) -> AccountResult<UserCredential> {
        let credential = self
            .auth
            .sign_in_with_popup(&GoogleAuthProvider::provider())
            .await?;
        let user = &credential.user;
        let mut record = base_record(user);
        record.insert("name".into(), optional_string(user.display_name()));
        record.insert("photoURL".into(), optional_string(user.photo_url()));
        record.insert(
            "loginMethod".into(),
            FirestoreValue::from(LoginMethod::Google.as_str()),
        );
        self.documents
            .upsert(USERS_COLLECTION, user.uid(), record)
            .await?;
        Ok(credential)
    }

    pub fn logout(&self) {
        self.auth.sign_out();
    }

    pub async fn reset_password(&self, email: &str) -> AccountResult<()> {
        Ok(self.auth.send_password_reset_email(email).await?)
    }

    pub async fn send_email_verification(&self) -> AccountResult<()> {
        Ok(self.auth.send_email_verification().await?)
    }

    pub fn current_user(&self) -> Option<Arc<User>> {
        self.auth.current_user()
    }
}

impl fmt::Debug for Accounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accounts")
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

fn base_record(user: &User) -> DocumentData {
    let mut record = DocumentData::new();
    record.insert("uid".into(), FirestoreValue::from(user.uid()));
    record.insert("email".into(), optional_string(user.email()));
    record.insert("createdAt".into(), FirestoreValue::from(Timestamp::now()));
    record.insert("isActive".into(), FirestoreValue::from(true));
    record
}

fn optional_string(value: Option<&str>) -> FirestoreValue {
    value.map_or_else(FirestoreValue::null, FirestoreValue::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthCredential, AuthResult, InMemoryAuthBackend, OAuthPopupHandler, OAuthRequest, OutOfBandKind};
    use async_trait::async_trait;
    use serde_json::json;

    struct GooglePopup;

    #[async_trait]
    impl OAuthPopupHandler for GooglePopup {
        async fn open_popup(&self, request: OAuthRequest) -> AuthResult<AuthCredential> {
            Ok(AuthCredential {
                provider_id: request.provider_id,
                sign_in_method: "google.com".into(),
                token_response: json!({
                    "idToken": "google-token",
                    "email": "grace@example.com",
                    "displayName": "Grace Hopper",
                    "photoUrl": "https://example.com/grace.png"
                }),
            })
        }
    }

    fn accounts() -> (Accounts, Arc<InMemoryAuthBackend>) {
        let backend = Arc::new(InMemoryAuthBackend::new());
        let auth = Auth::builder(backend.clone())
            .with_popup_handler(Arc::new(GooglePopup))
            .build();
        (Accounts::new(auth, Documents::in_memory()), backend)
    }

    #[tokio::test]
    async fn register_with_profile_writes_user_record() {
        let (accounts, _) = accounts();
        let mut profile = DocumentData::new();
        profile.insert("name".into(), FirestoreValue::from("Ada"));
        profile.insert("team".into(), FirestoreValue::from("engines"));

        let credential = accounts
            .register("ada@example.com", "secret1", profile)
            .await
            .unwrap();
        assert_eq!(credential.user.display_name(), Some("Ada"));

        let record = accounts
            .documents
            .get(USERS_COLLECTION, credential.user.uid())
            .await
            .unwrap();
        assert!(record.exists());
        assert_eq!(record.get("uid").and_then(FirestoreValue::as_str), Some(credential.user.uid()));
        assert_eq!(record.get("email").and_then(FirestoreValue::as_str), Some("ada@example.com"));
        assert_eq!(record.get("isActive").and_then(FirestoreValue::as_bool), Some(true));
        assert_eq!(record.get("loginMethod").and_then(FirestoreValue::as_str), Some("email"));
        assert_eq!(record.get("team").and_then(FirestoreValue::as_str), Some("engines"));
        assert!(record.get("createdAt").is_some());
    }

    #[tokio::test]
    async fn register_without_profile_skips_record() {
        let (accounts, _) = accounts();
        let credential = accounts
            .register("bob@example.com", "secret1", DocumentData::new())
            .await
            .unwrap();
        assert!(!accounts
            .documents
            .exists(USERS_COLLECTION, credential.user.uid())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn register_surfaces_auth_errors() {
        let (accounts, _) = accounts();
        let err = accounts
            .register("short@example.com", "123", DocumentData::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AccountError::Auth(AuthError::WeakPassword(_))));
        assert_eq!(err.code_str(), "auth/weak-password");
    }

    #[tokio::test]
    async fn google_login_merges_provider_profile() {
        let (accounts, _) = accounts();
        let credential = accounts.login_with_google().await.unwrap();
        let uid = credential.user.uid().to_string();

        let mut extra = DocumentData::new();
        extra.insert("team".into(), FirestoreValue::from("compilers"));
        accounts.documents.update(USERS_COLLECTION, &uid, extra).await.unwrap();
        accounts.logout();
        accounts.login_with_google().await.unwrap();

        let record = accounts.documents.get(USERS_COLLECTION, &uid).await.unwrap();
        assert_eq!(record.get("loginMethod").and_then(FirestoreValue::as_str), Some("google"));
        assert_eq!(record.get("name").and_then(FirestoreValue::as_str), Some("Grace Hopper"));
        assert_eq!(
            record.get("photoURL").and_then(FirestoreValue::as_str),
            Some("https://example.com/grace.png")
        );
        assert_eq!(record.get("team").and_then(FirestoreValue::as_str), Some("compilers"));
    }

    #[tokio::test]
    async fn login_logout_and_mail_flows() {
        let (accounts, backend) = accounts();
        accounts
            .register("ada@example.com", "secret1", DocumentData::new())
            .await
            .unwrap();
        accounts.logout();
        assert!(accounts.current_user().is_none());

        assert_eq!(
            accounts.send_email_verification().await.unwrap_err().code_str(),
            "auth/no-current-user"
        );
        accounts.login("ada@example.com", "secret1").await.unwrap();
        accounts.send_email_verification().await.unwrap();
        accounts.reset_password("ada@example.com").await.unwrap();

        let kinds: Vec<_> = backend.sent_emails().into_iter().map(|mail| mail.kind).collect();
        assert_eq!(kinds, [OutOfBandKind::VerifyEmail, OutOfBandKind::PasswordReset]);

        let err = accounts.login("ada@example.com", "wrong-pw").await.unwrap_err();
        assert_eq!(err.code_str(), "auth/invalid-credential");
    }
}
