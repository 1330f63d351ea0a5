use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::Auth;
use crate::firestore::error::FirestoreResult;
use crate::firestore::remote::datastore::{TokenProvider, TokenProviderArc};

/// Supplies the signed-in user's ID token to the Firestore REST datastore.
#[derive(Clone, Debug)]
pub struct AuthTokenProvider {
    auth: Auth,
}

impl AuthTokenProvider {
    pub fn new(auth: Auth) -> Self {
        Self { auth }
    }

    pub fn into_arc(self) -> TokenProviderArc {
        Arc::new(self)
    }
}

#[async_trait]
impl TokenProvider for AuthTokenProvider {
    async fn get_token(&self) -> FirestoreResult<Option<String>> {
        Ok(self
            .auth
            .current_user()
            .and_then(|user| user.id_token().map(str::to_string)))
    }

    fn invalidate_token(&self) {
        if let Some(user) = self.auth.current_user() {
            log::debug!("ID token of {} was rejected; requests stay unauthenticated until the next sign-in", user.uid());
        }
    }
}

/// Wraps `auth` into a token provider for [`FirestoreClient::with_http_datastore_authenticated`](crate::firestore::FirestoreClient::with_http_datastore_authenticated).
pub fn auth_token_provider_arc(auth: Auth) -> TokenProviderArc {
    AuthTokenProvider::new(auth).into_arc()
}
