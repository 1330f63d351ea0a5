use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, RwLock, Weak};

use crate::app::FirebaseApp;
use crate::auth::backend::{AuthBackend, InMemoryAuthBackend, RestAuthBackend};
use crate::auth::error::{AuthError, AuthResult};
use crate::auth::model::{IdTokenResponse, User, UserCredential};
use crate::auth::oauth::{OAuthPopupHandler, OAuthProvider};
use crate::logger::Logger;

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@firebase-facade/auth"));

const DEFAULT_OAUTH_REQUEST_URI: &str = "http://localhost";

/// Receives the signed-in user, or `None` after sign-out.
pub type AuthStateListener = Arc<dyn Fn(Option<Arc<User>>) + Send + Sync + 'static>;

/// The auth service: signs users in and out and reports identity changes.
///
/// Cheap to clone; clones share the current user and the listener set.
#[derive(Clone)]
pub struct Auth {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    app: Option<FirebaseApp>,
    backend: Arc<dyn AuthBackend>,
    current_user: Mutex<Option<Arc<User>>>,
    listeners: Mutex<BTreeMap<u64, AuthStateListener>>,
    next_listener_id: AtomicU64,
    // Held while the current user changes and listeners run, so deliveries never overlap.
    notify_lock: Mutex<()>,
    popup_handler: RwLock<Option<Arc<dyn OAuthPopupHandler>>>,
    oauth_request_uri: String,
}

impl Auth {
    pub fn builder(backend: Arc<dyn AuthBackend>) -> AuthBuilder {
        AuthBuilder::new(backend)
    }

    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        Self::builder(backend).build()
    }

    /// Auth backed by [`InMemoryAuthBackend`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryAuthBackend::new()))
    }

    /// Auth talking to Identity Toolkit with the app's API key.
    pub fn for_app(app: FirebaseApp) -> AuthResult<Self> {
        let backend = RestAuthBackend::for_app(&app)?;
        Ok(Self::builder(Arc::new(backend)).with_app(app).build())
    }

    pub fn app(&self) -> Option<&FirebaseApp> {
        self.inner.app.as_ref()
    }

    pub fn current_user(&self) -> Option<Arc<User>> {
        self.inner.current_user.lock().unwrap().clone()
    }

    pub fn set_popup_handler(&self, handler: Arc<dyn OAuthPopupHandler>) {
        *self.inner.popup_handler.write().unwrap() = Some(handler);
    }

    pub fn popup_handler(&self) -> Option<Arc<dyn OAuthPopupHandler>> {
        self.inner.popup_handler.read().unwrap().clone()
    }

    pub async fn create_user_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> AuthResult<UserCredential> {
        let response = self.inner.backend.sign_up(email, password).await?;
        Ok(self.complete_sign_in(response, "signUp"))
    }

    pub async fn sign_in_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> AuthResult<UserCredential> {
        let response = self
            .inner
            .backend
            .sign_in_with_password(email, password)
            .await?;
        Ok(self.complete_sign_in(response, "signIn"))
    }

    /// Runs the registered popup handler for `provider` and signs in with the
    /// credential it returns.
    ///
    /// # Errors
    /// `auth/operation-not-supported` when no popup handler is registered.
    pub async fn sign_in_with_popup(&self, provider: &OAuthProvider) -> AuthResult<UserCredential> {
        let handler = self.popup_handler().ok_or_else(|| {
            AuthError::OperationNotSupported("OAuth popup handler not registered".into())
        })?;
        let request = provider.build_request(self.app().map(FirebaseApp::options))?;
        let credential = handler.open_popup(request).await?;
        let response = self
            .inner
            .backend
            .sign_in_with_idp(&credential, &self.inner.oauth_request_uri)
            .await?;
        let operation = if response.is_new_user { "signUp" } else { "signIn" };
        Ok(self.complete_sign_in(response, operation))
    }

    /// Clears the current user. Signing out while signed out is a no-op.
    pub fn sign_out(&self) {
        self.set_current_user(None);
    }

    pub async fn send_password_reset_email(&self, email: &str) -> AuthResult<()> {
        self.inner.backend.send_password_reset_email(email).await
    }

    /// Sends a verification email to the signed-in user.
    pub async fn send_email_verification(&self) -> AuthResult<()> {
        let user = self.require_current_user()?;
        self.inner
            .backend
            .send_email_verification(&require_id_token(&user)?)
            .await
    }

    /// Sets the display name and photo URL of the signed-in user.
    ///
    /// Listeners are not notified; the identity itself is unchanged.
    pub async fn update_profile(
        &self,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> AuthResult<Arc<User>> {
        let user = self.require_current_user()?;
        self.inner
            .backend
            .update_profile(&require_id_token(&user)?, display_name, photo_url)
            .await?;
        let updated = Arc::new(user.with_profile(display_name, photo_url));
        let mut current = self.inner.current_user.lock().unwrap();
        if current.as_ref().map(|c| c.uid()) == Some(updated.uid()) {
            *current = Some(Arc::clone(&updated));
        }
        Ok(updated)
    }

    /// Registers `listener` and immediately calls it with the current user.
    ///
    /// Afterwards the listener runs once per identity change (sign-in, or
    /// sign-out of a signed-in user). Deliveries are serialized across all
    /// listeners, so a listener must not sign in or out synchronously from
    /// inside the callback.
    pub fn on_auth_state_changed(&self, listener: AuthStateListener) -> AuthStateSubscription {
        let _delivering = self.inner.notify_lock.lock().unwrap();
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .listeners
            .lock()
            .unwrap()
            .insert(id, Arc::clone(&listener));
        listener(self.current_user());

        let weak: Weak<AuthInner> = Arc::downgrade(&self.inner);
        AuthStateSubscription {
            detach: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.listeners.lock().unwrap().remove(&id);
                }
            })),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().unwrap().len()
    }

    fn complete_sign_in(&self, response: IdTokenResponse, operation: &str) -> UserCredential {
        let user = Arc::new(User::from_response(&response));
        LOGGER.debug(format!("{operation} completed for {}", user.uid()));
        self.set_current_user(Some(Arc::clone(&user)));
        UserCredential {
            provider_id: Some(response.provider_id),
            operation_type: Some(operation.to_string()),
            is_new_user: response.is_new_user,
            user,
        }
    }

    fn set_current_user(&self, user: Option<Arc<User>>) {
        let _delivering = self.inner.notify_lock.lock().unwrap();
        let previous = {
            let mut current = self.inner.current_user.lock().unwrap();
            std::mem::replace(&mut *current, user.clone())
        };
        let changed = match (&previous, &user) {
            (None, None) => false,
            (Some(before), Some(after)) => before.uid() != after.uid() || before.id_token() != after.id_token(),
            _ => true,
        };
        if !changed {
            return;
        }
        let listeners: Vec<AuthStateListener> =
            self.inner.listeners.lock().unwrap().values().cloned().collect();
        for listener in listeners {
            listener(user.clone());
        }
    }

    fn require_current_user(&self) -> AuthResult<Arc<User>> {
        self.current_user().ok_or(AuthError::NoCurrentUser)
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("current_user", &self.current_user().map(|user| user.uid().to_string()))
            .field("listeners", &self.listener_count())
            .finish()
    }
}

fn require_id_token(user: &User) -> AuthResult<String> {
    user.id_token()
        .map(str::to_string)
        .ok_or_else(|| AuthError::InvalidCredential("Missing ID token".into()))
}

pub struct AuthBuilder {
    app: Option<FirebaseApp>,
    backend: Arc<dyn AuthBackend>,
    popup_handler: Option<Arc<dyn OAuthPopupHandler>>,
    oauth_request_uri: String,
}

impl AuthBuilder {
    fn new(backend: Arc<dyn AuthBackend>) -> Self {
        Self {
            app: None,
            backend,
            popup_handler: None,
            oauth_request_uri: DEFAULT_OAUTH_REQUEST_URI.to_string(),
        }
    }

    pub fn with_app(mut self, app: FirebaseApp) -> Self {
        self.app = Some(app);
        self
    }

    pub fn with_popup_handler(mut self, handler: Arc<dyn OAuthPopupHandler>) -> Self {
        self.popup_handler = Some(handler);
        self
    }

    /// The `requestUri` sent with federated sign-ins.
    pub fn with_oauth_request_uri(mut self, request_uri: impl Into<String>) -> Self {
        self.oauth_request_uri = request_uri.into();
        self
    }

    pub fn build(self) -> Auth {
        Auth {
            inner: Arc::new(AuthInner {
                app: self.app,
                backend: self.backend,
                current_user: Mutex::new(None),
                listeners: Mutex::new(BTreeMap::new()),
                next_listener_id: AtomicU64::new(0),
                notify_lock: Mutex::new(()),
                popup_handler: RwLock::new(self.popup_handler),
                oauth_request_uri: self.oauth_request_uri,
            }),
        }
    }
}

/// Handle returned by [`Auth::on_auth_state_changed`]; detaches on
/// [`unsubscribe`](Self::unsubscribe) or drop.
#[must_use = "dropping the subscription unsubscribes the listener"]
pub struct AuthStateSubscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl AuthStateSubscription {
    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    pub fn is_active(&self) -> bool {
        self.detach.is_some()
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for AuthStateSubscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl fmt::Debug for AuthStateSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthStateSubscription")
            .field("active", &self.is_active())
            .finish()
    }
}
