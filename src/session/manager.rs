use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, RwLock, Weak};

use crate::auth::{Auth, AuthStateSubscription, User};
use crate::documents::Documents;
use crate::firestore::DocumentSnapshot;
use crate::logger::Logger;
use crate::storage::{LocalStorage, StorageError, StorageResult};
use crate::util::spawn_detached;

use super::model::{LoginMethod, Session, SESSION_STORAGE_KEY, USERS_COLLECTION};

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@firebase-facade/session"));

/// Observes every change of the live session.
pub type SessionListener = Arc<dyn Fn(&Session) + Send + Sync + 'static>;

/// Owns the process's [`Session`] and keeps it in step with auth state.
///
/// On sign-in the identity fields are set at once; the `users/{uid}` profile
/// is then fetched in the background to refine `name` and `login_method`,
/// and the result is persisted under the `user` storage key. On sign-out the
/// session is cleared and the key removed.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    documents: Documents,
    storage: Arc<dyn LocalStorage>,
    session: RwLock<Session>,
    // Bumped on every identity transition; a profile refinement started under
    // an older generation is dropped.
    generation: AtomicU64,
    // Held from state change until listeners return, so notifications keep order.
    delivery: Mutex<()>,
    listeners: Mutex<BTreeMap<u64, SessionListener>>,
    next_listener_id: AtomicU64,
}

impl SessionManager {
    pub fn new(documents: Documents, storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            inner: Arc::new(Inner {
                documents,
                storage,
                session: RwLock::new(Session::signed_out()),
                generation: AtomicU64::new(0),
                delivery: Mutex::new(()),
                listeners: Mutex::new(BTreeMap::new()),
                next_listener_id: AtomicU64::new(0),
            }),
        }
    }

    /// Registers the change handler with `auth`. The session follows auth
    /// state for as long as the returned subscription is alive.
    pub fn start(&self, auth: &Auth) -> AuthStateSubscription {
        LOGGER.debug("listening for auth state changes");
        let manager = self.clone();
        auth.on_auth_state_changed(Arc::new(move |user: Option<Arc<User>>| {
            manager.handle_auth_state(user.as_deref());
        }))
    }

    /// A snapshot of the live session.
    pub fn session(&self) -> Session {
        self.inner.session.read().unwrap().clone()
    }

    /// Reads the persisted snapshot without touching the live session.
    ///
    /// Meant for showing the last known identity at startup before auth
    /// state is confirmed.
    pub fn cached_session(&self) -> StorageResult<Option<Session>> {
        match self.inner.storage.get_item(SESSION_STORAGE_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|err| StorageError::Corrupt(format!("'{SESSION_STORAGE_KEY}': {err}"))),
            None => Ok(None),
        }
    }

    /// Calls `listener` after every change of the live session.
    pub fn subscribe(&self, listener: SessionListener) -> SessionSubscription {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.inner.listeners.lock().unwrap().insert(id, listener);
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        SessionSubscription {
            detach: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.listeners.lock().unwrap().remove(&id);
                }
            })),
        }
    }

    /// Applies one auth state notification: `Some` signs in, `None` signs out.
    pub fn handle_auth_state(&self, user: Option<&User>) {
        match user {
            Some(user) => self.enter_authenticated(user),
            None => self.enter_anonymous(),
        }
    }

    fn enter_authenticated(&self, user: &User) {
        let uid = user.uid().to_string();
        let provisional = Session::signed_in(
            uid.clone(),
            user.email().map(str::to_string),
            user.display_name().unwrap_or_default().to_string(),
        );
        let generation = {
            let _delivering = self.inner.delivery.lock().unwrap();
            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *self.inner.session.write().unwrap() = provisional.clone();
            self.notify(&provisional);
            generation
        };
        LOGGER.info(format!("signed in as {uid}"));

        let manager = self.clone();
        spawn_detached(async move {
            let profile = manager.fetch_profile(&uid).await;
            manager.refine(generation, profile);
        });
    }

    fn enter_anonymous(&self) {
        let _delivering = self.inner.delivery.lock().unwrap();
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let cleared = Session::signed_out();
        *self.inner.session.write().unwrap() = cleared.clone();
        if let Err(err) = self.inner.storage.remove_item(SESSION_STORAGE_KEY) {
            LOGGER.warn(format!("failed to clear persisted session: {err}"));
        }
        LOGGER.info("signed out");
        self.notify(&cleared);
    }

    async fn fetch_profile(&self, uid: &str) -> Option<DocumentSnapshot> {
        match self.inner.documents.get(USERS_COLLECTION, uid).await {
            Ok(snapshot) if snapshot.exists() => Some(snapshot),
            Ok(_) => {
                LOGGER.debug(format!("no profile record for {uid}"));
                None
            }
            Err(err) => {
                LOGGER.warn(format!("profile fetch for {uid} failed, using defaults: {err}"));
                None
            }
        }
    }

    fn refine(&self, generation: u64, profile: Option<DocumentSnapshot>) {
        let _delivering = self.inner.delivery.lock().unwrap();
        if self.inner.generation.load(Ordering::SeqCst) != generation {
            LOGGER.debug("discarding profile refinement for a superseded session");
            return;
        }
        let refined = {
            let mut session = self.inner.session.write().unwrap();
            let name = profile
                .as_ref()
                .and_then(|profile| profile.get("name"))
                .and_then(|value| value.as_str())
                .filter(|name| !name.is_empty());
            if let Some(name) = name {
                session.name = Some(name.to_string());
            }
            let login_method = profile
                .as_ref()
                .and_then(|profile| profile.get("loginMethod"))
                .and_then(|value| value.as_str())
                .and_then(|method| method.parse::<LoginMethod>().ok());
            session.login_method = Some(login_method.unwrap_or(LoginMethod::Email));
            session.clone()
        };
        self.persist(&refined);
        self.notify(&refined);
    }

    fn persist(&self, session: &Session) {
        let result = serde_json::to_string(session)
            .map_err(|err| StorageError::Corrupt(err.to_string()))
            .and_then(|raw| self.inner.storage.set_item(SESSION_STORAGE_KEY, &raw));
        if let Err(err) = result {
            LOGGER.warn(format!("failed to persist session: {err}"));
        }
    }

    fn notify(&self, session: &Session) {
        let listeners: Vec<SessionListener> =
            self.inner.listeners.lock().unwrap().values().cloned().collect();
        for listener in listeners {
            listener(session);
        }
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("session", &self.session())
            .finish()
    }
}

/// Handle returned by [`SessionManager::subscribe`]; detaches on
/// [`unsubscribe`](Self::unsubscribe) or drop.
#[must_use = "dropping the subscription unsubscribes the listener"]
pub struct SessionSubscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl SessionSubscription {
    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserInfo;
    use crate::firestore::{DocumentData, FirestoreValue};
    use crate::storage::InMemoryStorage;
    use std::time::Duration;

    fn user(uid: &str, display_name: Option<&str>) -> User {
        User::new(UserInfo {
            uid: uid.to_string(),
            display_name: display_name.map(str::to_string),
            email: Some(format!("{uid}@example.com")),
            photo_url: None,
            provider_id: "password".to_string(),
        })
    }

    fn manager() -> (SessionManager, Documents, InMemoryStorage) {
        let documents = Documents::in_memory();
        let storage = InMemoryStorage::new();
        let manager = SessionManager::new(documents.clone(), Arc::new(storage.clone()));
        (manager, documents, storage)
    }

    async fn next_refined(receiver: &async_channel::Receiver<Session>) -> Session {
        loop {
            let session = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
                .await
                .expect("session change")
                .unwrap();
            if session.login_method.is_some() || !session.is_logged_in {
                return session;
            }
        }
    }

    fn channel_listener(manager: &SessionManager) -> (async_channel::Receiver<Session>, SessionSubscription) {
        let (sender, receiver) = async_channel::unbounded();
        let subscription = manager.subscribe(Arc::new(move |session: &Session| {
            let _ = sender.try_send(session.clone());
        }));
        (receiver, subscription)
    }

    #[tokio::test]
    async fn profile_refines_name_and_login_method() {
        let (manager, documents, storage) = manager();
        let mut profile = DocumentData::new();
        profile.insert("name".into(), FirestoreValue::from("Grace"));
        profile.insert("loginMethod".into(), FirestoreValue::from("google"));
        documents.create_with_id("users", "u1", profile).await.unwrap();
        let (receiver, _subscription) = channel_listener(&manager);

        manager.handle_auth_state(Some(&user("u1", Some("G. Hopper"))));
        let provisional = manager.session();
        assert_eq!(provisional.id.as_deref(), Some("u1"));
        assert!(provisional.is_logged_in);
        assert_eq!(provisional.name.as_deref(), Some("G. Hopper"));

        let refined = next_refined(&receiver).await;
        assert_eq!(refined.name.as_deref(), Some("Grace"));
        assert_eq!(refined.login_method, Some(LoginMethod::Google));
        assert_eq!(manager.cached_session().unwrap(), Some(refined));
        assert!(storage.get_item("user").unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_profile_defaults_to_email() {
        let (manager, _, _) = manager();
        let (receiver, _subscription) = channel_listener(&manager);
        manager.handle_auth_state(Some(&user("u2", None)));
        let refined = next_refined(&receiver).await;
        assert_eq!(refined.name.as_deref(), Some(""));
        assert_eq!(refined.login_method, Some(LoginMethod::Email));
    }

    #[tokio::test]
    async fn sign_out_clears_session_and_storage() {
        let (manager, _, storage) = manager();
        let (receiver, _subscription) = channel_listener(&manager);
        manager.handle_auth_state(Some(&user("u3", None)));
        next_refined(&receiver).await;
        assert!(storage.get_item("user").unwrap().is_some());

        manager.handle_auth_state(None);
        assert!(manager.session().is_signed_out());
        assert_eq!(storage.get_item("user").unwrap(), None);
        assert_eq!(manager.cached_session().unwrap(), None);
    }

    #[tokio::test]
    async fn stale_refinement_is_discarded() {
        let (manager, _, storage) = manager();
        manager.handle_auth_state(Some(&user("u4", None)));
        manager.handle_auth_state(None);

        // Give the detached profile fetch time to finish.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(manager.session().is_signed_out());
        assert_eq!(storage.get_item("user").unwrap(), None);
    }

    #[test]
    fn corrupt_snapshot_is_reported() {
        let (manager, _, storage) = manager();
        storage.set_item("user", "not json").unwrap();
        let err = manager.cached_session().unwrap_err();
        assert_eq!(err.code_str(), "storage/corrupt");
    }
}
