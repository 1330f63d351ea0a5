use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use firebase_facade::auth::{
    Auth, AuthCredential, AuthResult, InMemoryAuthBackend, OAuthPopupHandler, OAuthRequest,
};
use firebase_facade::documents::Documents;
use firebase_facade::firestore::{data_from_json, DocumentData, FirestoreValue};
use firebase_facade::session::{Accounts, LoginMethod, Session, SessionManager};
use firebase_facade::storage::{FileStorage, InMemoryStorage, LocalStorage};
use serde_json::json;

struct GooglePopup;

#[async_trait]
impl OAuthPopupHandler for GooglePopup {
    async fn open_popup(&self, request: OAuthRequest) -> AuthResult<AuthCredential> {
        Ok(AuthCredential {
            provider_id: request.provider_id,
            sign_in_method: "google.com".into(),
            token_response: json!({
                "idToken": "google-id-token",
                "email": "grace@example.com",
                "displayName": "Grace Hopper"
            }),
        })
    }
}

struct Harness {
    accounts: Accounts,
    documents: Documents,
    manager: SessionManager,
}

fn harness(storage: Arc<dyn LocalStorage>) -> Harness {
    let auth = Auth::builder(Arc::new(InMemoryAuthBackend::new()))
        .with_popup_handler(Arc::new(GooglePopup))
        .build();
    let documents = Documents::in_memory();
    let manager = SessionManager::new(documents.clone(), storage);
    Harness {
        accounts: Accounts::new(auth, documents.clone()),
        documents,
        manager,
    }
}

async fn wait_for<F>(manager: &SessionManager, done: F) -> Session
where
    F: Fn(&Session) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let session = manager.session();
            if done(&session) {
                return session;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("session transition")
}

#[tokio::test]
async fn starts_signed_out() {
    let h = harness(Arc::new(InMemoryStorage::new()));
    let _subscription = h.manager.start(h.accounts.auth());
    assert!(h.manager.session().is_signed_out());
    assert_eq!(h.manager.cached_session().unwrap(), None);
}

#[tokio::test]
async fn google_sign_in_refines_login_method() {
    let storage = InMemoryStorage::new();
    let h = harness(Arc::new(storage.clone()));
    let _subscription = h.manager.start(h.accounts.auth());

    let credential = h.accounts.login_with_google().await.unwrap();
    let uid = credential.user.uid().to_string();
    let record = h.documents.get("users", &uid).await.unwrap();
    assert_eq!(record.get("loginMethod").and_then(FirestoreValue::as_str), Some("google"));

    // The profile record now exists, so a fresh sign-in refines from it.
    h.accounts.logout();
    wait_for(&h.manager, Session::is_signed_out).await;
    h.accounts.login_with_google().await.unwrap();

    let session = wait_for(&h.manager, |s| s.login_method.is_some()).await;
    assert_eq!(session.id.as_deref(), Some(uid.as_str()));
    assert_eq!(session.email.as_deref(), Some("grace@example.com"));
    assert_eq!(session.name.as_deref(), Some("Grace Hopper"));
    assert!(session.is_logged_in);
    assert_eq!(session.login_method, Some(LoginMethod::Google));

    let persisted: serde_json::Value =
        serde_json::from_str(&storage.get_item("user").unwrap().unwrap()).unwrap();
    assert_eq!(persisted["loginMethod"], "google");
    assert_eq!(persisted["isLoggedIn"], true);
}

#[tokio::test]
async fn registered_profile_name_wins_over_display_name() {
    let h = harness(Arc::new(InMemoryStorage::new()));
    let _subscription = h.manager.start(h.accounts.auth());

    let profile: DocumentData = data_from_json(json!({"name": "Ada L."})).unwrap();
    let credential = h
        .accounts
        .register("ada@example.com", "secret1", profile)
        .await
        .unwrap();
    let uid = credential.user.uid().to_string();
    h.documents
        .update("users", &uid, data_from_json(json!({"name": "Countess Ada"})).unwrap())
        .await
        .unwrap();

    h.accounts.logout();
    wait_for(&h.manager, Session::is_signed_out).await;
    h.accounts.login("ada@example.com", "secret1").await.unwrap();

    let session = wait_for(&h.manager, |s| s.login_method.is_some()).await;
    assert_eq!(session.name.as_deref(), Some("Countess Ada"));
    assert_eq!(session.login_method, Some(LoginMethod::Email));
}

#[tokio::test]
async fn registration_without_profile_writes_no_record() {
    let h = harness(Arc::new(InMemoryStorage::new()));
    let _subscription = h.manager.start(h.accounts.auth());

    let credential = h
        .accounts
        .register("bob@example.com", "secret1", DocumentData::new())
        .await
        .unwrap();
    assert!(!h.documents.exists("users", credential.user.uid()).await.unwrap());

    let session = wait_for(&h.manager, |s| s.login_method.is_some()).await;
    assert_eq!(session.name.as_deref(), Some(""));
    assert_eq!(session.login_method, Some(LoginMethod::Email));
}

#[tokio::test]
async fn sign_out_clears_session_and_file_slot() {
    let dir = std::env::temp_dir().join(format!("firebase-facade-session-{}", std::process::id()));
    let path = dir.join("storage.json");
    let storage = Arc::new(FileStorage::new(&path));
    let h = harness(storage.clone());
    let _subscription = h.manager.start(h.accounts.auth());

    h.accounts
        .register("cleo@example.com", "secret1", DocumentData::new())
        .await
        .unwrap();
    let signed_in = wait_for(&h.manager, |s| s.login_method.is_some()).await;

    let reopened = FileStorage::new(&path);
    let cached: Session =
        serde_json::from_str(&reopened.get_item("user").unwrap().unwrap()).unwrap();
    assert_eq!(cached, signed_in);

    h.accounts.logout();
    let session = h.manager.session();
    assert_eq!(session, Session::signed_out());
    assert_eq!(session.id, None);
    assert_eq!(session.email, None);
    assert_eq!(session.name, None);
    assert!(!session.is_logged_in);
    assert_eq!(session.login_method, None);
    assert_eq!(storage.get_item("user").unwrap(), None);

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn subscribers_see_every_transition() {
    let h = harness(Arc::new(InMemoryStorage::new()));
    let (sender, receiver) = async_channel::unbounded::<Session>();
    let _session_subscription = h.manager.subscribe(Arc::new(move |session: &Session| {
        let _ = sender.try_send(session.clone());
    }));
    let _subscription = h.manager.start(h.accounts.auth());

    h.accounts
        .register("dan@example.com", "secret1", DocumentData::new())
        .await
        .unwrap();
    wait_for(&h.manager, |s| s.login_method.is_some()).await;
    h.accounts.logout();

    let mut seen = Vec::new();
    while let Ok(session) = receiver.try_recv() {
        seen.push((session.is_logged_in, session.login_method));
    }
    assert_eq!(
        seen,
        [
            (false, None),
            (true, None),
            (true, Some(LoginMethod::Email)),
            (false, None),
        ]
    );
}
