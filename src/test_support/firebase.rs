use crate::app::{FirebaseApp, FirebaseOptions};

/// Builds an unregistered app pointing at `project_id` with a fixed API key.
///
/// Apps built here bypass the global registry so tests stay isolated.
pub fn test_firebase_app(project_id: &str) -> FirebaseApp {
    let options = FirebaseOptions {
        api_key: Some("test-api-key".to_string()),
        project_id: Some(project_id.to_string()),
        ..Default::default()
    };
    FirebaseApp::new(format!("test-{project_id}"), options)
}
