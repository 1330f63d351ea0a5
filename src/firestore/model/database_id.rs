use crate::app::{FirebaseApp, DEFAULT_DATABASE_ID};
use crate::firestore::error::{missing_project_id, FirestoreResult};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DatabaseId {
    project_id: String,
    database: String,
}

impl DatabaseId {
    pub fn new(project_id: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: database.into(),
        }
    }

    pub fn from_app(app: &FirebaseApp) -> FirestoreResult<Self> {
        let options = app.options();
        let project_id = options.project_id.clone().ok_or_else(missing_project_id)?;
        Ok(Self::new(project_id, options.database_id_or_default()))
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// `projects/{project}/databases/{database}`
    pub fn resource_name(&self) -> String {
        format!("projects/{}/databases/{}", self.project_id, self.database)
    }
}

impl Default for DatabaseId {
    fn default() -> Self {
        Self::new("local", DEFAULT_DATABASE_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::FirebaseOptions;

    #[test]
    fn builds_from_app_options() {
        let app = FirebaseApp::new(
            "db-id-test",
            FirebaseOptions {
                project_id: Some("project".into()),
                database_id: Some("analytics".into()),
                ..Default::default()
            },
        );
        let db = DatabaseId::from_app(&app).unwrap();
        assert_eq!(db.resource_name(), "projects/project/databases/analytics");
    }

    #[test]
    fn missing_project_id_errors() {
        let app = FirebaseApp::new("db-id-missing", FirebaseOptions::default());
        let err = DatabaseId::from_app(&app).unwrap_err();
        assert_eq!(err.code_str(), "firestore/missing-project-id");
    }
}
