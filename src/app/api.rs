use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

use crate::app::errors::{AppError, AppResult};
use crate::app::logger::LOGGER;
use crate::app::types::{FirebaseApp, FirebaseAppSettings, FirebaseOptions, DEFAULT_ENTRY_NAME};

static APPS: LazyLock<Mutex<HashMap<String, FirebaseApp>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn normalize_name(settings: &FirebaseAppSettings) -> AppResult<String> {
    let name = settings
        .name
        .clone()
        .unwrap_or_else(|| DEFAULT_ENTRY_NAME.to_string());
    if name.trim().is_empty() {
        return Err(AppError::BadAppName { app_name: name });
    }
    Ok(name)
}

/// Registers an app under `settings.name` (or the default name).
///
/// Initializing the same name twice with identical options returns the
/// existing app; different options fail with `app/duplicate-app`.
pub fn initialize_app(
    options: FirebaseOptions,
    settings: Option<FirebaseAppSettings>,
) -> AppResult<FirebaseApp> {
    let settings = settings.unwrap_or_default();
    let name = normalize_name(&settings)?;
    if !options.is_defined() {
        return Err(AppError::NoOptions);
    }

    let mut apps = APPS.lock().unwrap();
    if let Some(existing) = apps.get(&name) {
        if existing.options() == &options {
            return Ok(existing.clone());
        }
        return Err(AppError::DuplicateApp { app_name: name });
    }

    let app = FirebaseApp::new(name.clone(), options);
    apps.insert(name.clone(), app.clone());
    LOGGER.debug(format!("initialized app '{name}'"));
    Ok(app)
}

pub fn get_app(name: Option<&str>) -> AppResult<FirebaseApp> {
    let lookup = name.unwrap_or(DEFAULT_ENTRY_NAME);
    APPS.lock()
        .unwrap()
        .get(lookup)
        .cloned()
        .ok_or_else(|| AppError::NoApp {
            app_name: lookup.to_string(),
        })
}

pub fn get_apps() -> Vec<FirebaseApp> {
    APPS.lock().unwrap().values().cloned().collect()
}

pub fn delete_app(app: &FirebaseApp) -> AppResult<()> {
    let removed = APPS.lock().unwrap().remove(app.name());
    match removed {
        Some(_) => {
            LOGGER.debug(format!("deleted app '{}'", app.name()));
            Ok(())
        }
        None => Err(AppError::NoApp {
            app_name: app.name().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::LogLevel;
    use std::sync::Arc;

    fn options(project: &str) -> FirebaseOptions {
        FirebaseOptions {
            project_id: Some(project.to_string()),
            ..Default::default()
        }
    }

    fn named(name: &str) -> Option<FirebaseAppSettings> {
        Some(FirebaseAppSettings {
            name: Some(name.to_string()),
        })
    }

    #[test]
    fn initialize_is_idempotent_for_equal_options() {
        let first = initialize_app(options("p1"), named("registry-idempotent")).unwrap();
        let second = initialize_app(options("p1"), named("registry-idempotent")).unwrap();
        assert_eq!(first.name(), second.name());
        assert_eq!(get_app(Some("registry-idempotent")).unwrap().options(), &options("p1"));
    }

    #[test]
    fn rejects_duplicate_name_with_other_options() {
        initialize_app(options("p1"), named("registry-duplicate")).unwrap();
        let err = initialize_app(options("p2"), named("registry-duplicate")).unwrap_err();
        assert_eq!(
            err,
            AppError::DuplicateApp {
                app_name: "registry-duplicate".into()
            }
        );
    }

    #[test]
    fn rejects_blank_name_and_empty_options() {
        assert!(matches!(
            initialize_app(options("p"), named("  ")),
            Err(AppError::BadAppName { .. })
        ));
        assert_eq!(
            initialize_app(FirebaseOptions::default(), named("registry-empty")).unwrap_err(),
            AppError::NoOptions
        );
    }

    #[test]
    fn delete_removes_app() {
        let app = initialize_app(options("p"), named("registry-delete")).unwrap();
        delete_app(&app).unwrap();
        assert!(get_app(Some("registry-delete")).is_err());
        assert!(get_apps().iter().all(|candidate| candidate.name() != "registry-delete"));
    }

    #[test]
    fn lifecycle_is_logged_under_app_component() {
        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&records);
        LOGGER.set_log_handler(move |logger, level, message| {
            if message.contains("registry-logged") {
                sink.lock()
                    .unwrap()
                    .push((logger.name().to_string(), level, message.to_string()));
            }
        });

        let app = initialize_app(options("p"), named("registry-logged")).unwrap();
        delete_app(&app).unwrap();
        LOGGER.reset_log_handler();

        let records = records.lock().unwrap();
        assert_eq!(
            *records,
            [
                (
                    "@firebase-facade/app".to_string(),
                    LogLevel::Debug,
                    "initialized app 'registry-logged'".to_string()
                ),
                (
                    "@firebase-facade/app".to_string(),
                    LogLevel::Debug,
                    "deleted app 'registry-logged'".to_string()
                ),
            ]
        );
    }
}
