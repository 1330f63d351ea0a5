use std::fmt;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    NoApp { app_name: String },
    BadAppName { app_name: String },
    DuplicateApp { app_name: String },
    NoOptions,
    MissingOption { option: &'static str },
    InvalidConfig { message: String },
}

impl AppError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AppError::NoApp { .. } => "app/no-app",
            AppError::BadAppName { .. } => "app/bad-app-name",
            AppError::DuplicateApp { .. } => "app/duplicate-app",
            AppError::NoOptions => "app/no-options",
            AppError::MissingOption { .. } => "app/missing-option",
            AppError::InvalidConfig { .. } => "app/invalid-config",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NoApp { app_name } => {
                write!(f, "No Firebase App '{app_name}' has been created - call initialize_app() first")
            }
            AppError::BadAppName { app_name } => write!(f, "Illegal App name: '{app_name}'"),
            AppError::DuplicateApp { app_name } => write!(
                f,
                "Firebase App named '{app_name}' already exists with different options"
            ),
            AppError::NoOptions => write!(f, "Firebase options must define at least a project_id or api_key"),
            AppError::MissingOption { option } => write!(f, "Firebase options must include '{option}'"),
            AppError::InvalidConfig { message } => write!(f, "Invalid Firebase configuration: {message}"),
        }
    }
}

impl std::error::Error for AppError {}
