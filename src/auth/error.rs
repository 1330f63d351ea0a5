use std::fmt;

use crate::app::AppError;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Wrong password, unknown email on sign-in, or a rejected federated credential.
    InvalidCredential(String),
    EmailAlreadyInUse(String),
    WeakPassword(String),
    UserNotFound(String),
    UserDisabled(String),
    TooManyRequests(String),
    /// The operation needs a signed-in user and there is none.
    NoCurrentUser,
    OperationNotSupported(String),
    Network(String),
    Internal(String),
    App(AppError),
}

impl AuthError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AuthError::InvalidCredential(_) => "auth/invalid-credential",
            AuthError::EmailAlreadyInUse(_) => "auth/email-already-in-use",
            AuthError::WeakPassword(_) => "auth/weak-password",
            AuthError::UserNotFound(_) => "auth/user-not-found",
            AuthError::UserDisabled(_) => "auth/user-disabled",
            AuthError::TooManyRequests(_) => "auth/too-many-requests",
            AuthError::NoCurrentUser => "auth/no-current-user",
            AuthError::OperationNotSupported(_) => "auth/operation-not-supported",
            AuthError::Network(_) => "auth/network-request-failed",
            AuthError::Internal(_) => "auth/internal-error",
            AuthError::App(err) => err.code_str(),
        }
    }

    /// Maps an Identity Toolkit error message such as
    /// `WEAK_PASSWORD : Password should be at least 6 characters`.
    pub(crate) fn from_server_message(message: &str) -> Self {
        let (code, detail) = match message.split_once(" : ") {
            Some((code, detail)) => (code.trim(), detail.trim().to_string()),
            None => (message.trim(), message.trim().to_string()),
        };
        match code {
            "EMAIL_EXISTS" => AuthError::EmailAlreadyInUse(detail),
            "WEAK_PASSWORD" => AuthError::WeakPassword(detail),
            "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => AuthError::UserNotFound(detail),
            "INVALID_PASSWORD"
            | "INVALID_LOGIN_CREDENTIALS"
            | "INVALID_IDP_RESPONSE"
            | "INVALID_ID_TOKEN"
            | "INVALID_EMAIL"
            | "MISSING_PASSWORD" => AuthError::InvalidCredential(detail),
            "USER_DISABLED" => AuthError::UserDisabled(detail),
            "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::TooManyRequests(detail),
            "OPERATION_NOT_ALLOWED" => AuthError::OperationNotSupported(detail),
            _ => AuthError::Internal(detail),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredential(message) => write!(f, "Invalid credential: {message}"),
            AuthError::EmailAlreadyInUse(message) => write!(f, "Email already in use: {message}"),
            AuthError::WeakPassword(message) => write!(f, "Weak password: {message}"),
            AuthError::UserNotFound(message) => write!(f, "User not found: {message}"),
            AuthError::UserDisabled(message) => write!(f, "User disabled: {message}"),
            AuthError::TooManyRequests(message) => write!(f, "Too many requests: {message}"),
            AuthError::NoCurrentUser => write!(f, "No user is currently signed in"),
            AuthError::OperationNotSupported(message) => {
                write!(f, "Operation not supported: {message}")
            }
            AuthError::Network(message) => write!(f, "Network error: {message}"),
            AuthError::Internal(message) => write!(f, "Internal error: {message}"),
            AuthError::App(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<AppError> for AuthError {
    fn from(error: AppError) -> Self {
        AuthError::App(error)
    }
}
