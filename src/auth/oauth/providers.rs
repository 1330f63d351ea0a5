use super::provider::OAuthProvider;

pub struct GoogleAuthProvider;

impl GoogleAuthProvider {
    pub const PROVIDER_ID: &'static str = "google.com";

    /// Google provider requesting the `profile` and `email` scopes.
    pub fn provider() -> OAuthProvider {
        let mut provider = OAuthProvider::new(
            Self::PROVIDER_ID,
            "https://accounts.google.com/o/oauth2/v2/auth",
        );
        provider.add_scope("profile");
        provider.add_scope("email");
        provider.set_custom_parameters(
            [("prompt".to_string(), "select_account".to_string())]
                .into_iter()
                .collect(),
        );
        provider
    }

    /// Adds a `login_hint` custom parameter to pre-select an account.
    pub fn add_login_hint(provider: &mut OAuthProvider, hint: &str) {
        let mut params = provider.custom_parameters().clone();
        params.insert("login_hint".to_string(), hint.to_string());
        provider.set_custom_parameters(params);
    }
}
