use std::rc::Rc;

use thiserror::Error;
use url::Url;

pub const DEFAULT_RESPONSE_TYPE: &str = "code";
pub const DEFAULT_SCOPE: &str = "phone openid email";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Loading,
    Unauthenticated,
    Authenticated,
    Errored,
}

/// Authenticated-identity state as reported by the identity provider.
///
/// Exactly one status holds at a time; the profile email exists only while
/// `Authenticated` and the error message only while `Errored`. The
/// constructors are the only way to build one, which keeps that invariant
/// out of reach of callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    status: SessionStatus,
    profile_email: Option<String>,
    error_message: Option<String>,
}

impl Session {
    #[must_use]
    pub fn loading() -> Self {
        Self {
            status: SessionStatus::Loading,
            profile_email: None,
            error_message: None,
        }
    }

    #[must_use]
    pub fn unauthenticated() -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            profile_email: None,
            error_message: None,
        }
    }

    #[must_use]
    pub fn authenticated(profile_email: impl Into<String>) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            profile_email: Some(profile_email.into()),
            error_message: None,
        }
    }

    #[must_use]
    pub fn errored(message: impl Into<String>) -> Self {
        Self {
            status: SessionStatus::Errored,
            profile_email: None,
            error_message: Some(message.into()),
        }
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn profile_email(&self) -> Option<&str> {
        self.profile_email.as_deref()
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

/// Capability interface over the external OIDC provider. Session
/// transitions are driven entirely by the provider's own callbacks; the
/// gate never polls.
pub trait IdentityProvider {
    fn session(&self) -> Session;
    /// Starts the authorization-code flow by leaving for the provider's
    /// authorization endpoint.
    fn sign_in_redirect(&self);
    fn clear_credentials(&self);
}

impl<P: IdentityProvider + ?Sized> IdentityProvider for Rc<P> {
    fn session(&self) -> Session {
        (**self).session()
    }

    fn sign_in_redirect(&self) {
        (**self).sign_in_redirect();
    }

    fn clear_credentials(&self) {
        (**self).clear_credentials();
    }
}

/// Browser location/history capability.
pub trait Navigator {
    fn current_path(&self) -> String;
    /// Rewrites the visible URL without adding a history entry.
    fn replace_history(&self, path: &str);
    /// Terminal navigation; the page leaves the application.
    fn navigate(&self, url: &str);
}

impl<N: Navigator + ?Sized> Navigator for Rc<N> {
    fn current_path(&self) -> String {
        (**self).current_path()
    }

    fn replace_history(&self, path: &str) {
        (**self).replace_history(path);
    }

    fn navigate(&self, url: &str) {
        (**self).navigate(url);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthConfigError {
    #[error("auth_authority_invalid")]
    InvalidAuthority,
    #[error("auth_client_id_missing")]
    ClientIdMissing,
    #[error("auth_redirect_uri_invalid")]
    InvalidRedirectUri,
    #[error("auth_logout_domain_invalid")]
    InvalidLogoutDomain,
    #[error("auth_post_logout_redirect_missing")]
    PostLogoutRedirectMissing,
}

#[derive(Debug, Clone)]
pub struct OidcConfig {
    authority: String,
    client_id: String,
    redirect_uri: Url,
    response_type: String,
    scope: String,
    end_session_endpoint: Url,
    post_logout_redirect_uri: String,
}

impl OidcConfig {
    /// `logout_domain` is the provider's hosted logout origin, distinct
    /// from `authority` (Cognito keeps them on separate hosts).
    pub fn new(
        authority: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: &str,
        logout_domain: &str,
        post_logout_redirect_uri: impl Into<String>,
    ) -> Result<Self, AuthConfigError> {
        let authority = normalize_https_url(&authority.into())
            .ok_or(AuthConfigError::InvalidAuthority)?;
        let client_id = client_id.into().trim().to_string();
        if client_id.is_empty() {
            return Err(AuthConfigError::ClientIdMissing);
        }
        let redirect_uri = Url::parse(redirect_uri.trim())
            .map_err(|_| AuthConfigError::InvalidRedirectUri)?;
        let end_session_endpoint = Url::parse(logout_domain.trim())
            .ok()
            .and_then(|domain| domain.join("logout").ok())
            .ok_or(AuthConfigError::InvalidLogoutDomain)?;
        let post_logout_redirect_uri = post_logout_redirect_uri.into().trim().to_string();
        if post_logout_redirect_uri.is_empty() {
            return Err(AuthConfigError::PostLogoutRedirectMissing);
        }
        Ok(Self {
            authority,
            client_id,
            redirect_uri,
            response_type: DEFAULT_RESPONSE_TYPE.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            end_session_endpoint,
            post_logout_redirect_uri,
        })
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        self.redirect_uri.as_str()
    }

    #[must_use]
    pub fn response_type(&self) -> &str {
        &self.response_type
    }

    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Path component of the redirect URI; the one-time authorization code
    /// lands here.
    #[must_use]
    pub fn callback_path(&self) -> &str {
        self.redirect_uri.path()
    }

    /// Provider end-session URL carrying `client_id` and the URL-encoded
    /// post-logout redirect target.
    #[must_use]
    pub fn end_session_url(&self) -> String {
        let mut url = self.end_session_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("logout_uri", &self.post_logout_redirect_uri);
        url.to_string()
    }
}

fn normalize_https_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return None;
    }
    let (_, remainder) = trimmed.split_once("://")?;
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return None;
    }
    Some(trimmed.to_string())
}

/// What the shell is allowed to render right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateView {
    Loading,
    Error(String),
    RedirectingToSignIn,
    Dashboard,
}

/// Gates all dashboard rendering on a valid session.
///
/// Entering `Unauthenticated` issues the sign-in redirect exactly once per
/// entry into that state, not once per render; leaving the state re-arms
/// it. `Errored` renders the message and never redirects.
#[derive(Debug)]
pub struct AuthGate<P, N> {
    provider: P,
    navigator: N,
    config: OidcConfig,
    redirect_issued: bool,
}

impl<P, N> AuthGate<P, N>
where
    P: IdentityProvider,
    N: Navigator,
{
    pub fn new(provider: P, navigator: N, config: OidcConfig) -> Self {
        Self {
            provider,
            navigator,
            config,
            redirect_issued: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.provider.session()
    }

    pub fn view(&mut self) -> GateView {
        let session = self.provider.session();
        match session.status() {
            SessionStatus::Loading => {
                self.redirect_issued = false;
                GateView::Loading
            }
            SessionStatus::Errored => {
                self.redirect_issued = false;
                GateView::Error(
                    session
                        .error_message()
                        .unwrap_or("unknown identity provider error")
                        .to_string(),
                )
            }
            SessionStatus::Unauthenticated => {
                if !self.redirect_issued {
                    tracing::debug!("unauthenticated, redirecting to sign-in");
                    self.provider.sign_in_redirect();
                    self.redirect_issued = true;
                }
                GateView::RedirectingToSignIn
            }
            SessionStatus::Authenticated => {
                self.redirect_issued = false;
                // Scrub the one-time authorization code from the visible
                // URL so a manual reload cannot replay it.
                if self.navigator.current_path() == self.config.callback_path() {
                    self.navigator.replace_history("/");
                }
                GateView::Dashboard
            }
        }
    }

    /// Clears local credentials, then leaves for the provider's
    /// end-session endpoint. Terminal.
    pub fn sign_out(&self) {
        self.provider.clear_credentials();
        self.navigator.navigate(&self.config.end_session_url());
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;

    struct FakeProvider {
        session: RefCell<Session>,
        sign_in_calls: Cell<usize>,
        cleared: Cell<bool>,
    }

    impl FakeProvider {
        fn with_session(session: Session) -> Rc<Self> {
            Rc::new(Self {
                session: RefCell::new(session),
                sign_in_calls: Cell::new(0),
                cleared: Cell::new(false),
            })
        }

        fn set_session(&self, session: Session) {
            *self.session.borrow_mut() = session;
        }
    }

    impl IdentityProvider for FakeProvider {
        fn session(&self) -> Session {
            self.session.borrow().clone()
        }

        fn sign_in_redirect(&self) {
            self.sign_in_calls.set(self.sign_in_calls.get() + 1);
        }

        fn clear_credentials(&self) {
            self.cleared.set(true);
        }
    }

    struct FakeNavigator {
        path: RefCell<String>,
        replacements: RefCell<Vec<String>>,
        navigations: RefCell<Vec<String>>,
    }

    impl FakeNavigator {
        fn at(path: &str) -> Rc<Self> {
            Rc::new(Self {
                path: RefCell::new(path.to_string()),
                replacements: RefCell::new(Vec::new()),
                navigations: RefCell::new(Vec::new()),
            })
        }
    }

    impl Navigator for FakeNavigator {
        fn current_path(&self) -> String {
            self.path.borrow().clone()
        }

        fn replace_history(&self, path: &str) {
            *self.path.borrow_mut() = path.to_string();
            self.replacements.borrow_mut().push(path.to_string());
        }

        fn navigate(&self, url: &str) {
            self.navigations.borrow_mut().push(url.to_string());
        }
    }

    fn config() -> OidcConfig {
        OidcConfig::new(
            "https://cognito-idp.ap-south-1.amazonaws.com/ap-south-1_testpool",
            "client123",
            "https://dashboard.example.com/callback",
            "https://auth.example.com/",
            "https://dashboard.example.com/",
        )
        .expect("valid oidc config")
    }

    #[test]
    fn loading_renders_nothing_else() {
        let provider = FakeProvider::with_session(Session::loading());
        let navigator = FakeNavigator::at("/");
        let mut gate = AuthGate::new(Rc::clone(&provider), Rc::clone(&navigator), config());

        assert_eq!(gate.view(), GateView::Loading);
        assert_eq!(provider.sign_in_calls.get(), 0);
        assert!(navigator.navigations.borrow().is_empty());
    }

    #[test]
    fn errored_surfaces_message_without_redirecting() {
        let provider = FakeProvider::with_session(Session::errored("token refresh failed"));
        let navigator = FakeNavigator::at("/");
        let mut gate = AuthGate::new(Rc::clone(&provider), Rc::clone(&navigator), config());

        assert_eq!(
            gate.view(),
            GateView::Error("token refresh failed".to_string())
        );
        assert_eq!(provider.sign_in_calls.get(), 0);
        assert!(navigator.navigations.borrow().is_empty());
    }

    #[test]
    fn unauthenticated_redirects_once_per_entry() {
        let provider = FakeProvider::with_session(Session::unauthenticated());
        let navigator = FakeNavigator::at("/");
        let mut gate = AuthGate::new(Rc::clone(&provider), Rc::clone(&navigator), config());

        assert_eq!(gate.view(), GateView::RedirectingToSignIn);
        assert_eq!(gate.view(), GateView::RedirectingToSignIn);
        assert_eq!(gate.view(), GateView::RedirectingToSignIn);
        assert_eq!(provider.sign_in_calls.get(), 1);
    }

    #[test]
    fn leaving_unauthenticated_rearms_the_redirect() {
        let provider = FakeProvider::with_session(Session::unauthenticated());
        let navigator = FakeNavigator::at("/");
        let mut gate = AuthGate::new(Rc::clone(&provider), Rc::clone(&navigator), config());

        gate.view();
        provider.set_session(Session::authenticated("operator@example.com"));
        assert_eq!(gate.view(), GateView::Dashboard);
        provider.set_session(Session::unauthenticated());
        gate.view();

        assert_eq!(provider.sign_in_calls.get(), 2);
    }

    #[test]
    fn callback_path_is_scrubbed_after_sign_in() {
        let provider = FakeProvider::with_session(Session::authenticated("operator@example.com"));
        let navigator = FakeNavigator::at("/callback");
        let mut gate = AuthGate::new(Rc::clone(&provider), Rc::clone(&navigator), config());

        assert_eq!(gate.view(), GateView::Dashboard);
        assert_eq!(navigator.replacements.borrow().as_slice(), ["/"]);

        // Re-render after the rewrite does not touch history again.
        assert_eq!(gate.view(), GateView::Dashboard);
        assert_eq!(navigator.replacements.borrow().len(), 1);
    }

    #[test]
    fn ordinary_paths_are_left_alone_when_authenticated() {
        let provider = FakeProvider::with_session(Session::authenticated("operator@example.com"));
        let navigator = FakeNavigator::at("/instances");
        let mut gate = AuthGate::new(Rc::clone(&provider), Rc::clone(&navigator), config());

        assert_eq!(gate.view(), GateView::Dashboard);
        assert!(navigator.replacements.borrow().is_empty());
    }

    #[test]
    fn sign_out_clears_credentials_and_leaves_via_end_session_url() {
        let provider = FakeProvider::with_session(Session::authenticated("operator@example.com"));
        let navigator = FakeNavigator::at("/");
        let gate = AuthGate::new(Rc::clone(&provider), Rc::clone(&navigator), config());

        gate.sign_out();

        assert!(provider.cleared.get());
        assert_eq!(
            navigator.navigations.borrow().as_slice(),
            ["https://auth.example.com/logout?client_id=client123&logout_uri=https%3A%2F%2Fdashboard.example.com%2F"]
        );
    }

    #[test]
    fn session_constructors_uphold_field_invariants() {
        let authenticated = Session::authenticated("operator@example.com");
        assert_eq!(authenticated.status(), SessionStatus::Authenticated);
        assert_eq!(authenticated.profile_email(), Some("operator@example.com"));
        assert_eq!(authenticated.error_message(), None);

        let errored = Session::errored("boom");
        assert_eq!(errored.profile_email(), None);
        assert_eq!(errored.error_message(), Some("boom"));
    }

    #[test]
    fn config_rejects_bad_inputs() {
        let invalid_authority = OidcConfig::new(
            "cognito.example.com",
            "client123",
            "https://dashboard.example.com/callback",
            "https://auth.example.com/",
            "https://dashboard.example.com/",
        )
        .expect_err("authority without scheme");
        assert_eq!(invalid_authority, AuthConfigError::InvalidAuthority);

        let missing_client = OidcConfig::new(
            "https://cognito.example.com/pool",
            "   ",
            "https://dashboard.example.com/callback",
            "https://auth.example.com/",
            "https://dashboard.example.com/",
        )
        .expect_err("blank client id");
        assert_eq!(missing_client, AuthConfigError::ClientIdMissing);

        let bad_logout = OidcConfig::new(
            "https://cognito.example.com/pool",
            "client123",
            "https://dashboard.example.com/callback",
            "not a url",
            "https://dashboard.example.com/",
        )
        .expect_err("unparseable logout domain");
        assert_eq!(bad_logout, AuthConfigError::InvalidLogoutDomain);
    }

    #[test]
    fn callback_path_comes_from_redirect_uri() {
        assert_eq!(config().callback_path(), "/callback");
        assert_eq!(config().response_type(), "code");
    }
}
