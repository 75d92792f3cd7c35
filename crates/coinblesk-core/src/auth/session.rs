use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::UserAccount;

/// Handle to the session shared by the gateway and whatever renders it.
pub type SharedSession = Arc<RwLock<Session>>;

/// Notice shown when a request needs the user to log in again.
pub const LOGIN_REQUIRED_NOTICE: &str = "Please enter a valid username / password";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Uninitialized,
    Authenticating,
    Authenticated,
}

/// Which view the front end should be showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Login,
    Home,
}

/// What the server handed out at login.
///
/// `session_id` is the servlet session cookie and goes back as a cookie.
/// `auth_token` only exists when the server answered with an `X-Auth-Token`
/// header and goes back the way the configured token mode says.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionKeys {
    pub auth_token: Option<String>,
    pub session_id: Option<String>,
}

impl SessionKeys {
    pub fn new(auth_token: Option<String>, session_id: Option<String>) -> Self {
        Self {
            auth_token: auth_token.filter(|t| !t.is_empty()),
            session_id: session_id.filter(|s| !s.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.auth_token.is_none() && self.session_id.is_none()
    }

    /// Take over whatever `newer` carries, keeping the rest.
    fn merge(&mut self, newer: SessionKeys) {
        if newer.auth_token.is_some() {
            self.auth_token = newer.auth_token;
        }
        if newer.session_id.is_some() {
            self.session_id = newer.session_id;
        }
    }
}

/// Process-wide session state.
///
/// Only the session gateway moves `state`; front ends read it and may take the notice.
#[derive(Debug, Default)]
pub struct Session {
    keys: SessionKeys,
    username: Option<String>,
    state: AuthState,
    user: Option<UserAccount>,
    notice: Option<String>,
    route: Route,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedSession {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Get the bearer token, ignoring empty values
    pub fn token(&self) -> Option<&str> {
        self.keys.auth_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Servlet session identifier (`JSESSIONID`)
    pub fn session_id(&self) -> Option<&str> {
        self.keys.session_id.as_deref().filter(|s| !s.is_empty())
    }

    pub fn keys(&self) -> SessionKeys {
        SessionKeys::new(
            self.token().map(str::to_owned),
            self.session_id().map(str::to_owned),
        )
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    pub fn user(&self) -> Option<&UserAccount> {
        self.user.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub fn navigate(&mut self, route: Route) {
        self.route = route;
    }

    pub(crate) fn set_user(&mut self, user: UserAccount) {
        self.user = Some(user);
    }

    /// A login attempt started. Re-authenticating from `Authenticated` is allowed.
    pub(crate) fn begin_authentication(&mut self) {
        self.state = AuthState::Authenticating;
    }

    /// Install restored keys before they have been verified.
    pub(crate) fn resume(&mut self, username: String, keys: SessionKeys) {
        self.username = Some(username);
        self.keys = keys;
        self.state = AuthState::Authenticating;
    }

    /// The server rotated its session cookie.
    pub(crate) fn refresh_session_id(&mut self, session_id: String) {
        self.keys.session_id = Some(session_id);
    }

    /// Credentials accepted. Keys the login did not hand out are kept.
    pub(crate) fn confirm(&mut self, username: String, keys: SessionKeys) {
        self.keys.merge(keys);
        if self.username.as_deref() != Some(username.as_str()) {
            self.user = None;
        }
        self.username = Some(username);
        self.state = AuthState::Authenticated;
        self.notice = None;
        self.route = Route::Home;
    }

    /// Credentials rejected. The rest of the session is left as it was.
    pub(crate) fn reject(&mut self, notice: impl Into<String>) {
        self.state = AuthState::Uninitialized;
        self.notice = Some(notice.into());
    }

    /// Drop back to uninitialized without touching token or identity.
    pub(crate) fn demote(&mut self) {
        self.state = AuthState::Uninitialized;
    }

    /// Forget everything about the logged-in user, returning the old keys.
    pub(crate) fn clear(&mut self) -> SessionKeys {
        self.state = AuthState::Uninitialized;
        self.username = None;
        self.user = None;
        std::mem::take(&mut self.keys)
    }
}
