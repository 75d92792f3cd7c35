//! Session gateway: every request to the backend goes through here.
//!
//! The gateway attaches the session cookie and auth token to outgoing requests, suspends
//! requests that come back 401/403 until the user logs in again, and reacts
//! to the authentication events published on the [`EventBus`].

pub mod bus;
mod pending;
pub mod request;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::{Client, Response, StatusCode};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::api::ApiError;
use crate::auth::session::LOGIN_REQUIRED_NOTICE;
use crate::auth::{Credentials, Route, SessionData, SessionKeys, SessionStore, SharedSession};
use crate::models::UserAccount;

pub use bus::{AuthEvent, EventBus, Subscription};
pub use request::{ApiRequest, RequestBody, TokenMode, AUTH_TOKEN_HEADER, AUTH_TOKEN_PARAM, SESSION_COOKIE};

use pending::{PendingQueue, Prompt};

// ============================================================================
// Constants
// ============================================================================

/// Form login endpoint
const LOGIN_PATH: &str = "j_spring_security_check";

/// Server-side session teardown
const LOGOUT_PATH: &str = "j_spring_security_logout";

/// Profile of the logged-in user, followed by the username
const CURRENT_USER_PATH: &str = "home/user";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REPLAY_TIMEOUT_SECS: u64 = 300;
const DEFAULT_MAX_PENDING_REQUESTS: usize = 64;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub token_mode: TokenMode,
    pub request_timeout: Duration,
    /// How long a suspended request waits for a login before failing
    pub replay_timeout: Duration,
    /// Oldest suspended request is evicted beyond this
    pub max_pending_requests: usize,
    pub fetch_profile_on_login: bool,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token_mode: TokenMode::Header,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            replay_timeout: Duration::from_secs(DEFAULT_REPLAY_TIMEOUT_SECS),
            max_pending_requests: DEFAULT_MAX_PENDING_REQUESTS,
            fetch_profile_on_login: true,
        }
    }
}

struct GatewayInner {
    client: Client,
    config: GatewayConfig,
    session: SharedSession,
    bus: EventBus,
    pending: Mutex<PendingQueue>,
    store: Option<SessionStore>,
    subscriptions: Mutex<Vec<Subscription>>,
}

/// Request interceptor plus authentication event coordinator.
/// Clone is cheap - all clones share one queue, session and HTTP client.
#[derive(Clone)]
pub struct SessionGateway {
    inner: Arc<GatewayInner>,
}

impl SessionGateway {
    /// Create a gateway and subscribe it to `bus`.
    ///
    /// With a `store`, successful logins are persisted and [`restore`](Self::restore)
    /// can resume them.
    pub fn new(
        config: GatewayConfig,
        session: SharedSession,
        bus: EventBus,
        store: Option<SessionStore>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let pending = Mutex::new(PendingQueue::new(config.max_pending_requests));

        let gateway = Self {
            inner: Arc::new(GatewayInner {
                client,
                config,
                session,
                bus,
                pending,
                store,
                subscriptions: Mutex::new(Vec::new()),
            }),
        };
        gateway.attach();
        Ok(gateway)
    }

    fn attach(&self) {
        let weak = Arc::downgrade(&self.inner);
        let subscription = self.inner.bus.subscribe(move |event| {
            if let Some(inner) = weak.upgrade() {
                SessionGateway { inner }.handle_event(event);
            }
        });
        self.inner.subscriptions.lock().push(subscription);
    }

    /// Stop reacting to bus events. Requests still go through the interceptor.
    pub fn detach(&self) {
        let subscriptions: Vec<Subscription> = self.inner.subscriptions.lock().drain(..).collect();
        drop(subscriptions);
    }

    pub fn session(&self) -> SharedSession {
        Arc::clone(&self.inner.session)
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Number of requests waiting for a login
    pub fn pending_len(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// True between an authentication lapse and the next confirmed login
    pub fn awaiting_login(&self) -> bool {
        self.inner.pending.lock().prompt() != Prompt::Closed
    }

    // =========================================================================
    // Interceptor
    // =========================================================================

    /// Send a request through the interceptor.
    ///
    /// A 401/403 does not fail the call: the request is queued and this future
    /// stays pending until it is replayed after the next confirmed login, or
    /// until the replay timeout, eviction or a discard settles it with an error.
    /// The replay timeout only runs while the request sits in the queue.
    pub async fn execute(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let method = request.method.to_string();
        let url = request.url(&self.inner.config.base_url);

        let response = match self.dispatch(&request, self.current_keys()).await {
            Ok(response) => response,
            Err(ApiError::NetworkError(e)) => {
                warn!(method = %method, url = %url, error = %e, "Request failed to send");
                self.inner
                    .session
                    .write()
                    .set_notice(format!("{} on {} failed: {}", method, url, e));
                return Err(ApiError::NetworkError(e));
            }
            Err(e) => return Err(e),
        };

        let status = response.status();
        if status.is_success() {
            self.note_session_use(&response);
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            debug!(method = %method, url = %url, status = status.as_u16(), "Authentication lapsed, queueing request");
            return self.suspend(request).await;
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(&method, &url, status, &body);
        warn!(error = %err, "Request failed");
        self.inner.session.write().set_notice(err.to_string());
        Err(err)
    }

    async fn suspend(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let enqueued = self.inner.pending.lock().push(request);

        if let Some(evicted) = enqueued.evicted {
            warn!(path = %evicted.request.path, "Pending queue full, evicting oldest request");
            evicted.resolve(Err(ApiError::Evicted));
        }

        if enqueued.opens_prompt {
            self.inner.bus.publish(AuthEvent::AuthenticationRequired);
        }

        let timeout = self.inner.config.replay_timeout;
        let mut receiver = enqueued.receiver;
        if let Ok(reply) = tokio::time::timeout(timeout, &mut receiver).await {
            return reply.unwrap_or(Err(ApiError::ReplayDiscarded));
        }

        // Still queued means no login came in time. Otherwise the replay is
        // already on the wire and its outcome is what the caller gets.
        if self.inner.pending.lock().remove(enqueued.id).is_some() {
            warn!(timeout_secs = timeout.as_secs(), "Gave up waiting for login");
            return Err(ApiError::ReplayTimedOut(timeout));
        }
        receiver.await.unwrap_or(Err(ApiError::ReplayDiscarded))
    }

    /// Authorize and send without any failure handling
    async fn dispatch(&self, request: &ApiRequest, keys: SessionKeys) -> Result<Response, ApiError> {
        let outgoing = request.authorized(&keys, self.inner.config.token_mode)?;
        let url = outgoing.url(&self.inner.config.base_url);

        let mut builder = self
            .inner
            .client
            .request(outgoing.method.clone(), &url)
            .headers(outgoing.headers.clone());
        if !outgoing.query.is_empty() {
            builder = builder.query(&outgoing.query);
        }
        builder = match &outgoing.body {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Form(fields)) => builder.form(fields),
            None => builder,
        };

        debug!(method = %outgoing.method, url = %url, "Sending request");
        Ok(builder.send().await?)
    }

    fn current_keys(&self) -> SessionKeys {
        self.inner.session.read().keys()
    }

    /// Follow a rotated session cookie and keep the persisted session fresh.
    fn note_session_use(&self, response: &Response) {
        let rotated = Self::session_cookie(response).filter(|id| {
            self.inner.session.read().session_id() != Some(id.as_str())
        });
        if let Some(session_id) = rotated {
            debug!("Server rotated the session cookie");
            self.inner.session.write().refresh_session_id(session_id);
            self.persist();
            return;
        }

        if let Some(store) = &self.inner.store {
            if let Err(e) = store.touch() {
                warn!(error = %e, "Failed to refresh persisted session");
            }
        }
    }

    // =========================================================================
    // Event coordination
    // =========================================================================

    fn handle_event(&self, event: &AuthEvent) {
        match event {
            AuthEvent::LoginRequested(credentials) => {
                let gateway = self.clone();
                let credentials = credentials.clone();
                self.spawn("login", async move {
                    if let Err(e) = gateway.login(credentials).await {
                        debug!(error = %e, "Login request rejected");
                    }
                });
            }
            AuthEvent::LoginConfirmed => {
                self.replay_pending();
            }
            AuthEvent::AuthenticationRequired => self.require_authentication(),
            AuthEvent::LogoutRequested => {
                let gateway = self.clone();
                self.spawn("logout", async move { gateway.logout().await });
            }
        }
    }

    fn spawn<F>(&self, task: &'static str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(future);
            }
            Err(_) => error!(task, "No async runtime available to run gateway task"),
        }
    }

    /// Re-issue every queued request and clear the queue.
    ///
    /// Replays are fired, not awaited; each result goes to its original caller.
    pub fn replay_pending(&self) -> usize {
        let entries = self.inner.pending.lock().drain();
        let count = entries.len();
        if count > 0 {
            info!(count, "Replaying requests queued during re-authentication");
        }

        for entry in entries {
            debug!(
                path = %entry.request.path,
                waited_ms = entry.queued_at.elapsed().as_millis() as u64,
                "Replaying request"
            );
            let gateway = self.clone();
            self.spawn("replay", async move {
                let result = gateway.execute(entry.request.clone()).await;
                entry.resolve(result);
            });
        }
        count
    }

    fn require_authentication(&self) {
        let (newly_shown, discarded) = {
            let mut pending = self.inner.pending.lock();
            if pending.show_prompt() {
                (true, Vec::new())
            } else {
                (false, pending.discard_all())
            }
        };

        if !discarded.is_empty() {
            warn!(
                count = discarded.len(),
                "Authentication required again before replay, discarding queued requests"
            );
        }
        drop(discarded);

        let mut session = self.inner.session.write();
        session.demote();
        if newly_shown {
            if session.route() != Route::Login {
                session.set_notice(LOGIN_REQUIRED_NOTICE);
            }
            session.navigate(Route::Login);
        }
    }

    // =========================================================================
    // Login / logout
    // =========================================================================

    /// Submit credentials and, on success, publish [`AuthEvent::LoginConfirmed`].
    pub async fn login(&self, credentials: Credentials) -> Result<(), ApiError> {
        let username = credentials.username.clone();
        info!(username = %username, "Logging in");
        self.inner.session.write().begin_authentication();

        let request = ApiRequest::post(LOGIN_PATH).form(credentials.form_fields());
        drop(credentials);

        let response = match self.dispatch(&request, SessionKeys::default()).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Login request failed");
                self.inner.session.write().reject(e.to_string());
                return Err(e);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let err = if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                ApiError::InvalidCredentials
            } else {
                let body = response.text().await.unwrap_or_default();
                ApiError::from_status("POST", &request.url(&self.inner.config.base_url), status, &body)
            };
            warn!(username = %username, error = %err, "Login rejected");
            self.inner.session.write().reject(err.to_string());
            return Err(err);
        }

        let keys = Self::session_keys(&response);
        if keys.is_empty() {
            debug!("Login response carried neither a session cookie nor a token");
        }
        self.inner.session.write().confirm(username.clone(), keys);
        self.persist();

        info!(username = %username, "Login confirmed");
        self.inner.bus.publish(AuthEvent::LoginConfirmed);

        if self.inner.config.fetch_profile_on_login {
            if let Err(e) = self.refresh_profile().await {
                warn!(error = %e, "Failed to fetch user profile");
            }
        }
        Ok(())
    }

    /// Session cookie and, if the server sent one, the `X-Auth-Token` header
    fn session_keys(response: &Response) -> SessionKeys {
        let auth_token = response
            .headers()
            .get(AUTH_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        SessionKeys::new(auth_token, Self::session_cookie(response))
    }

    fn session_cookie(response: &Response) -> Option<String> {
        response
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Forget the session locally, then tell the server. Never fails.
    pub async fn logout(&self) {
        let old_keys = {
            let mut session = self.inner.session.write();
            let keys = session.clear();
            session.navigate(Route::Login);
            keys
        };

        if let Some(store) = &self.inner.store {
            if let Err(e) = store.clear() {
                warn!(error = %e, "Failed to remove persisted session");
            }
        }
        info!("Logged out");

        match self.dispatch(&ApiRequest::post(LOGOUT_PATH), old_keys).await {
            Ok(response) if response.status().is_success() => debug!("Server session closed"),
            Ok(response) => debug!(status = response.status().as_u16(), "Server logout rejected, ignoring"),
            Err(e) => debug!(error = %e, "Server logout failed, ignoring"),
        }

        self.inner.bus.publish(AuthEvent::AuthenticationRequired);
    }

    /// Resume a persisted session if the server still accepts it.
    ///
    /// Publishes [`AuthEvent::LoginConfirmed`] and returns true on success.
    pub async fn restore(&self) -> Result<bool, ApiError> {
        let Some(store) = &self.inner.store else {
            return Ok(false);
        };
        let data = match store.load() {
            Ok(Some(data)) => data,
            Ok(None) => return Ok(false),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable persisted session");
                return Ok(false);
            }
        };

        debug!(username = %data.username, "Restoring persisted session");
        self.inner
            .session
            .write()
            .resume(data.username.clone(), data.keys());

        match self.refresh_profile().await {
            Ok(_) => {
                self.inner.session.write().confirm(data.username, SessionKeys::default());
                self.persist();
                info!("Restored persisted session");
                self.inner.bus.publish(AuthEvent::LoginConfirmed);
                Ok(true)
            }
            Err(e) => {
                self.inner.session.write().clear();
                if matches!(e.status(), Some(401) | Some(403)) {
                    debug!("Persisted session no longer accepted");
                    if let Err(e) = store.clear() {
                        warn!(error = %e, "Failed to remove persisted session");
                    }
                    Ok(false)
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Fetch the logged-in user's profile into the session.
    ///
    /// Bypasses the replay queue so it can run while a login is in flight.
    pub async fn refresh_profile(&self) -> Result<UserAccount, ApiError> {
        let username = self
            .inner
            .session
            .read()
            .username()
            .map(str::to_owned)
            .ok_or_else(|| ApiError::InvalidRequest("no user is logged in".to_string()))?;

        let request = ApiRequest::get(format!(
            "{}/{}",
            CURRENT_USER_PATH,
            urlencoding::encode(&username)
        ));
        let response = self.dispatch(&request, self.current_keys()).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(
                "GET",
                &request.url(&self.inner.config.base_url),
                status,
                &body,
            ));
        }

        let user: UserAccount = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("user profile: {}", e)))?;
        self.inner.session.write().set_user(user.clone());
        Ok(user)
    }

    fn persist(&self) {
        let Some(store) = &self.inner.store else {
            return;
        };
        let data = {
            let session = self.inner.session.read();
            let keys = session.keys();
            match session.username() {
                Some(username) if !keys.is_empty() => SessionData::new(keys, username.to_string()),
                _ => return,
            }
        };
        if let Err(e) = store.save(&data) {
            warn!(error = %e, "Failed to persist session");
        }
    }
}
