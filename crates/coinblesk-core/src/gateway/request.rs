//! Request descriptors and token attachment.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use reqwest::Method;
use serde::Serialize;

use crate::api::ApiError;
use crate::auth::SessionKeys;

/// Header carrying the auth token in `TokenMode::Header`
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Query parameter carrying the auth token in `TokenMode::QueryParam`
pub const AUTH_TOKEN_PARAM: &str = "token";

/// Cookie holding the server's session identifier
pub const SESSION_COOKIE: &str = "JSESSIONID";

/// How the auth token travels on outgoing requests. Fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenMode {
    Header,
    QueryParam,
}

impl TokenMode {
    pub fn from_header_flag(use_auth_token_header: bool) -> Self {
        if use_auth_token_header {
            TokenMode::Header
        } else {
            TokenMode::QueryParam
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// Everything needed to (re-)issue a request against the backend.
///
/// `path` is relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self, ApiError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::InvalidRequest(format!("header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::InvalidRequest(format!("header value for {}: {}", name, e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("unserializable body: {}", e)))?;
        self.body = Some(RequestBody::Json(value));
        Ok(self)
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(fields));
        self
    }

    /// Outgoing copy carrying the session keys.
    ///
    /// The session id always goes back as the `JSESSIONID` cookie. An auth
    /// token travels the way `mode` says. The descriptor itself is left
    /// alone, so a replay picks up whatever keys the session holds then.
    pub fn authorized(&self, keys: &SessionKeys, mode: TokenMode) -> Result<Self, ApiError> {
        let mut outgoing = self.clone();

        if let Some(session_id) = keys.session_id.as_deref().filter(|s| !s.is_empty()) {
            let value = HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, session_id))
                .map_err(|_| ApiError::InvalidRequest("session id is not a valid cookie value".to_string()))?;
            outgoing.headers.insert(COOKIE, value);
        }

        let Some(token) = keys.auth_token.as_deref().filter(|t| !t.is_empty()) else {
            return Ok(outgoing);
        };
        match mode {
            TokenMode::Header => {
                let value = HeaderValue::from_str(token)
                    .map_err(|_| ApiError::InvalidRequest("auth token is not a valid header value".to_string()))?;
                outgoing.headers.insert(AUTH_TOKEN_HEADER, value);
                outgoing.query.retain(|(k, _)| k != AUTH_TOKEN_PARAM);
            }
            TokenMode::QueryParam => {
                outgoing.headers.remove(AUTH_TOKEN_HEADER);
                outgoing.query.retain(|(k, _)| k != AUTH_TOKEN_PARAM);
                outgoing
                    .query
                    .push((AUTH_TOKEN_PARAM.to_string(), token.to_string()));
            }
        }
        Ok(outgoing)
    }

    /// Absolute URL for this request against `base_url`, without query string
    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}
