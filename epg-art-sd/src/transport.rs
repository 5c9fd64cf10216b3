//! Authenticated HTTP transport for the Schedules Direct JSON API.
//!
//! Every outbound call goes through [`AuthTransport::send`], which injects
//! the `token` header and follows redirects itself so the token survives a
//! hop to another host. Token refresh is single-flight: callers that queue
//! behind an in-flight refresh take its result instead of issuing their own.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderValue, LOCATION};
use reqwest::{Method, Request, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::credentials::Credentials;
use crate::error::SdError;
use crate::token::TokenStore;
use crate::types::{ApiErrorResponse, TokenRequest, TokenResponse};

pub const DEFAULT_BASE_URL: &str = "https://json.schedulesdirect.org/20141201/";

/// Header the service reads the token from.
pub const TOKEN_HEADER: &str = "token";

/// Hop limit, matching reqwest's default redirect policy.
pub const MAX_REDIRECTS: usize = 10;

/// Tokens are issued for 24 hours; refresh an hour early.
pub const TOKEN_LIFETIME: Duration = Duration::from_secs(23 * 60 * 60);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("epg-art/", env!("CARGO_PKG_VERSION"));

/// Whether [`AuthTransport::send`] should attach the current token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAuth {
    Inject,
    /// For calls that must go out bare, such as requesting a token.
    Exempt,
}

pub struct AuthTransport {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<Credentials>,
    store: Arc<TokenStore>,
    refresh_lock: Mutex<()>,
    /// Bumped after every completed refresh attempt.
    refresh_generation: AtomicU64,
}

impl AuthTransport {
    /// Build a transport against `base_url`. Without credentials the
    /// transport can only make auth-exempt calls.
    pub fn new(base_url: &str, credentials: Option<Credentials>) -> Result<Self, SdError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .gzip(true)
            .deflate(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Self::with_client(http, base_url, credentials, Arc::new(TokenStore::new()))
    }

    /// Build around an existing client and token store. The client must not
    /// follow redirects on its own or the token header is lost on the hop.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        credentials: Option<Credentials>,
        store: Arc<TokenStore>,
    ) -> Result<Self, SdError> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| SdError::InvalidUrl(format!("{base}: {e}")))?;
        Ok(Self {
            http,
            base_url,
            credentials,
            store,
            refresh_lock: Mutex::new(()),
            refresh_generation: AtomicU64::new(0),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token_store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn token(&self) -> Option<Arc<str>> {
        self.store.token()
    }

    pub fn token_timestamp(&self) -> Option<DateTime<Utc>> {
        self.store.issued_at()
    }

    /// A token is held and is younger than [`TOKEN_LIFETIME`].
    pub fn good_token(&self) -> bool {
        self.store.snapshot().is_some_and(|t| {
            // A timestamp in the future (clock skew) counts as fresh.
            (Utc::now() - t.issued_at)
                .to_std()
                .map_or(true, |age| age < TOKEN_LIFETIME)
        })
    }

    /// Able to make authenticated calls now or after a refresh.
    pub fn is_ready(&self) -> bool {
        self.good_token() || self.credentials.is_some()
    }

    pub fn clear_token(&self) {
        if !self.store.is_empty() {
            log::debug!("Clearing Schedules Direct token");
        }
        self.store.clear();
    }

    /// Ensure a usable token is held, refreshing when needed. With
    /// `force_reset` the current token is dropped first.
    pub async fn validate_token(&self, force_reset: bool) -> bool {
        if force_reset {
            self.clear_token();
        } else if self.good_token() {
            return true;
        }
        self.refresh_token().await
    }

    /// Fetch a new token. Concurrent callers collapse into one request and
    /// all observe its outcome. On failure the store is left empty.
    pub async fn refresh_token(&self) -> bool {
        let observed = self.refresh_generation.load(Ordering::Acquire);
        let _guard = self.refresh_lock.lock().await;
        if self.refresh_generation.load(Ordering::Acquire) != observed {
            log::debug!("Token refreshed by a concurrent caller");
            return !self.store.is_empty();
        }

        let ok = match self.request_token().await {
            Ok((token, issued_at)) => {
                self.store.set(&token, issued_at);
                log::info!("Obtained Schedules Direct token (issued {issued_at})");
                true
            }
            Err(e) => {
                self.store.clear();
                log::error!("Failed to obtain Schedules Direct token: {e}");
                false
            }
        };
        self.refresh_generation.fetch_add(1, Ordering::Release);
        ok
    }

    async fn request_token(&self) -> Result<(String, DateTime<Utc>), SdError> {
        let creds = self
            .credentials
            .as_ref()
            .ok_or_else(|| SdError::config("No Schedules Direct credentials configured"))?;
        let body = TokenRequest {
            username: &creds.username,
            password: creds.password_hash(),
        };
        let request = self
            .http
            .post(self.endpoint_url("token")?)
            .json(&body)
            .build()?;

        let response = self.send(request, TokenAuth::Exempt).await?;
        let status = response.status();
        let text = response.text().await?;
        let parsed: TokenResponse = serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                SdError::Json(e)
            } else {
                SdError::Status {
                    status: status.as_u16(),
                    message: snippet(&text),
                }
            }
        })?;

        if parsed.code != 0 {
            return Err(SdError::api(
                parsed.code,
                parsed.message.unwrap_or_else(|| "token request rejected".to_string()),
            ));
        }
        let token = parsed
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SdError::api(parsed.code, "token response carried no token"))?;
        Ok((token, parsed.datetime.unwrap_or_else(Utc::now)))
    }

    /// Send a raw request, injecting the token unless `auth` is
    /// [`TokenAuth::Exempt`] or the request already carries one.
    pub async fn send(&self, mut request: Request, auth: TokenAuth) -> Result<Response, SdError> {
        if auth == TokenAuth::Inject && !request.headers().contains_key(TOKEN_HEADER) {
            if let Some(token) = self.store.token() {
                match HeaderValue::from_str(&token) {
                    Ok(mut value) => {
                        value.set_sensitive(true);
                        request.headers_mut().insert(TOKEN_HEADER, value);
                    }
                    Err(_) => log::warn!("Held token is not a valid header value; sending without it"),
                }
            }
        }
        self.follow_redirects(request).await
    }

    /// Execute `request`, re-issuing it on 3xx with the token re-attached.
    async fn follow_redirects(&self, mut request: Request) -> Result<Response, SdError> {
        for hop in 0..=MAX_REDIRECTS {
            let token = request.headers().get(TOKEN_HEADER).cloned();
            let template = request.try_clone();
            log::trace!("{} {}", request.method(), request.url());

            let response = self.http.execute(request).await?;
            let status = response.status();
            log::trace!("{} from {}", status, response.url());
            if !is_redirect(status) {
                return Ok(response);
            }

            let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
            else {
                log::debug!("{status} without a Location header; returning it as-is");
                return Ok(response);
            };
            let target = response
                .url()
                .join(&location)
                .map_err(|e| SdError::InvalidRedirect(format!("{location}: {e}")))?;

            let Some(mut next) = template else {
                log::warn!("Cannot replay request body for redirect to {target}; returning {status}");
                return Ok(response);
            };
            if hop == MAX_REDIRECTS {
                return Err(SdError::TooManyRedirects(MAX_REDIRECTS));
            }

            match token {
                Some(value) => {
                    log::debug!("Preserving token across redirect {} -> {}", response.url(), target);
                    next.headers_mut().insert(TOKEN_HEADER, value);
                }
                None => log::warn!(
                    "Redirect from {} to {} with no token to preserve",
                    response.url(),
                    target
                ),
            }
            *next.url_mut() = target;
            request = next;
        }
        Err(SdError::TooManyRedirects(MAX_REDIRECTS))
    }

    /// Send a JSON request to `endpoint` (relative to the base URL) and
    /// decode the reply. With `auth_required`, fails with
    /// [`SdError::NotAuthenticated`] when no token can be obtained.
    /// Without it no refresh is attempted, but a held token is still sent.
    /// Use [`AuthTransport::send`] with [`TokenAuth::Exempt`] to send bare.
    pub async fn send_request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&serde_json::Value>,
        auth_required: bool,
    ) -> Result<T, SdError> {
        if auth_required && !self.validate_token(false).await {
            return Err(SdError::NotAuthenticated);
        }

        let mut builder = self.http.request(method, self.endpoint_url(endpoint)?);
        if let Some(body) = payload {
            builder = builder.json(body);
        }
        // A held token still rides along on calls that do not require one.
        let response = self.send(builder.build()?, TokenAuth::Inject).await?;

        let status = response.status();
        let text = response.text().await?;

        // The service reports failures in an envelope, sometimes with 200.
        if let Ok(envelope) = serde_json::from_str::<ApiErrorResponse>(&text) {
            if envelope.code != 0 {
                let err = SdError::api(envelope.code, envelope.describe());
                self.note_error(&err);
                return Err(err);
            }
        }
        if !status.is_success() {
            let err = SdError::Status {
                status: status.as_u16(),
                message: snippet(&text),
            };
            self.note_error(&err);
            return Err(err);
        }

        serde_json::from_str(&text).map_err(|e| {
            log::debug!("Failed to decode {endpoint} response: {}", snippet(&text));
            SdError::Json(e)
        })
    }

    fn note_error(&self, err: &SdError) {
        if err.is_token_rejection() {
            log::warn!("Schedules Direct rejected the token: {err}");
            self.clear_token();
        }
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url, SdError> {
        self.base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| SdError::InvalidUrl(format!("{endpoint}: {e}")))
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// First 200 characters of a body, for error messages.
fn snippet(text: &str) -> String {
    text.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let t = AuthTransport::new("http://127.0.0.1:1/20141201", None).unwrap();
        assert_eq!(t.base_url().as_str(), "http://127.0.0.1:1/20141201/");
        assert_eq!(
            t.endpoint_url("/metadata/programs/").unwrap().as_str(),
            "http://127.0.0.1:1/20141201/metadata/programs/"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            AuthTransport::new("not a url", None),
            Err(SdError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_good_token_ages_out() {
        let t = AuthTransport::new(DEFAULT_BASE_URL, None).unwrap();
        assert!(!t.good_token());
        assert!(!t.is_ready());

        t.token_store().set("abc", Utc::now() - chrono::Duration::hours(1));
        assert!(t.good_token());
        assert!(t.is_ready());

        t.token_store().set("abc", Utc::now() - chrono::Duration::hours(24));
        assert!(!t.good_token());

        t.clear_token();
        assert!(t.token().is_none());
    }

    #[test]
    fn test_redirect_statuses() {
        for code in [301, 302, 303, 307, 308] {
            assert!(is_redirect(StatusCode::from_u16(code).unwrap()));
        }
        assert!(!is_redirect(StatusCode::OK));
        assert!(!is_redirect(StatusCode::NOT_MODIFIED));
    }

    #[tokio::test]
    async fn test_refresh_without_credentials_leaves_store_empty() {
        let t = AuthTransport::new("http://127.0.0.1:1/", None).unwrap();
        assert!(!t.refresh_token().await);
        assert!(t.token().is_none());
    }

    #[tokio::test]
    async fn test_fresh_token_validates_without_network() {
        // Port 1 is never listening; any network call would fail.
        let t = AuthTransport::new("http://127.0.0.1:1/", None).unwrap();
        t.token_store().set("abc", Utc::now());
        assert!(t.validate_token(false).await);
        assert_eq!(t.token().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_auth_required_without_token_fails_fast() {
        let t = AuthTransport::new("http://127.0.0.1:1/", None).unwrap();
        let result: Result<serde_json::Value, _> =
            t.send_request(Method::GET, "status", None, true).await;
        assert!(matches!(result, Err(SdError::NotAuthenticated)));
    }
}
