//! Authentication strategies for Watson services.
//!
//! Every strategy keeps its token in a [`TokenState`], whose
//! [`refresh_with`](TokenState::refresh_with) makes sure only one refresh is in
//! flight at a time: callers that arrive while a refresh is running wait for it
//! and receive its outcome instead of issuing their own token request.

use crate::core::error_body::decode_error_body;
use crate::core::request::{MediaType, RestRequest};
use crate::domain::ports::AuthenticationStrategy;
use crate::utils::error::{Result, WatsonError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, Method};
use serde::Deserialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

pub const DEFAULT_IAM_URL: &str = "https://iam.bluemix.net/identity/token";

/// Header carrying tokens obtained through the Watson token endpoint.
pub const WATSON_TOKEN_HEADER: &str = "X-Watson-Authorization-Token";

type SharedOutcome = std::result::Result<String, (Option<u16>, String)>;

/// Token cache with single-flight refresh and the retry counter used by the gateway.
#[derive(Debug, Default)]
pub struct TokenState {
    token: RwLock<Option<String>>,
    refreshing: AtomicBool,
    retries: AtomicU32,
    generation: AtomicU64,
    flight: tokio::sync::Mutex<Option<SharedOutcome>>,
}

struct RefreshingFlag<'a>(&'a AtomicBool);

impl<'a> RefreshingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RefreshingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl TokenState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let state = Self::default();
        state.set_token(Some(token.into()));
        state
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_token(&self, token: Option<String>) {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = token;
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    pub fn retries(&self) -> u32 {
        self.retries.load(Ordering::SeqCst)
    }

    pub fn record_retry(&self) -> u32 {
        self.retries.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn reset_retries(&self) {
        self.retries.store(0, Ordering::SeqCst);
    }

    /// Runs `fetch` unless another refresh completed while this caller was waiting,
    /// in which case that refresh's outcome is returned.
    ///
    /// A failed fetch clears the cached token.
    pub async fn refresh_with<F, Fut>(&self, fetch: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let observed = self.generation.load(Ordering::Acquire);
        let mut flight = self.flight.lock().await;

        if self.generation.load(Ordering::Acquire) != observed {
            debug!("Joining token refresh completed by another caller");
            return match flight.as_ref() {
                Some(Ok(token)) => Ok(token.clone()),
                Some(Err((code, message))) => Err(WatsonError::authentication(*code, message.clone())),
                None => Err(WatsonError::authentication(None, "token refresh outcome unavailable")),
            };
        }

        let outcome = {
            let _flag = RefreshingFlag::raise(&self.refreshing);
            fetch().await
        };

        match &outcome {
            Ok(token) => self.set_token(Some(token.clone())),
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                self.set_token(None);
            }
        }
        *flight = Some(match &outcome {
            Ok(token) => Ok(token.clone()),
            Err(e) => Err((e.code(), e.to_string())),
        });
        self.generation.fetch_add(1, Ordering::Release);

        outcome
    }
}

fn token_endpoint_failure(status: u16, body: &[u8]) -> WatsonError {
    match decode_error_body("authentication", status, body) {
        WatsonError::Service { message, .. } => WatsonError::authentication(Some(status), message),
        _ => WatsonError::authentication(
            Some(status),
            format!("token endpoint rejected the credentials ({})", status),
        ),
    }
}

async fn send_token_request(client: &Client, request: RestRequest) -> Result<Vec<u8>> {
    let response = request.into_builder(client)?.send().await?;
    let status = response.status();
    let body = response.bytes().await?.to_vec();
    if !status.is_success() {
        return Err(token_endpoint_failure(status.as_u16(), &body));
    }
    Ok(body)
}

/// For services that need no credential.
#[derive(Debug, Default)]
pub struct NoAuthentication {
    state: TokenState,
}

impl NoAuthentication {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthenticationStrategy for NoAuthentication {
    fn token(&self) -> Option<String> {
        None
    }

    async fn refresh_token(&self) -> Result<String> {
        Ok(String::new())
    }

    fn is_refreshing(&self) -> bool {
        false
    }

    fn retries(&self) -> u32 {
        self.state.retries()
    }

    fn record_retry(&self) -> u32 {
        self.state.record_retry()
    }

    fn reset_retries(&self) {
        self.state.reset_retries()
    }

    fn can_refresh(&self) -> bool {
        false
    }

    fn apply(&self, request: RestRequest, _token: &str) -> RestRequest {
        request
    }

    async fn authenticate(&self, request: RestRequest) -> Result<RestRequest> {
        Ok(request)
    }
}

#[derive(Debug, Clone)]
struct TokenExchange {
    token_url: String,
    service_url: String,
}

/// HTTP basic authentication, either sent directly or exchanged for a Watson token.
#[derive(Debug)]
pub struct BasicAuthentication {
    username: String,
    password: String,
    exchange: Option<TokenExchange>,
    client: Client,
    state: TokenState,
}

impl BasicAuthentication {
    /// Sends `Authorization: Basic ...` with every request.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        let username = username.into();
        let password = password.into();
        let state = TokenState::with_token(Self::encode(&username, &password));
        Self {
            username,
            password,
            exchange: None,
            client: Client::new(),
            state,
        }
    }

    /// Exchanges the credentials for a token at `GET {token_url}?url={service_url}`.
    pub fn with_token_url(
        username: impl Into<String>,
        password: impl Into<String>,
        token_url: impl Into<String>,
        service_url: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            exchange: Some(TokenExchange {
                token_url: token_url.into(),
                service_url: service_url.into(),
            }),
            client: Client::new(),
            state: TokenState::new(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn encode(username: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
    }

    async fn exchange_token(&self, exchange: &TokenExchange) -> Result<String> {
        info!("Requesting Watson token from {}", exchange.token_url);
        let request = RestRequest::new(Method::GET, &exchange.token_url, "")
            .query("url", &exchange.service_url)
            .header("Authorization", Self::encode(&self.username, &self.password));

        let body = send_token_request(&self.client, request).await?;
        let token = String::from_utf8_lossy(&body).trim().to_string();
        if token.is_empty() {
            return Err(WatsonError::authentication(
                None,
                "token endpoint returned an empty body",
            ));
        }
        Ok(token)
    }
}

#[async_trait]
impl AuthenticationStrategy for BasicAuthentication {
    fn token(&self) -> Option<String> {
        self.state.token()
    }

    async fn refresh_token(&self) -> Result<String> {
        match &self.exchange {
            Some(exchange) => {
                self.state
                    .refresh_with(|| self.exchange_token(exchange))
                    .await
            }
            None => {
                let credential = Self::encode(&self.username, &self.password);
                self.state.set_token(Some(credential.clone()));
                Ok(credential)
            }
        }
    }

    fn is_refreshing(&self) -> bool {
        self.state.is_refreshing()
    }

    fn retries(&self) -> u32 {
        self.state.retries()
    }

    fn record_retry(&self) -> u32 {
        self.state.record_retry()
    }

    fn reset_retries(&self) {
        self.state.reset_retries()
    }

    fn can_refresh(&self) -> bool {
        self.exchange.is_some()
    }

    fn apply(&self, request: RestRequest, token: &str) -> RestRequest {
        match self.exchange {
            Some(_) => request.header(WATSON_TOKEN_HEADER, token),
            None => request.header("Authorization", token),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyLocation {
    #[default]
    Header,
    Query,
}

/// A static API key, sent as a header or a query parameter.
#[derive(Debug)]
pub struct ApiKeyAuthentication {
    name: String,
    key: String,
    location: KeyLocation,
    state: TokenState,
}

impl ApiKeyAuthentication {
    pub fn new(name: impl Into<String>, key: impl Into<String>, location: KeyLocation) -> Self {
        let key = key.into();
        Self {
            name: name.into(),
            state: TokenState::with_token(key.clone()),
            key,
            location,
        }
    }

    /// AlchemyAPI and Visual Recognition v3 style `?api_key=...` / `?apikey=...`.
    pub fn query(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(name, key, KeyLocation::Query)
    }

    pub fn header(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(name, key, KeyLocation::Header)
    }
}

#[async_trait]
impl AuthenticationStrategy for ApiKeyAuthentication {
    fn token(&self) -> Option<String> {
        Some(self.key.clone())
    }

    async fn refresh_token(&self) -> Result<String> {
        Ok(self.key.clone())
    }

    fn is_refreshing(&self) -> bool {
        false
    }

    fn retries(&self) -> u32 {
        self.state.retries()
    }

    fn record_retry(&self) -> u32 {
        self.state.record_retry()
    }

    fn reset_retries(&self) {
        self.state.reset_retries()
    }

    fn can_refresh(&self) -> bool {
        false
    }

    fn apply(&self, request: RestRequest, token: &str) -> RestRequest {
        match self.location {
            KeyLocation::Header => request.header(self.name.clone(), token),
            KeyLocation::Query => request.query(self.name.clone(), token),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExchangedToken {
    token: String,
}

/// Exchanges a third-party OAuth token (e.g. Facebook) for a Watson token.
#[derive(Debug)]
pub struct TokenExchangeAuthentication {
    token_url: String,
    external_token: String,
    client: Client,
    state: TokenState,
}

impl TokenExchangeAuthentication {
    pub fn new(token_url: impl Into<String>, external_token: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
            external_token: external_token.into(),
            client: Client::new(),
            state: TokenState::new(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    async fn exchange(&self) -> Result<String> {
        info!("Exchanging external token at {}", self.token_url);
        let request = RestRequest::new(Method::POST, &self.token_url, "")
            .accept(MediaType::Json)
            .form_body(&[("access_token", self.external_token.as_str())]);

        let body = send_token_request(&self.client, request).await?;
        let token = match serde_json::from_slice::<ExchangedToken>(&body) {
            Ok(parsed) => parsed.token,
            Err(_) => String::from_utf8_lossy(&body).trim().to_string(),
        };
        if token.is_empty() {
            return Err(WatsonError::authentication(
                None,
                "token endpoint returned an empty token",
            ));
        }
        Ok(token)
    }
}

#[async_trait]
impl AuthenticationStrategy for TokenExchangeAuthentication {
    fn token(&self) -> Option<String> {
        self.state.token()
    }

    async fn refresh_token(&self) -> Result<String> {
        self.state.refresh_with(|| self.exchange()).await
    }

    fn is_refreshing(&self) -> bool {
        self.state.is_refreshing()
    }

    fn retries(&self) -> u32 {
        self.state.retries()
    }

    fn record_retry(&self) -> u32 {
        self.state.record_retry()
    }

    fn reset_retries(&self) {
        self.state.reset_retries()
    }

    fn apply(&self, request: RestRequest, token: &str) -> RestRequest {
        request.header(WATSON_TOKEN_HEADER, token)
    }
}

/// Access/refresh token pair issued by IAM.
#[derive(Debug, Clone, Deserialize)]
pub struct IamToken {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds.
    pub expires_in: i64,
    /// Unix timestamp at which the access token expires.
    pub expiration: i64,
}

const IAM_REFRESH_BUFFER: f64 = 0.8;
const IAM_REFRESH_TOKEN_LIFETIME_SECS: i64 = 7 * 24 * 60 * 60;

impl IamToken {
    /// True once 80% of the access token's lifetime has elapsed.
    pub fn needs_refresh(&self, now: i64) -> bool {
        let refresh_at =
            self.expiration as f64 - (1.0 - IAM_REFRESH_BUFFER) * self.expires_in as f64;
        now as f64 >= refresh_at
    }

    /// The refresh token stays valid for seven days past the access token's expiration.
    pub fn refresh_token_expired(&self, now: i64) -> bool {
        now >= self.expiration + IAM_REFRESH_TOKEN_LIFETIME_SECS
    }
}

/// IAM API key authentication. Access tokens are requested and refreshed automatically.
#[derive(Debug)]
pub struct IamAuthentication {
    api_key: String,
    url: String,
    client: Client,
    current: Mutex<Option<IamToken>>,
    state: TokenState,
}

impl IamAuthentication {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_url(api_key, DEFAULT_IAM_URL)
    }

    pub fn with_url(api_key: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            url: url.into(),
            client: Client::new(),
            current: Mutex::new(None),
            state: TokenState::new(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn current(&self) -> Option<IamToken> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn store(&self, token: Option<IamToken>) {
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = token;
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<IamToken> {
        let request = RestRequest::new(Method::POST, &self.url, "")
            .accept(MediaType::Json)
            .header("Authorization", BasicAuthentication::encode("bx", "bx"))
            .form_body(form);

        let body = send_token_request(&self.client, request).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn fetch(&self) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let token = match self.current() {
            Some(existing) if !existing.refresh_token_expired(now) => {
                info!("Refreshing IAM access token");
                self.request_token(&[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", existing.refresh_token.as_str()),
                ])
                .await?
            }
            _ => {
                info!("Requesting IAM access token from {}", self.url);
                self.request_token(&[
                    ("grant_type", "urn:ibm:params:oauth:grant-type:apikey"),
                    ("apikey", self.api_key.as_str()),
                    ("response_type", "cloud_iam"),
                ])
                .await?
            }
        };
        let access_token = token.access_token.clone();
        self.store(Some(token));
        Ok(access_token)
    }
}

#[async_trait]
impl AuthenticationStrategy for IamAuthentication {
    /// `None` once the access token is due for refresh, so the next request refreshes first.
    fn token(&self) -> Option<String> {
        let now = chrono::Utc::now().timestamp();
        match self.current() {
            Some(token) if !token.needs_refresh(now) => self.state.token(),
            _ => None,
        }
    }

    async fn refresh_token(&self) -> Result<String> {
        let outcome = self.state.refresh_with(|| self.fetch()).await;
        if outcome.is_err() {
            self.store(None);
        }
        outcome
    }

    fn is_refreshing(&self) -> bool {
        self.state.is_refreshing()
    }

    fn retries(&self) -> u32 {
        self.state.retries()
    }

    fn record_retry(&self) -> u32 {
        self.state.record_retry()
    }

    fn reset_retries(&self) {
        self.state.reset_retries()
    }

    fn apply(&self, request: RestRequest, token: &str) -> RestRequest {
        request.header("Authorization", format!("Bearer {}", token))
    }
}

/// A caller-managed IAM access token.
#[derive(Debug)]
pub struct IamAccessToken {
    state: TokenState,
}

impl IamAccessToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            state: TokenState::with_token(access_token),
        }
    }

    /// Replace the token once the caller has obtained a new one.
    pub fn update(&self, access_token: impl Into<String>) {
        self.state.set_token(Some(access_token.into()));
    }
}

#[async_trait]
impl AuthenticationStrategy for IamAccessToken {
    fn token(&self) -> Option<String> {
        self.state.token()
    }

    async fn refresh_token(&self) -> Result<String> {
        self.state.token().ok_or_else(|| {
            WatsonError::authentication(None, "no IAM access token has been provided")
        })
    }

    fn is_refreshing(&self) -> bool {
        false
    }

    fn retries(&self) -> u32 {
        self.state.retries()
    }

    fn record_retry(&self) -> u32 {
        self.state.record_retry()
    }

    fn reset_retries(&self) {
        self.state.reset_retries()
    }

    fn can_refresh(&self) -> bool {
        false
    }

    fn apply(&self, request: RestRequest, token: &str) -> RestRequest {
        request.header("Authorization", format!("Bearer {}", token))
    }
}
