use crate::core::error_body::decode_error_body;
use crate::core::mapping::{self, Mapped};
use crate::core::request::RestRequest;
use crate::domain::ports::AuthenticationStrategy;
use crate::utils::error::Result;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RestResponse {
    pub fn json(&self) -> Result<Value> {
        Ok(mapping::parse_json(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn decode<T: Mapped>(&self) -> Result<T> {
        Ok(mapping::decode(&self.json()?)?)
    }

    pub fn decode_at<T: Mapped>(&self, key_path: &str) -> Result<T> {
        Ok(mapping::decode_at(&self.json()?, key_path)?)
    }

    pub fn decode_array<T: Mapped>(&self, key_path: &str) -> Result<Vec<T>> {
        Ok(mapping::decode_array(&self.json()?, key_path)?)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }
}

/// Executes authenticated requests. A 401 triggers one token refresh and one replay.
#[derive(Debug, Clone)]
pub struct WatsonGateway {
    client: Client,
    timeout: Duration,
    max_retries: u32,
    user_agent: Option<String>,
}

impl Default for WatsonGateway {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl WatsonGateway {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
            max_retries: 1,
            user_agent: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn execute(
        &self,
        request: RestRequest,
        auth: &dyn AuthenticationStrategy,
        domain: &str,
    ) -> Result<RestResponse> {
        let request = match &self.user_agent {
            Some(user_agent) => request.header("User-Agent", user_agent.clone()),
            None => request,
        };

        let mut attempts = 0;
        loop {
            let authenticated = auth.authenticate(request.clone()).await?;
            debug!("{} {}", authenticated.method, authenticated.url);

            let response = authenticated
                .into_builder(&self.client)?
                .timeout(self.timeout)
                .send()
                .await?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response.bytes().await?.to_vec();

            if (200..300).contains(&status) {
                auth.reset_retries();
                return Ok(RestResponse {
                    status,
                    headers,
                    body,
                });
            }

            // The budget is per request; the strategy's counter only reports it.
            if status == 401 && auth.can_refresh() && attempts < self.max_retries {
                attempts += 1;
                auth.record_retry();
                warn!(
                    "{} rejected the token, refreshing and retrying (attempt {})",
                    domain, attempts
                );
                if let Err(e) = auth.refresh_token().await {
                    auth.reset_retries();
                    return Err(e);
                }
                continue;
            }

            auth.reset_retries();
            let err = decode_error_body(domain, status, &body);
            error!("{}", err);
            return Err(err);
        }
    }
}
