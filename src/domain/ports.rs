use crate::core::request::RestRequest;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Holds a credential for one Watson service and knows how to attach and refresh it.
#[async_trait]
pub trait AuthenticationStrategy: Send + Sync {
    /// The current token, if one has been obtained.
    fn token(&self) -> Option<String>;

    /// Obtain a fresh token. Concurrent callers share a single in-flight refresh.
    async fn refresh_token(&self) -> Result<String>;

    fn is_refreshing(&self) -> bool;

    /// How many times the gateway has replayed a request after refreshing.
    fn retries(&self) -> u32;

    fn record_retry(&self) -> u32;

    fn reset_retries(&self);

    /// Whether a refresh can cure a 401. Static credentials return false.
    fn can_refresh(&self) -> bool {
        true
    }

    /// Attach `token` to the request.
    fn apply(&self, request: RestRequest, token: &str) -> RestRequest;

    async fn authenticate(&self, request: RestRequest) -> Result<RestRequest> {
        let token = match self.token() {
            Some(token) => token,
            None => self.refresh_token().await?,
        };
        Ok(self.apply(request, &token))
    }
}
