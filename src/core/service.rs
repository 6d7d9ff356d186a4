use crate::core::gateway::{RestResponse, WatsonGateway};
use crate::core::request::RestRequest;
use crate::domain::ports::AuthenticationStrategy;
use crate::utils::error::Result;
use reqwest::Method;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{Instrument, Span};

/// State shared by every service façade: where the service lives, how to
/// authenticate against it, and the span its requests are logged under.
#[derive(Clone)]
pub struct ServiceContext {
    pub domain: &'static str,
    pub service_url: String,
    pub gateway: WatsonGateway,
    pub auth: Arc<dyn AuthenticationStrategy>,
    pub default_headers: HashMap<String, String>,
    pub span: Span,
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("domain", &self.domain)
            .field("service_url", &self.service_url)
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

impl ServiceContext {
    pub fn new(
        domain: &'static str,
        service_url: &str,
        auth: Arc<dyn AuthenticationStrategy>,
    ) -> Self {
        Self {
            domain,
            service_url: service_url.trim_end_matches('/').to_string(),
            gateway: WatsonGateway::default(),
            auth,
            default_headers: HashMap::new(),
            span: tracing::info_span!("watson", service = domain),
        }
    }

    /// A request against `service_url + endpoint` carrying the default headers.
    pub fn request(&self, method: Method, endpoint: &str) -> RestRequest {
        RestRequest::new(method, &self.service_url, endpoint).headers(&self.default_headers)
    }

    pub async fn execute(&self, request: RestRequest) -> Result<RestResponse> {
        self.gateway
            .execute(request, self.auth.as_ref(), self.domain)
            .instrument(self.span.clone())
            .await
    }
}

/// Builder-style configuration shared by all façades.
pub trait WatsonService: Sized {
    fn context(&self) -> &ServiceContext;

    fn context_mut(&mut self) -> &mut ServiceContext;

    fn with_service_url(mut self, service_url: impl Into<String>) -> Self {
        let url: String = service_url.into();
        self.context_mut().service_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Sent with every request, e.g. `X-Watson-Learning-Opt-Out: true`.
    fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut()
            .default_headers
            .insert(name.into(), value.into());
        self
    }

    /// Requests made by this façade are recorded under `span`.
    fn with_span(mut self, span: Span) -> Self {
        self.context_mut().span = span;
        self
    }

    fn with_gateway(mut self, gateway: WatsonGateway) -> Self {
        self.context_mut().gateway = gateway;
        self
    }

    fn service_url(&self) -> &str {
        &self.context().service_url
    }

    fn authentication(&self) -> &Arc<dyn AuthenticationStrategy> {
        &self.context().auth
    }
}
