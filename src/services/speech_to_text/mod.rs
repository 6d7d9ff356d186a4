//! Speech to Text: model listing, one-shot recognition over HTTP, and
//! streaming recognition over a websocket.

mod models;
mod session;

pub use models::{
    transcript, Alternative, RecognitionSettings, ServerMessage, SpeechModel,
    SpeechRecognitionResult, SpeechRecognitionResults,
};
pub use session::RecognizeSession;

use crate::core::request::{path_segment, MediaType};
use crate::core::service::{ServiceContext, WatsonService};
use crate::domain::ports::AuthenticationStrategy;
use crate::utils::error::{Result, WatsonError};
use reqwest::Method;
use std::sync::Arc;
use tracing::{warn, Instrument};

pub const DEFAULT_URL: &str = "https://stream.watsonplatform.net/speech-to-text/api";
pub const DEFAULT_MODEL: &str = "en-US_BroadbandModel";

#[derive(Debug, Clone)]
pub struct SpeechToText {
    context: ServiceContext,
}

impl WatsonService for SpeechToText {
    fn context(&self) -> &ServiceContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut ServiceContext {
        &mut self.context
    }
}

impl SpeechToText {
    pub fn new(auth: Arc<dyn AuthenticationStrategy>) -> Self {
        Self {
            context: ServiceContext::new("speech_to_text", DEFAULT_URL, auth),
        }
    }

    pub async fn get_models(&self) -> Result<Vec<SpeechModel>> {
        let request = self
            .context
            .request(Method::GET, "/v1/models")
            .accept(MediaType::Json);

        self.context.execute(request).await?.decode_array("models")
    }

    pub async fn get_model(&self, model_id: &str) -> Result<SpeechModel> {
        let request = self
            .context
            .request(Method::GET, &format!("/v1/models/{}", path_segment(model_id)))
            .accept(MediaType::Json);

        self.context.execute(request).await?.decode()
    }

    /// Transcribes a complete audio file in one request.
    pub async fn recognize(
        &self,
        audio: Vec<u8>,
        settings: &RecognitionSettings,
        model: Option<&str>,
    ) -> Result<SpeechRecognitionResults> {
        let mut request = self
            .context
            .request(Method::POST, "/v1/recognize")
            .accept(MediaType::Json)
            .query("model", model.unwrap_or(DEFAULT_MODEL));
        for (name, value) in settings.query_pairs()? {
            request = request.query(name, value);
        }
        let request = request.bytes_body(audio, MediaType::Other(settings.content_type.clone()));

        self.context.execute(request).await?.decode()
    }

    /// Opens a streaming session. The socket handshake carries the same
    /// credentials a REST call would.
    pub async fn recognize_stream(
        &self,
        settings: &RecognitionSettings,
        model: Option<&str>,
    ) -> Result<RecognizeSession> {
        let request = self
            .context
            .request(Method::GET, "/v1/recognize")
            .query("model", model.unwrap_or(DEFAULT_MODEL));
        let auth = &self.context.auth;
        let authenticated = auth.authenticate(request.clone()).await?;

        match RecognizeSession::open(&authenticated, settings)
            .instrument(self.context.span.clone())
            .await
        {
            // A rejected upgrade gets one token refresh and one reconnect.
            Err(err @ WatsonError::WebSocket(_)) if err.code() == Some(401) && auth.can_refresh() => {
                warn!("speech_to_text rejected the socket handshake, refreshing the token");
                auth.refresh_token().await?;
                let authenticated = auth.authenticate(request).await?;
                RecognizeSession::open(&authenticated, settings)
                    .instrument(self.context.span.clone())
                    .await
            }
            outcome => outcome,
        }
    }
}
