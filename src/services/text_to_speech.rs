use crate::core::mapping::{FieldKind, FieldSpec, Mapped};
use crate::core::request::{path_segment, MediaType};
use crate::core::service::{ServiceContext, WatsonService};
use crate::domain::ports::AuthenticationStrategy;
use crate::utils::error::Result;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub const DEFAULT_URL: &str = "https://stream.watsonplatform.net/text-to-speech/api";
pub const DEFAULT_VOICE: &str = "en-US_MichaelVoice";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Voice {
    pub name: String,
    pub url: Option<String>,
    pub gender: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub customizable: Option<bool>,
}

impl Mapped for Voice {
    fn schema() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::required("name", "name", FieldKind::String),
            FieldSpec::optional("url", "url", FieldKind::String),
            FieldSpec::optional("gender", "gender", FieldKind::String),
            FieldSpec::optional("language", "language", FieldKind::String),
            FieldSpec::optional("description", "description", FieldKind::String),
            FieldSpec::optional("customizable", "customizable", FieldKind::Bool),
        ];
        FIELDS
    }
}

#[derive(Debug, Deserialize)]
struct Pronunciation {
    pronunciation: String,
}

impl Mapped for Pronunciation {
    fn schema() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] =
            &[FieldSpec::required("pronunciation", "pronunciation", FieldKind::String)];
        FIELDS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    #[default]
    Wav,
    Flac,
    OggOpus,
}

impl AudioFormat {
    pub fn media_type(self) -> MediaType {
        match self {
            AudioFormat::Wav => MediaType::Wav,
            AudioFormat::Flac => MediaType::Flac,
            AudioFormat::OggOpus => MediaType::OggOpus,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhonemeFormat {
    #[default]
    Ipa,
    Spr,
}

impl PhonemeFormat {
    fn as_str(self) -> &'static str {
        match self {
            PhonemeFormat::Ipa => "ipa",
            PhonemeFormat::Spr => "spr",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextToSpeech {
    context: ServiceContext,
}

impl WatsonService for TextToSpeech {
    fn context(&self) -> &ServiceContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut ServiceContext {
        &mut self.context
    }
}

impl TextToSpeech {
    pub fn new(auth: Arc<dyn AuthenticationStrategy>) -> Self {
        Self {
            context: ServiceContext::new("text_to_speech", DEFAULT_URL, auth),
        }
    }

    pub async fn get_voices(&self) -> Result<Vec<Voice>> {
        let request = self
            .context
            .request(Method::GET, "/v1/voices")
            .accept(MediaType::Json);

        self.context.execute(request).await?.decode_array("voices")
    }

    pub async fn get_voice(&self, voice: &str, customization_id: Option<&str>) -> Result<Voice> {
        let request = self
            .context
            .request(Method::GET, &format!("/v1/voices/{}", path_segment(voice)))
            .accept(MediaType::Json)
            .query_opt("customization_id", customization_id);

        self.context.execute(request).await?.decode()
    }

    pub async fn get_pronunciation(
        &self,
        text: &str,
        voice: Option<&str>,
        format: PhonemeFormat,
    ) -> Result<String> {
        let request = self
            .context
            .request(Method::GET, "/v1/pronunciation")
            .accept(MediaType::Json)
            .query("text", text)
            .query_opt("voice", voice)
            .query("format", format.as_str());

        let pronunciation: Pronunciation = self.context.execute(request).await?.decode()?;
        Ok(pronunciation.pronunciation)
    }

    /// Raw audio in the requested format. Decoding is left to the caller.
    pub async fn synthesize(
        &self,
        text: &str,
        voice: Option<&str>,
        format: AudioFormat,
    ) -> Result<Vec<u8>> {
        let request = self
            .context
            .request(Method::POST, "/v1/synthesize")
            .accept(format.media_type())
            .query("voice", voice.unwrap_or(DEFAULT_VOICE))
            .json_body(&json!({ "text": text }))?;

        let response = self.context.execute(request).await?;
        tracing::debug!(
            "Synthesized {} bytes ({})",
            response.body.len(),
            response.content_type().unwrap_or("unknown")
        );
        Ok(response.into_bytes())
    }
}
