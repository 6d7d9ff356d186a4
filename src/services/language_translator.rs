use crate::core::mapping::{FieldKind, FieldSpec, Mapped};
use crate::core::request::{path_segment, MediaType, MultipartPart};
use crate::core::service::{ServiceContext, WatsonService};
use crate::domain::ports::AuthenticationStrategy;
use crate::utils::error::Result;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_URL: &str = "https://gateway.watsonplatform.net/language-translator/api";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TranslationModel {
    pub model_id: String,
    pub name: Option<String>,
    pub source: Option<String>,
    pub target: Option<String>,
    pub base_model_id: Option<String>,
    pub domain: Option<String>,
    pub customizable: Option<bool>,
    pub default_model: Option<bool>,
    pub owner: Option<String>,
    /// `available`, `training` or `error`.
    pub status: Option<String>,
}

impl Mapped for TranslationModel {
    fn schema() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::required("model_id", "model_id", FieldKind::String),
            FieldSpec::optional("name", "name", FieldKind::String),
            FieldSpec::optional("source", "source", FieldKind::String),
            FieldSpec::optional("target", "target", FieldKind::String),
            FieldSpec::optional("base_model_id", "base_model_id", FieldKind::String),
            FieldSpec::optional("domain", "domain", FieldKind::String),
            FieldSpec::optional("customizable", "customizable", FieldKind::Bool),
            FieldSpec::optional("default_model", "default_model", FieldKind::Bool),
            FieldSpec::optional("owner", "owner", FieldKind::String),
            FieldSpec::optional("status", "status", FieldKind::String),
        ];
        FIELDS
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Translation {
    pub translation: String,
}

const TRANSLATION_FIELDS: &[FieldSpec] =
    &[FieldSpec::required("translation", "translation", FieldKind::String)];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TranslateResponse {
    pub word_count: Option<i64>,
    pub character_count: Option<i64>,
    pub translations: Vec<Translation>,
}

impl TranslateResponse {
    pub fn translation_strings(&self) -> Vec<String> {
        self.translations
            .iter()
            .map(|t| t.translation.clone())
            .collect()
    }
}

impl Mapped for TranslateResponse {
    fn schema() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::optional("word_count", "word_count", FieldKind::Int),
            FieldSpec::optional("character_count", "character_count", FieldKind::Int),
            FieldSpec::required(
                "translations",
                "translations",
                FieldKind::ObjectArray(TRANSLATION_FIELDS),
            ),
        ];
        FIELDS
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IdentifiableLanguage {
    pub language: String,
    pub name: Option<String>,
}

impl Mapped for IdentifiableLanguage {
    fn schema() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::required("language", "language", FieldKind::String),
            FieldSpec::optional("name", "name", FieldKind::String),
        ];
        FIELDS
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IdentifiedLanguage {
    pub language: String,
    pub confidence: Option<f64>,
}

impl Mapped for IdentifiedLanguage {
    fn schema() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::required("language", "language", FieldKind::String),
            FieldSpec::optional("confidence", "confidence", FieldKind::Float),
        ];
        FIELDS
    }
}

#[derive(Debug, Clone, Serialize)]
struct TranslateRequest<'a> {
    text: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    model_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a str>,
}

/// What to translate with: an explicit model, or a source/target pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslateWith {
    Model(String),
    Languages { source: String, target: String },
}

impl TranslateWith {
    pub fn languages(source: impl Into<String>, target: impl Into<String>) -> Self {
        TranslateWith::Languages {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelFilter {
    pub source: Option<String>,
    pub target: Option<String>,
    pub default_models_only: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CreatedModel {
    model_id: String,
}

impl Mapped for CreatedModel {
    fn schema() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[FieldSpec::required("model_id", "model_id", FieldKind::String)];
        FIELDS
    }
}

#[derive(Debug, Clone)]
pub struct LanguageTranslator {
    context: ServiceContext,
}

impl WatsonService for LanguageTranslator {
    fn context(&self) -> &ServiceContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut ServiceContext {
        &mut self.context
    }
}

impl LanguageTranslator {
    pub fn new(auth: Arc<dyn AuthenticationStrategy>) -> Self {
        Self {
            context: ServiceContext::new("language_translator", DEFAULT_URL, auth),
        }
    }

    pub async fn get_models(&self, filter: &ModelFilter) -> Result<Vec<TranslationModel>> {
        let request = self
            .context
            .request(Method::GET, "/v2/models")
            .accept(MediaType::Json)
            .query_opt("source", filter.source.as_deref())
            .query_opt("target", filter.target.as_deref())
            .query_opt("default", filter.default_models_only);

        self.context.execute(request).await?.decode_array("models")
    }

    pub async fn get_model(&self, model_id: &str) -> Result<TranslationModel> {
        let request = self
            .context
            .request(Method::GET, &format!("/v2/models/{}", path_segment(model_id)))
            .accept(MediaType::Json);

        self.context.execute(request).await?.decode()
    }

    /// Trains a custom model from a TMX forced glossary and returns its id.
    pub async fn create_model(
        &self,
        base_model_id: &str,
        name: Option<&str>,
        forced_glossary: Vec<u8>,
    ) -> Result<String> {
        let request = self
            .context
            .request(Method::POST, "/v2/models")
            .accept(MediaType::Json)
            .query("base_model_id", base_model_id)
            .query_opt("name", name)
            .multipart_body(vec![MultipartPart::file(
                "forced_glossary",
                "glossary.tmx",
                MediaType::OctetStream,
                forced_glossary,
            )]);

        let created: CreatedModel = self.context.execute(request).await?.decode()?;
        Ok(created.model_id)
    }

    pub async fn delete_model(&self, model_id: &str) -> Result<()> {
        let request = self
            .context
            .request(Method::DELETE, &format!("/v2/models/{}", path_segment(model_id)))
            .accept(MediaType::Json);

        self.context.execute(request).await?;
        Ok(())
    }

    pub async fn translate(&self, text: &[String], with: &TranslateWith) -> Result<TranslateResponse> {
        let body = match with {
            TranslateWith::Model(model_id) => TranslateRequest {
                text,
                model_id: Some(model_id.as_str()),
                source: None,
                target: None,
            },
            TranslateWith::Languages { source, target } => TranslateRequest {
                text,
                model_id: None,
                source: Some(source.as_str()),
                target: Some(target.as_str()),
            },
        };

        let request = self
            .context
            .request(Method::POST, "/v2/translate")
            .accept(MediaType::Json)
            .json_body(&body)?;

        self.context.execute(request).await?.decode()
    }

    pub async fn get_identifiable_languages(&self) -> Result<Vec<IdentifiableLanguage>> {
        let request = self
            .context
            .request(Method::GET, "/v2/identifiable_languages")
            .accept(MediaType::Json);

        self.context.execute(request).await?.decode_array("languages")
    }

    /// Candidate languages for `text`, most likely first.
    pub async fn identify(&self, text: &str) -> Result<Vec<IdentifiedLanguage>> {
        let request = self
            .context
            .request(Method::POST, "/v2/identify")
            .accept(MediaType::Json)
            .text_body(text, MediaType::PlainText);

        self.context.execute(request).await?.decode_array("languages")
    }
}
