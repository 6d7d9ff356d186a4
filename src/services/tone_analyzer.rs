use crate::core::mapping::{FieldKind, FieldSpec, Mapped};
use crate::core::request::MediaType;
use crate::core::service::{ServiceContext, WatsonService};
use crate::domain::ports::AuthenticationStrategy;
use crate::utils::error::Result;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub const DEFAULT_URL: &str = "https://gateway.watsonplatform.net/tone-analyzer/api";
pub const DEFAULT_VERSION: &str = "2016-05-19";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToneScore {
    pub tone_id: String,
    pub tone_name: Option<String>,
    pub score: f64,
}

const TONE_SCORE_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("tone_id", "tone_id", FieldKind::String),
    FieldSpec::optional("tone_name", "tone_name", FieldKind::String),
    FieldSpec::required("score", "score", FieldKind::Float),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToneCategory {
    pub category_id: String,
    pub category_name: Option<String>,
    pub tones: Vec<ToneScore>,
}

const TONE_CATEGORY_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("category_id", "category_id", FieldKind::String),
    FieldSpec::optional("category_name", "category_name", FieldKind::String),
    FieldSpec::required("tones", "tones", FieldKind::ObjectArray(TONE_SCORE_FIELDS)),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SentenceTone {
    pub sentence_id: Option<i64>,
    pub input_from: Option<i64>,
    pub input_to: Option<i64>,
    pub text: Option<String>,
    pub tone_categories: Option<Vec<ToneCategory>>,
}

const SENTENCE_TONE_FIELDS: &[FieldSpec] = &[
    FieldSpec::optional("sentence_id", "sentence_id", FieldKind::Int),
    FieldSpec::optional("input_from", "input_from", FieldKind::Int),
    FieldSpec::optional("input_to", "input_to", FieldKind::Int),
    FieldSpec::optional("text", "text", FieldKind::String),
    FieldSpec::optional(
        "tone_categories",
        "tone_categories",
        FieldKind::ObjectArray(TONE_CATEGORY_FIELDS),
    ),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToneAnalysis {
    /// Categories for the whole document, from `document_tone.tone_categories`.
    pub document_tone: Vec<ToneCategory>,
    pub sentences_tone: Option<Vec<SentenceTone>>,
}

impl ToneAnalysis {
    pub fn tone(&self, tone_id: &str) -> Option<&ToneScore> {
        self.document_tone
            .iter()
            .flat_map(|category| category.tones.iter())
            .find(|tone| tone.tone_id == tone_id)
    }
}

impl Mapped for ToneAnalysis {
    fn schema() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::required(
                "document_tone",
                "document_tone.tone_categories",
                FieldKind::ObjectArray(TONE_CATEGORY_FIELDS),
            ),
            FieldSpec::optional(
                "sentences_tone",
                "sentences_tone",
                FieldKind::ObjectArray(SENTENCE_TONE_FIELDS),
            ),
        ];
        FIELDS
    }
}

/// Optional request parameters for [`ToneAnalyzer::get_tone`].
#[derive(Debug, Clone, Default)]
pub struct ToneOptions {
    /// Restrict to `emotion`, `language` and/or `social`.
    pub tones: Vec<String>,
    /// Whether to analyse each sentence. The service defaults to true.
    pub sentences: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ToneAnalyzer {
    context: ServiceContext,
    version: String,
}

impl WatsonService for ToneAnalyzer {
    fn context(&self) -> &ServiceContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut ServiceContext {
        &mut self.context
    }
}

impl ToneAnalyzer {
    pub fn new(auth: Arc<dyn AuthenticationStrategy>) -> Self {
        Self {
            context: ServiceContext::new("tone_analyzer", DEFAULT_URL, auth),
            version: DEFAULT_VERSION.to_string(),
        }
    }

    /// The release date (`YYYY-MM-DD`) of the API version to use.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub async fn get_tone(&self, text: &str, options: &ToneOptions) -> Result<ToneAnalysis> {
        let tones = (!options.tones.is_empty()).then(|| options.tones.join(","));
        let request = self
            .context
            .request(Method::POST, "/v3/tone")
            .accept(MediaType::Json)
            .query("version", &self.version)
            .query_opt("tones", tones)
            .query_opt("sentences", options.sentences)
            .json_body(&json!({ "text": text }))?;

        self.context.execute(request).await?.decode()
    }
}
