use crate::core::error_body::alchemy_status_error;
use crate::core::gateway::RestResponse;
use crate::core::mapping::{self, FieldKind, FieldSpec, Mapped};
use crate::core::request::MediaType;
use crate::core::service::{ServiceContext, WatsonService};
use crate::domain::ports::AuthenticationStrategy;
use crate::utils::error::Result;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_URL: &str = "https://gateway-a.watsonplatform.net/calls";

/// AlchemyAPI returns most numbers as strings, so numeric fields here are lenient.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Sentiment {
    /// `positive`, `negative` or `neutral`.
    pub sentiment_type: Option<String>,
    pub score: Option<f64>,
    pub mixed: Option<bool>,
}

const SENTIMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::optional("sentiment_type", "type", FieldKind::String),
    FieldSpec::optional("score", "score", FieldKind::Float).lenient(),
    FieldSpec::optional("mixed", "mixed", FieldKind::Bool).lenient(),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Keyword {
    pub text: String,
    pub relevance: Option<f64>,
    pub sentiment: Option<Sentiment>,
    pub type_hierarchy: Option<String>,
}

const KEYWORD_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("text", "text", FieldKind::String),
    FieldSpec::optional("relevance", "relevance", FieldKind::Float).lenient(),
    FieldSpec::optional("sentiment", "sentiment", FieldKind::Object(SENTIMENT_FIELDS)),
    FieldSpec::optional(
        "type_hierarchy",
        "knowledgeGraph.typeHierarchy",
        FieldKind::String,
    ),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Keywords {
    pub language: Option<String>,
    pub url: Option<String>,
    pub total_transactions: Option<i64>,
    pub keywords: Vec<Keyword>,
}

impl Mapped for Keywords {
    fn schema() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::optional("language", "language", FieldKind::String),
            FieldSpec::optional("url", "url", FieldKind::String),
            FieldSpec::optional("total_transactions", "totalTransactions", FieldKind::Int).lenient(),
            FieldSpec::required("keywords", "keywords", FieldKind::ObjectArray(KEYWORD_FIELDS)),
        ];
        FIELDS
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SentimentResponse {
    pub language: Option<String>,
    pub url: Option<String>,
    pub total_transactions: Option<i64>,
    pub doc_sentiment: Sentiment,
}

impl Mapped for SentimentResponse {
    fn schema() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::optional("language", "language", FieldKind::String),
            FieldSpec::optional("url", "url", FieldKind::String),
            FieldSpec::optional("total_transactions", "totalTransactions", FieldKind::Int).lenient(),
            FieldSpec::required(
                "doc_sentiment",
                "docSentiment",
                FieldKind::Object(SENTIMENT_FIELDS),
            ),
        ];
        FIELDS
    }
}

/// Where the analysed content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlchemySource {
    Text(String),
    Html(String),
    /// The service fetches the page itself.
    Url(String),
}

impl AlchemySource {
    fn endpoint(&self, call: &str) -> String {
        match self {
            AlchemySource::Text(_) => format!("/text/Text{}", call),
            AlchemySource::Html(_) => format!("/html/HTML{}", call),
            AlchemySource::Url(_) => format!("/url/URL{}", call),
        }
    }

    fn form_field(&self) -> (&'static str, &str) {
        match self {
            AlchemySource::Text(text) => ("text", text),
            AlchemySource::Html(html) => ("html", html),
            AlchemySource::Url(url) => ("url", url),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeywordOptions {
    pub sentiment: bool,
    pub knowledge_graph: bool,
    /// `keywordExtractMode=strict` instead of `normal`.
    pub strict_mode: bool,
    pub max_retrieve: Option<u32>,
}

/// AlchemyLanguage calls. Authenticate with `ApiKeyAuthentication::query("apikey", key)`.
#[derive(Debug, Clone)]
pub struct AlchemyLanguage {
    context: ServiceContext,
}

impl WatsonService for AlchemyLanguage {
    fn context(&self) -> &ServiceContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut ServiceContext {
        &mut self.context
    }
}

impl AlchemyLanguage {
    pub fn new(auth: Arc<dyn AuthenticationStrategy>) -> Self {
        Self {
            context: ServiceContext::new("alchemy_language", DEFAULT_URL, auth),
        }
    }

    /// Alchemy reports failures with a 200 and `"status": "ERROR"`.
    fn decode_checked<T: Mapped>(&self, response: RestResponse) -> Result<T> {
        let value = response.json()?;
        if let Some(err) = alchemy_status_error(self.context.domain, &value) {
            tracing::error!("{}", err);
            return Err(err);
        }
        Ok(mapping::decode(&value)?)
    }

    pub async fn get_ranked_keywords(
        &self,
        source: &AlchemySource,
        options: &KeywordOptions,
    ) -> Result<Keywords> {
        let flag = |enabled: bool| if enabled { "1" } else { "0" };
        let request = self
            .context
            .request(Method::POST, &source.endpoint("GetRankedKeywords"))
            .accept(MediaType::Json)
            .query("outputMode", "json")
            .query("sentiment", flag(options.sentiment))
            .query("knowledgeGraph", flag(options.knowledge_graph))
            .query(
                "keywordExtractMode",
                if options.strict_mode { "strict" } else { "normal" },
            )
            .query_opt("maxRetrieve", options.max_retrieve)
            .form_body(&[source.form_field()]);

        let response = self.context.execute(request).await?;
        self.decode_checked(response)
    }

    pub async fn get_text_sentiment(&self, source: &AlchemySource) -> Result<SentimentResponse> {
        let request = self
            .context
            .request(Method::POST, &source.endpoint("GetTextSentiment"))
            .accept(MediaType::Json)
            .query("outputMode", "json")
            .form_body(&[source.form_field()]);

        let response = self.context.execute(request).await?;
        self.decode_checked(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoints_follow_source_kind() {
        assert_eq!(
            AlchemySource::Text("t".into()).endpoint("GetRankedKeywords"),
            "/text/TextGetRankedKeywords"
        );
        assert_eq!(
            AlchemySource::Url("u".into()).endpoint("GetTextSentiment"),
            "/url/URLGetTextSentiment"
        );
        assert_eq!(
            AlchemySource::Html("h".into()).endpoint("GetRankedKeywords"),
            "/html/HTMLGetRankedKeywords"
        );
    }

    #[test]
    fn test_string_encoded_scores() {
        let keywords: Keywords = mapping::decode(&json!({
            "status": "OK",
            "language": "english",
            "totalTransactions": "2",
            "keywords": [{
                "text": "IBM Watson",
                "relevance": "0.946",
                "sentiment": {"type": "positive", "score": "0.41", "mixed": "0"},
                "knowledgeGraph": {"typeHierarchy": "/companies/ibm"}
            }]
        }))
        .unwrap();

        assert_eq!(keywords.total_transactions, Some(2));
        let keyword = &keywords.keywords[0];
        assert_eq!(keyword.relevance, Some(0.946));
        assert_eq!(keyword.type_hierarchy.as_deref(), Some("/companies/ibm"));
        let sentiment = keyword.sentiment.as_ref().unwrap();
        assert_eq!(sentiment.score, Some(0.41));
        assert_eq!(sentiment.mixed, Some(false));
    }
}
