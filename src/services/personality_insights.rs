use crate::core::mapping::{FieldKind, FieldSpec, Mapped};
use crate::core::request::MediaType;
use crate::core::service::{ServiceContext, WatsonService};
use crate::domain::ports::AuthenticationStrategy;
use crate::utils::error::Result;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub const DEFAULT_URL: &str = "https://gateway.watsonplatform.net/personality-insights/api";

/// One node of the personality tree. Big Five dimensions, needs and values
/// nest their facets as children.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Trait {
    pub id: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub percentage: Option<f64>,
    pub sampling_error: Option<f64>,
    pub raw_score: Option<f64>,
    pub raw_sampling_error: Option<f64>,
    pub children: Option<Vec<Trait>>,
}

static TRAIT_FIELDS: [FieldSpec; 8] = [
    FieldSpec::required("id", "id", FieldKind::String),
    FieldSpec::optional("name", "name", FieldKind::String),
    FieldSpec::optional("category", "category", FieldKind::String),
    FieldSpec::optional("percentage", "percentage", FieldKind::Float),
    FieldSpec::optional("sampling_error", "sampling_error", FieldKind::Float),
    FieldSpec::optional("raw_score", "raw_score", FieldKind::Float),
    FieldSpec::optional("raw_sampling_error", "raw_sampling_error", FieldKind::Float),
    FieldSpec::optional("children", "children", FieldKind::ObjectArray(&TRAIT_FIELDS)),
];

impl Mapped for Trait {
    fn schema() -> &'static [FieldSpec] {
        &TRAIT_FIELDS
    }
}

impl Trait {
    /// Depth-first search by trait id.
    pub fn find(&self, id: &str) -> Option<&Trait> {
        if self.id == id {
            return Some(self);
        }
        self.children
            .iter()
            .flatten()
            .find_map(|child| child.find(id))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    pub id: Option<String>,
    pub source: Option<String>,
    pub word_count: Option<i64>,
    pub word_count_message: Option<String>,
    pub processed_lang: Option<String>,
    pub tree: Trait,
}

static PROFILE_FIELDS: [FieldSpec; 6] = [
    FieldSpec::optional("id", "id", FieldKind::String),
    FieldSpec::optional("source", "source", FieldKind::String),
    FieldSpec::optional("word_count", "word_count", FieldKind::Int),
    FieldSpec::optional("word_count_message", "word_count_message", FieldKind::String),
    FieldSpec::optional("processed_lang", "processed_lang", FieldKind::String),
    FieldSpec::required("tree", "tree", FieldKind::Object(&TRAIT_FIELDS)),
];

impl Mapped for Profile {
    fn schema() -> &'static [FieldSpec] {
        &PROFILE_FIELDS
    }
}

/// A unit of input (a tweet, a post) for content-item profiling.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentItem {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "userid", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "sourceid", skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
    #[serde(rename = "contenttype", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(rename = "parentid", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward: Option<bool>,
}

impl ContentItem {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileContent {
    Text(String),
    /// Tags are stripped by the service before analysis.
    Html(String),
    ContentItems(Vec<ContentItem>),
}

#[derive(Debug, Clone, Default)]
pub struct ProfileOptions {
    /// Language of the response (`Accept-Language`).
    pub accept_language: Option<String>,
    /// Language of the content (`Content-Language`).
    pub content_language: Option<String>,
    pub include_raw: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct PersonalityInsights {
    context: ServiceContext,
}

impl WatsonService for PersonalityInsights {
    fn context(&self) -> &ServiceContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut ServiceContext {
        &mut self.context
    }
}

impl PersonalityInsights {
    pub fn new(auth: Arc<dyn AuthenticationStrategy>) -> Self {
        Self {
            context: ServiceContext::new("personality_insights", DEFAULT_URL, auth),
        }
    }

    pub async fn get_profile(
        &self,
        content: &ProfileContent,
        options: &ProfileOptions,
    ) -> Result<Profile> {
        let mut request = self
            .context
            .request(Method::POST, "/v2/profile")
            .accept(MediaType::Json)
            .query_opt("include_raw", options.include_raw);

        if let Some(language) = &options.accept_language {
            request = request.header("Accept-Language", language.clone());
        }
        if let Some(language) = &options.content_language {
            request = request.header("Content-Language", language.clone());
        }

        request = match content {
            ProfileContent::Text(text) => request.text_body(text.clone(), MediaType::PlainText),
            ProfileContent::Html(html) => request.text_body(html.clone(), MediaType::Html),
            ProfileContent::ContentItems(items) => {
                request.json_body(&json!({ "contentItems": items }))?
            }
        };

        self.context.execute(request).await?.decode()
    }
}
