use crate::core::mapping::{FieldKind, FieldSpec, Mapped};
use crate::core::request::{path_segment, MediaType, MultipartPart};
use crate::core::service::{ServiceContext, WatsonService};
use crate::domain::ports::AuthenticationStrategy;
use crate::utils::error::Result;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_URL: &str = "https://gateway.watsonplatform.net/natural-language-classifier/api";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Classifier {
    pub classifier_id: String,
    pub name: Option<String>,
    pub language: Option<String>,
    pub created: Option<String>,
    pub url: Option<String>,
    /// `Non Existent`, `Training`, `Failed`, `Available` or `Unavailable`.
    pub status: Option<String>,
    pub status_description: Option<String>,
}

impl Mapped for Classifier {
    fn schema() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::required("classifier_id", "classifier_id", FieldKind::String),
            FieldSpec::optional("name", "name", FieldKind::String),
            FieldSpec::optional("language", "language", FieldKind::String),
            FieldSpec::optional("created", "created", FieldKind::String),
            FieldSpec::optional("url", "url", FieldKind::String),
            FieldSpec::optional("status", "status", FieldKind::String),
            FieldSpec::optional("status_description", "status_description", FieldKind::String),
        ];
        FIELDS
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClassifiedClass {
    pub class_name: String,
    pub confidence: Option<f64>,
}

const CLASS_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("class_name", "class_name", FieldKind::String),
    FieldSpec::optional("confidence", "confidence", FieldKind::Float),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Classification {
    pub classifier_id: Option<String>,
    pub url: Option<String>,
    pub text: Option<String>,
    pub top_class: Option<String>,
    pub classes: Option<Vec<ClassifiedClass>>,
}

impl Mapped for Classification {
    fn schema() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::optional("classifier_id", "classifier_id", FieldKind::String),
            FieldSpec::optional("url", "url", FieldKind::String),
            FieldSpec::optional("text", "text", FieldKind::String),
            FieldSpec::optional("top_class", "top_class", FieldKind::String),
            FieldSpec::optional("classes", "classes", FieldKind::ObjectArray(CLASS_FIELDS)),
        ];
        FIELDS
    }
}

#[derive(Debug, Clone)]
pub struct NaturalLanguageClassifier {
    context: ServiceContext,
}

impl WatsonService for NaturalLanguageClassifier {
    fn context(&self) -> &ServiceContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut ServiceContext {
        &mut self.context
    }
}

impl NaturalLanguageClassifier {
    pub fn new(auth: Arc<dyn AuthenticationStrategy>) -> Self {
        Self {
            context: ServiceContext::new("natural_language_classifier", DEFAULT_URL, auth),
        }
    }

    /// Empty when the instance has no classifiers.
    pub async fn get_classifiers(&self) -> Result<Vec<Classifier>> {
        let request = self
            .context
            .request(Method::GET, "/v1/classifiers")
            .accept(MediaType::Json);

        self.context.execute(request).await?.decode_array("classifiers")
    }

    pub async fn get_classifier(&self, classifier_id: &str) -> Result<Classifier> {
        let request = self
            .context
            .request(Method::GET, &format!("/v1/classifiers/{}", path_segment(classifier_id)))
            .accept(MediaType::Json);

        self.context.execute(request).await?.decode()
    }

    /// The classifier must be `Available`. An unknown classifier yields a 404 service error.
    pub async fn classify(&self, classifier_id: &str, text: &str) -> Result<Classification> {
        let request = self
            .context
            .request(
                Method::GET,
                &format!("/v1/classifiers/{}/classify", path_segment(classifier_id)),
            )
            .accept(MediaType::Json)
            .query("text", text);

        self.context.execute(request).await?.decode()
    }

    /// `training_metadata` is JSON such as `{"language":"en","name":"..."}`;
    /// `training_data` is CSV of `text,class` rows.
    pub async fn create_classifier(
        &self,
        training_metadata: Vec<u8>,
        training_data: Vec<u8>,
    ) -> Result<Classifier> {
        let request = self
            .context
            .request(Method::POST, "/v1/classifiers")
            .accept(MediaType::Json)
            .multipart_body(vec![
                MultipartPart::file(
                    "training_metadata",
                    "training_metadata.json",
                    MediaType::Json,
                    training_metadata,
                ),
                MultipartPart::file(
                    "training_data",
                    "training_data.csv",
                    MediaType::Other("text/csv".to_string()),
                    training_data,
                ),
            ]);

        self.context.execute(request).await?.decode()
    }

    pub async fn delete_classifier(&self, classifier_id: &str) -> Result<()> {
        let request = self
            .context
            .request(Method::DELETE, &format!("/v1/classifiers/{}", path_segment(classifier_id)))
            .accept(MediaType::Json);

        self.context.execute(request).await?;
        Ok(())
    }
}
