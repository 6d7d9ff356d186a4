use crate::core::mapping::{FieldKind, FieldSpec, Mapped};
use crate::core::request::{MediaType, MultipartPart};
use crate::core::service::{ServiceContext, WatsonService};
use crate::domain::ports::AuthenticationStrategy;
use crate::utils::error::Result;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_URL: &str = "https://gateway-a.watsonplatform.net/visual-recognition/api";
pub const DEFAULT_VERSION: &str = "2016-05-20";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClassResult {
    pub class_name: String,
    pub score: f64,
    pub type_hierarchy: Option<String>,
}

const CLASS_RESULT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("class_name", "class", FieldKind::String),
    FieldSpec::required("score", "score", FieldKind::Float).lenient(),
    FieldSpec::optional("type_hierarchy", "type_hierarchy", FieldKind::String),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClassifierResult {
    pub name: String,
    pub classifier_id: Option<String>,
    pub classes: Vec<ClassResult>,
}

const CLASSIFIER_RESULT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", "name", FieldKind::String),
    FieldSpec::optional("classifier_id", "classifier_id", FieldKind::String),
    FieldSpec::required("classes", "classes", FieldKind::ObjectArray(CLASS_RESULT_FIELDS)),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClassifiedImage {
    pub source_url: Option<String>,
    pub resolved_url: Option<String>,
    pub image: Option<String>,
    /// Per-image failure reported inside an otherwise successful response.
    pub error: Option<Value>,
    pub classifiers: Option<Vec<ClassifierResult>>,
}

const CLASSIFIED_IMAGE_FIELDS: &[FieldSpec] = &[
    FieldSpec::optional("source_url", "source_url", FieldKind::String),
    FieldSpec::optional("resolved_url", "resolved_url", FieldKind::String),
    FieldSpec::optional("image", "image", FieldKind::String),
    FieldSpec::optional("error", "error", FieldKind::Any),
    FieldSpec::optional(
        "classifiers",
        "classifiers",
        FieldKind::ObjectArray(CLASSIFIER_RESULT_FIELDS),
    ),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClassifiedImages {
    pub images_processed: Option<i64>,
    pub images: Vec<ClassifiedImage>,
    pub warnings: Option<Value>,
}

impl Mapped for ClassifiedImages {
    fn schema() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::optional("images_processed", "images_processed", FieldKind::Int),
            FieldSpec::required(
                "images",
                "images",
                FieldKind::ObjectArray(CLASSIFIED_IMAGE_FIELDS),
            ),
            FieldSpec::optional("warnings", "warnings", FieldKind::Any),
        ];
        FIELDS
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FaceAge {
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub score: Option<f64>,
}

const AGE_FIELDS: &[FieldSpec] = &[
    FieldSpec::optional("min", "min", FieldKind::Int),
    FieldSpec::optional("max", "max", FieldKind::Int),
    FieldSpec::optional("score", "score", FieldKind::Float).lenient(),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FaceGender {
    pub gender: String,
    pub score: Option<f64>,
}

const GENDER_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("gender", "gender", FieldKind::String),
    FieldSpec::optional("score", "score", FieldKind::Float).lenient(),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FaceLocation {
    pub width: i64,
    pub height: i64,
    pub left: i64,
    pub top: i64,
}

const LOCATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("width", "width", FieldKind::Int),
    FieldSpec::required("height", "height", FieldKind::Int),
    FieldSpec::required("left", "left", FieldKind::Int),
    FieldSpec::required("top", "top", FieldKind::Int),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FaceIdentity {
    pub name: String,
    pub score: Option<f64>,
    pub type_hierarchy: Option<String>,
}

const IDENTITY_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", "name", FieldKind::String),
    FieldSpec::optional("score", "score", FieldKind::Float).lenient(),
    FieldSpec::optional("type_hierarchy", "type_hierarchy", FieldKind::String),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImageFace {
    pub age: Option<FaceAge>,
    pub gender: Option<FaceGender>,
    pub location: Option<FaceLocation>,
    /// Present when the face belongs to a known public figure.
    pub identity: Option<FaceIdentity>,
}

const FACE_FIELDS: &[FieldSpec] = &[
    FieldSpec::optional("age", "age", FieldKind::Object(AGE_FIELDS)),
    FieldSpec::optional("gender", "gender", FieldKind::Object(GENDER_FIELDS)),
    FieldSpec::optional("location", "face_location", FieldKind::Object(LOCATION_FIELDS)),
    FieldSpec::optional("identity", "identity", FieldKind::Object(IDENTITY_FIELDS)),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImageWithFaces {
    pub source_url: Option<String>,
    pub resolved_url: Option<String>,
    pub image: Option<String>,
    pub error: Option<Value>,
    pub faces: Vec<ImageFace>,
}

const IMAGE_WITH_FACES_FIELDS: &[FieldSpec] = &[
    FieldSpec::optional("source_url", "source_url", FieldKind::String),
    FieldSpec::optional("resolved_url", "resolved_url", FieldKind::String),
    FieldSpec::optional("image", "image", FieldKind::String),
    FieldSpec::optional("error", "error", FieldKind::Any),
    FieldSpec::required("faces", "faces", FieldKind::ObjectArray(FACE_FIELDS)),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImagesWithFaces {
    pub images_processed: Option<i64>,
    pub images: Vec<ImageWithFaces>,
}

impl Mapped for ImagesWithFaces {
    fn schema() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::optional("images_processed", "images_processed", FieldKind::Int),
            FieldSpec::required(
                "images",
                "images",
                FieldKind::ObjectArray(IMAGE_WITH_FACES_FIELDS),
            ),
        ];
        FIELDS
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClassifyOptions {
    /// Minimum score a class must have to be returned.
    pub threshold: Option<f64>,
    /// `IBM`, `me`, or both. Ignored when `classifier_ids` is set.
    pub owners: Vec<String>,
    pub classifier_ids: Vec<String>,
    pub accept_language: Option<String>,
}

impl ClassifyOptions {
    fn owners_csv(&self) -> Option<String> {
        (!self.owners.is_empty()).then(|| self.owners.join(","))
    }

    fn classifier_ids_csv(&self) -> Option<String> {
        (!self.classifier_ids.is_empty()).then(|| self.classifier_ids.join(","))
    }
}

/// Visual Recognition v3, authenticated with an `api_key` query parameter.
#[derive(Debug, Clone)]
pub struct VisualRecognition {
    context: ServiceContext,
    version: String,
}

impl WatsonService for VisualRecognition {
    fn context(&self) -> &ServiceContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut ServiceContext {
        &mut self.context
    }
}

impl VisualRecognition {
    pub fn new(auth: Arc<dyn AuthenticationStrategy>) -> Self {
        Self {
            context: ServiceContext::new("visual_recognition", DEFAULT_URL, auth),
            version: DEFAULT_VERSION.to_string(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub async fn classify_url(&self, url: &str, options: &ClassifyOptions) -> Result<ClassifiedImages> {
        let mut request = self
            .context
            .request(Method::GET, "/v3/classify")
            .accept(MediaType::Json)
            .query("version", &self.version)
            .query("url", url)
            .query_opt("threshold", options.threshold)
            .query_opt("owners", options.owners_csv())
            .query_opt("classifier_ids", options.classifier_ids_csv());
        if let Some(language) = &options.accept_language {
            request = request.header("Accept-Language", language.clone());
        }

        self.context.execute(request).await?.decode()
    }

    /// Uploads one image (or a zip of images) as `images_file`.
    pub async fn classify_image(
        &self,
        image: Vec<u8>,
        filename: &str,
        content_type: MediaType,
        options: &ClassifyOptions,
    ) -> Result<ClassifiedImages> {
        let mut parts = vec![MultipartPart::file("images_file", filename, content_type, image)];
        if let Some(threshold) = options.threshold {
            parts.push(MultipartPart::text("threshold", threshold.to_string()));
        }
        if let Some(owners) = options.owners_csv() {
            parts.push(MultipartPart::text("owners", owners));
        }
        if let Some(ids) = options.classifier_ids_csv() {
            parts.push(MultipartPart::text("classifier_ids", ids));
        }

        let mut request = self
            .context
            .request(Method::POST, "/v3/classify")
            .accept(MediaType::Json)
            .query("version", &self.version)
            .multipart_body(parts);
        if let Some(language) = &options.accept_language {
            request = request.header("Accept-Language", language.clone());
        }

        self.context.execute(request).await?.decode()
    }

    pub async fn detect_faces_url(&self, url: &str) -> Result<ImagesWithFaces> {
        let request = self
            .context
            .request(Method::GET, "/v3/detect_faces")
            .accept(MediaType::Json)
            .query("version", &self.version)
            .query("url", url);

        self.context.execute(request).await?.decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mapping::decode;
    use serde_json::json;

    #[test]
    fn test_class_keyword_maps_to_class_name() {
        let images: ClassifiedImages = decode(&json!({
            "images_processed": 1,
            "images": [{
                "source_url": "https://example.com/car.jpg",
                "classifiers": [{
                    "name": "default",
                    "classifier_id": "default",
                    "classes": [{"class": "car", "score": 0.91, "type_hierarchy": "/vehicle/car"}]
                }]
            }]
        }))
        .unwrap();

        let classes = &images.images[0].classifiers.as_ref().unwrap()[0].classes;
        assert_eq!(classes[0].class_name, "car");
        assert_eq!(classes[0].score, 0.91);
    }

    #[test]
    fn test_face_location_wire_key() {
        let faces: ImagesWithFaces = decode(&json!({
            "images": [{
                "faces": [{
                    "age": {"min": 35, "max": 44, "score": 0.44},
                    "gender": {"gender": "MALE", "score": 0.99},
                    "face_location": {"width": 92, "height": 159, "left": 256, "top": 64}
                }]
            }]
        }))
        .unwrap();

        let face = &faces.images[0].faces[0];
        assert_eq!(face.location.as_ref().map(|l| l.width), Some(92));
        assert!(face.identity.is_none());
    }
}
