use crate::core::mapping::{FieldKind, FieldSpec, Mapped};
use crate::core::request::{path_segment, MediaType};
use crate::core::service::{ServiceContext, WatsonService};
use crate::domain::ports::AuthenticationStrategy;
use crate::utils::error::Result;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_URL: &str = "https://gateway.watsonplatform.net/conversation/api";
pub const DEFAULT_VERSION: &str = "2016-07-11";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Intent {
    pub intent: String,
    pub confidence: f64,
}

const INTENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("intent", "intent", FieldKind::String),
    FieldSpec::required("confidence", "confidence", FieldKind::Float),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Entity {
    pub entity: String,
    pub value: Option<String>,
    /// Character offsets `[start, end)` of the mention in the input text.
    pub location: Option<Vec<i64>>,
}

const ENTITY_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("entity", "entity", FieldKind::String),
    FieldSpec::optional("value", "value", FieldKind::String),
    FieldSpec::optional("location", "location", FieldKind::Any),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutputData {
    pub text: Vec<String>,
    pub nodes_visited: Option<Vec<String>>,
    pub log_messages: Option<Value>,
}

const OUTPUT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("text", "text", FieldKind::StringArray),
    FieldSpec::optional("nodes_visited", "nodes_visited", FieldKind::StringArray),
    FieldSpec::optional("log_messages", "log_messages", FieldKind::Any),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MessageResponse {
    pub input_text: Option<String>,
    pub intents: Vec<Intent>,
    pub entities: Vec<Entity>,
    pub output: OutputData,
    /// Pass back with the next message to continue the dialog.
    pub context: Option<Value>,
    pub alternate_intents: Option<bool>,
}

impl MessageResponse {
    pub fn conversation_id(&self) -> Option<&str> {
        self.context
            .as_ref()
            .and_then(|context| context.get("conversation_id"))
            .and_then(Value::as_str)
    }
}

impl Mapped for MessageResponse {
    fn schema() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::optional("input_text", "input.text", FieldKind::String),
            FieldSpec::required("intents", "intents", FieldKind::ObjectArray(INTENT_FIELDS)),
            FieldSpec::required("entities", "entities", FieldKind::ObjectArray(ENTITY_FIELDS)),
            FieldSpec::required("output", "output", FieldKind::Object(OUTPUT_FIELDS)),
            FieldSpec::optional("context", "context", FieldKind::Any),
            FieldSpec::optional("alternate_intents", "alternate_intents", FieldKind::Bool),
        ];
        FIELDS
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MessageInput {
    pub text: String,
}

/// Body of a `message` call. Echo `context` from the previous response to keep the dialog state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MessageRequest {
    pub input: MessageInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_intents: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Entity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intents: Option<Vec<Intent>>,
}

impl MessageRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            input: MessageInput { text: text.into() },
            ..Self::default()
        }
    }

    pub fn with_context(mut self, context: Option<Value>) -> Self {
        self.context = context;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Conversation {
    context: ServiceContext,
    version: String,
}

impl WatsonService for Conversation {
    fn context(&self) -> &ServiceContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut ServiceContext {
        &mut self.context
    }
}

impl Conversation {
    pub fn new(auth: Arc<dyn AuthenticationStrategy>) -> Self {
        Self {
            context: ServiceContext::new("conversation", DEFAULT_URL, auth),
            version: DEFAULT_VERSION.to_string(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub async fn message(&self, workspace_id: &str, message: &MessageRequest) -> Result<MessageResponse> {
        let request = self
            .context
            .request(
                Method::POST,
                &format!("/v1/workspaces/{}/message", path_segment(workspace_id)),
            )
            .accept(MediaType::Json)
            .query("version", &self.version)
            .json_body(message)?;

        self.context.execute(request).await?.decode()
    }
}
