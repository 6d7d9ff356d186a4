use crate::core::mapping::{self, FieldKind, FieldSpec, Mapped};
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SpeechModel {
    pub name: String,
    /// Sampling rate in Hz.
    pub rate: Option<i64>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

impl Mapped for SpeechModel {
    fn schema() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::required("name", "name", FieldKind::String),
            FieldSpec::optional("rate", "rate", FieldKind::Int),
            FieldSpec::optional("language", "language", FieldKind::String),
            FieldSpec::optional("description", "description", FieldKind::String),
            FieldSpec::optional("url", "url", FieldKind::String),
        ];
        FIELDS
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Alternative {
    pub transcript: String,
    /// Only reported for final results.
    pub confidence: Option<f64>,
}

const ALTERNATIVE_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("transcript", "transcript", FieldKind::String),
    FieldSpec::optional("confidence", "confidence", FieldKind::Float),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SpeechRecognitionResult {
    pub is_final: bool,
    pub alternatives: Vec<Alternative>,
}

impl SpeechRecognitionResult {
    pub fn best_transcript(&self) -> Option<&str> {
        self.alternatives.first().map(|alt| alt.transcript.as_str())
    }
}

const RESULT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("is_final", "final", FieldKind::Bool),
    FieldSpec::required("alternatives", "alternatives", FieldKind::ObjectArray(ALTERNATIVE_FIELDS)),
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SpeechRecognitionResults {
    /// Position of `results[0]` in the session's transcript.
    pub result_index: i64,
    pub results: Vec<SpeechRecognitionResult>,
}

impl Mapped for SpeechRecognitionResults {
    fn schema() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::required("result_index", "result_index", FieldKind::Int),
            FieldSpec::required("results", "results", FieldKind::ObjectArray(RESULT_FIELDS)),
        ];
        FIELDS
    }
}

/// Joins the best alternative of every result into one transcript.
pub fn transcript(results: &[SpeechRecognitionResult]) -> String {
    results
        .iter()
        .filter_map(SpeechRecognitionResult::best_transcript)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parameters sent in the `start` action of a streaming session, and as query
/// parameters of a one-shot recognition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionSettings {
    #[serde(rename = "content-type")]
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interim_results: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuous: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactivity_timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_alternatives: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_confidence: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<bool>,
    #[serde(rename = "profanity_filter", skip_serializing_if = "Option::is_none")]
    pub filter_profanity: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_formatting: Option<bool>,
}

impl RecognitionSettings {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            interim_results: None,
            continuous: None,
            inactivity_timeout: None,
            max_alternatives: None,
            keywords: None,
            keywords_threshold: None,
            word_confidence: None,
            timestamps: None,
            filter_profanity: None,
            smart_formatting: None,
        }
    }

    pub fn interim_results(mut self, enabled: bool) -> Self {
        self.interim_results = Some(enabled);
        self
    }

    pub fn continuous(mut self, enabled: bool) -> Self {
        self.continuous = Some(enabled);
        self
    }

    pub(crate) fn start_message(&self) -> Result<String> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.insert("action".to_string(), Value::String("start".to_string()));
        }
        Ok(value.to_string())
    }

    /// The settings other than `content-type`, flattened to query pairs.
    pub(crate) fn query_pairs(&self) -> Result<Vec<(String, String)>> {
        let value = serde_json::to_value(self)?;
        let pairs = value
            .as_object()
            .map(|map| {
                map.iter()
                    .filter(|(key, _)| key.as_str() != "content-type")
                    .map(|(key, value)| {
                        let rendered = match value {
                            Value::String(s) => s.clone(),
                            Value::Array(items) => items
                                .iter()
                                .map(|item| match item {
                                    Value::String(s) => s.clone(),
                                    other => other.to_string(),
                                })
                                .collect::<Vec<_>>()
                                .join(","),
                            other => other.to_string(),
                        };
                        (key.clone(), rendered)
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(pairs)
    }
}

/// A text frame received from the recognition socket.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Results(SpeechRecognitionResults),
    State(String),
    Error(String),
    /// Non-fatal notices, such as unknown parameters in the `start` action.
    Warnings(Vec<String>),
    /// Anything else the service sends; the session ignores it.
    Other(Value),
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        if value.get("results").is_some() {
            return Ok(ServerMessage::Results(mapping::decode(&value)?));
        }
        if let Some(error) = value.get("error").and_then(Value::as_str) {
            return Ok(ServerMessage::Error(error.to_string()));
        }
        if let Some(state) = value.get("state").and_then(Value::as_str) {
            return Ok(ServerMessage::State(state.to_string()));
        }
        if let Some(warnings) = value.get("warnings") {
            let warnings = match warnings {
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
                Value::String(s) => vec![s.clone()],
                other => vec![other.to_string()],
            };
            return Ok(ServerMessage::Warnings(warnings));
        }
        Ok(ServerMessage::Other(value))
    }

    pub fn is_listening(&self) -> bool {
        matches!(self, ServerMessage::State(state) if state == "listening")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_message_carries_action() {
        let settings = RecognitionSettings::new("audio/l16;rate=16000").interim_results(true);
        let message: Value = serde_json::from_str(&settings.start_message().unwrap()).unwrap();
        assert_eq!(
            message,
            json!({"action": "start", "content-type": "audio/l16;rate=16000", "interim_results": true})
        );
    }

    #[test]
    fn test_query_pairs_skip_content_type() {
        let mut settings = RecognitionSettings::new("audio/wav").continuous(true);
        settings.keywords = Some(vec!["watson".to_string(), "cloud".to_string()]);
        let mut pairs = settings.query_pairs().unwrap();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("continuous".to_string(), "true".to_string()),
                ("keywords".to_string(), "watson,cloud".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_server_messages() {
        assert!(ServerMessage::parse(r#"{"state": "listening"}"#)
            .unwrap()
            .is_listening());
        assert_eq!(
            ServerMessage::parse(r#"{"error": "No speech detected for 30s."}"#).unwrap(),
            ServerMessage::Error("No speech detected for 30s.".to_string())
        );

        let results = ServerMessage::parse(
            r#"{"result_index": 0, "results": [{"final": true, "alternatives": [{"transcript": "hello world ", "confidence": 0.93}]}]}"#,
        )
        .unwrap();
        match results {
            ServerMessage::Results(results) => {
                assert!(results.results[0].is_final);
                assert_eq!(transcript(&results.results), "hello world");
            }
            other => panic!("unexpected message: {:?}", other),
        }

        assert_eq!(
            ServerMessage::parse(r#"{"unexpected": 1}"#).unwrap(),
            ServerMessage::Other(json!({"unexpected": 1}))
        );
        assert!(ServerMessage::parse("not json").is_err());
    }

    #[test]
    fn test_parse_warnings() {
        assert_eq!(
            ServerMessage::parse(r#"{"warnings": ["Unknown arguments: foo."]}"#).unwrap(),
            ServerMessage::Warnings(vec!["Unknown arguments: foo.".to_string()])
        );
        assert_eq!(
            ServerMessage::parse(r#"{"warnings": "Unknown arguments: bar."}"#).unwrap(),
            ServerMessage::Warnings(vec!["Unknown arguments: bar.".to_string()])
        );
    }
}
