use anyhow::Result;
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use watson_sdk::services::alchemy_language::{AlchemyLanguage, AlchemySource, KeywordOptions};
use watson_sdk::services::conversation::{Conversation, MessageRequest};
use watson_sdk::services::natural_language_classifier::NaturalLanguageClassifier;
use watson_sdk::services::personality_insights::{
    PersonalityInsights, ProfileContent, ProfileOptions,
};
use watson_sdk::services::text_to_speech::{AudioFormat, TextToSpeech};
use watson_sdk::services::tone_analyzer::{ToneAnalyzer, ToneOptions};
use watson_sdk::services::visual_recognition::{ClassifyOptions, VisualRecognition};
use watson_sdk::{
    ApiKeyAuthentication, AuthenticationStrategy, BasicAuthentication, ErrorCategory, WatsonError,
    WatsonService,
};

fn basic() -> Arc<dyn AuthenticationStrategy> {
    Arc::new(BasicAuthentication::new("user", "pass"))
}

#[tokio::test]
async fn test_classifier_classify_and_unknown_id() -> Result<()> {
    let server = MockServer::start();
    let classify = server.mock(|when, then| {
        when.method(GET)
            .path("/nlc/v1/classifiers/10D41B-nlc-1/classify")
            .query_param("text", "How hot will it be today?");
        then.status(200).json_body(json!({
            "classifier_id": "10D41B-nlc-1",
            "text": "How hot will it be today?",
            "top_class": "temperature",
            "classes": [
                {"class_name": "temperature", "confidence": 0.98},
                {"class_name": "conditions", "confidence": 0.02}
            ]
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/nlc/v1/classifiers/missing/classify");
        then.status(404).json_body(json!({
            "code": 404,
            "error": "Not found",
            "description": "Classifier not found"
        }));
    });

    let classifier = NaturalLanguageClassifier::new(basic()).with_service_url(server.url("/nlc"));

    let classification = classifier
        .classify("10D41B-nlc-1", "How hot will it be today?")
        .await?;
    classify.assert();
    assert_eq!(classification.top_class.as_deref(), Some("temperature"));
    assert_eq!(classification.classes.map(|c| c.len()), Some(2));

    let err = classifier
        .classify("missing", "How hot will it be today?")
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(404));
    assert_eq!(err.category(), ErrorCategory::Service);
    match err {
        WatsonError::Service { message, .. } => assert_eq!(message, "Not found"),
        other => panic!("expected a service error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_tone_sends_version_and_text() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/tone/v3/tone")
            .query_param("version", "2016-05-19")
            .query_param("tones", "emotion")
            .json_body(json!({"text": "I am so happy today"}));
        then.status(200).json_body(json!({
            "document_tone": {
                "tone_categories": [{
                    "category_id": "emotion_tone",
                    "category_name": "Emotion Tone",
                    "tones": [
                        {"tone_id": "joy", "tone_name": "Joy", "score": 0.87},
                        {"tone_id": "anger", "tone_name": "Anger", "score": 0.02}
                    ]
                }]
            }
        }));
    });

    let analyzer = ToneAnalyzer::new(basic()).with_service_url(server.url("/tone"));
    let options = ToneOptions {
        tones: vec!["emotion".to_string()],
        ..ToneOptions::default()
    };
    let analysis = analyzer.get_tone("I am so happy today", &options).await?;

    mock.assert();
    assert_eq!(analysis.tone("joy").map(|t| t.score), Some(0.87));
    assert!(analysis.sentences_tone.is_none());
    Ok(())
}

#[tokio::test]
async fn test_profile_from_plain_text() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/pi/v2/profile")
            .header("Content-Type", "text/plain")
            .header("Content-Language", "en");
        then.status(200).json_body(json!({
            "id": "*UNKNOWN*",
            "source": "*UNKNOWN*",
            "word_count": 1500,
            "processed_lang": "en",
            "tree": {
                "id": "r",
                "name": "root",
                "children": [{
                    "id": "personality",
                    "name": "Big 5",
                    "children": [{"id": "Openness", "category": "personality", "percentage": 0.81}]
                }]
            }
        }));
    });

    let insights = PersonalityInsights::new(basic()).with_service_url(server.url("/pi"));
    let options = ProfileOptions {
        content_language: Some("en".to_string()),
        ..ProfileOptions::default()
    };
    let profile = insights
        .get_profile(&ProfileContent::Text("Call me Ishmael.".to_string()), &options)
        .await?;

    mock.assert();
    assert_eq!(profile.word_count, Some(1500));
    assert_eq!(
        profile.tree.find("Openness").and_then(|t| t.percentage),
        Some(0.81)
    );
    Ok(())
}

#[tokio::test]
async fn test_conversation_round_trips_context() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/conversation/v1/workspaces/ws-1/message")
            .query_param("version", "2016-07-11")
            .json_body(json!({
                "input": {"text": "kitchen"},
                "context": {"conversation_id": "c-1"}
            }));
        then.status(200).json_body(json!({
            "input": {"text": "kitchen"},
            "intents": [],
            "entities": [{"entity": "room", "value": "kitchen", "location": [0, 7]}],
            "output": {"text": ["Turning on the kitchen lights."]},
            "context": {"conversation_id": "c-1"}
        }));
    });

    let conversation = Conversation::new(basic()).with_service_url(server.url("/conversation"));
    let request = MessageRequest::text("kitchen").with_context(Some(json!({"conversation_id": "c-1"})));
    let response = conversation.message("ws-1", &request).await?;

    mock.assert();
    assert_eq!(response.conversation_id(), Some("c-1"));
    assert_eq!(response.entities[0].value.as_deref(), Some("kitchen"));
    Ok(())
}

#[tokio::test]
async fn test_visual_recognition_query_key_and_nested_error() -> Result<()> {
    let server = MockServer::start();
    let classify = server.mock(|when, then| {
        when.method(GET)
            .path("/vr/v3/classify")
            .query_param("api_key", "vr-key")
            .query_param("version", "2016-05-20")
            .query_param("url", "https://example.com/fruit.jpg");
        then.status(200).json_body(json!({
            "images_processed": 1,
            "images": [{
                "source_url": "https://example.com/fruit.jpg",
                "classifiers": [{
                    "name": "default",
                    "classes": [{"class": "banana", "score": "0.93"}]
                }]
            }]
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/vr/v3/detect_faces");
        then.status(400).json_body(json!({
            "error": {"code": 400, "description": "Invalid API key", "error_id": "parameter_error"}
        }));
    });

    let service = VisualRecognition::new(Arc::new(ApiKeyAuthentication::query("api_key", "vr-key")))
        .with_service_url(server.url("/vr"));

    let images = service
        .classify_url("https://example.com/fruit.jpg", &ClassifyOptions::default())
        .await?;
    classify.assert();
    let classifiers = images.images[0].classifiers.as_ref().expect("classifiers");
    assert_eq!(classifiers[0].classes[0].class_name, "banana");
    assert_eq!(classifiers[0].classes[0].score, 0.93);

    match service.detect_faces_url("https://example.com/face.jpg").await {
        Err(WatsonError::Service { code, message, .. }) => {
            assert_eq!(code, 400);
            assert_eq!(message, "Invalid API key");
        }
        other => panic!("expected a service error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_alchemy_error_status_in_successful_response() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/calls/text/TextGetRankedKeywords")
            .query_param("apikey", "bad-key")
            .query_param("outputMode", "json");
        then.status(200).json_body(json!({
            "status": "ERROR",
            "statusInfo": "invalid-api-key",
            "usage": "By accessing AlchemyAPI or using information generated by AlchemyAPI..."
        }));
    });

    let alchemy = AlchemyLanguage::new(Arc::new(ApiKeyAuthentication::query("apikey", "bad-key")))
        .with_service_url(server.url("/calls"));
    let result = alchemy
        .get_ranked_keywords(
            &AlchemySource::Text("IBM Watson won Jeopardy".to_string()),
            &KeywordOptions::default(),
        )
        .await;

    match result {
        Err(WatsonError::Service {
            code,
            message,
            recovery,
            ..
        }) => {
            assert_eq!(code, 400);
            assert_eq!(message, "ERROR");
            assert_eq!(recovery.as_deref(), Some("invalid-api-key"));
        }
        other => panic!("expected a service error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_synthesize_returns_raw_audio() -> Result<()> {
    let server = MockServer::start();
    let audio = b"RIFF\x24\x00\x00\x00WAVEfmt ".to_vec();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/tts/v1/synthesize")
            .query_param("voice", "en-US_MichaelVoice")
            .header("Accept", "audio/wav")
            .json_body(json!({"text": "Hello world"}));
        then.status(200)
            .header("Content-Type", "audio/wav")
            .body(audio.clone());
    });

    let tts = TextToSpeech::new(basic()).with_service_url(server.url("/tts"));
    let bytes = tts.synthesize("Hello world", None, AudioFormat::Wav).await?;

    mock.assert();
    assert_eq!(bytes, audio);
    Ok(())
}

#[tokio::test]
async fn test_unrecognised_error_body_keeps_raw_text() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/tts/v1/voices");
        then.status(502).body("<html>Bad Gateway</html>");
    });

    let tts = TextToSpeech::new(basic()).with_service_url(server.url("/tts"));
    match tts.get_voices().await {
        Err(err @ WatsonError::Http { .. }) => {
            assert_eq!(err.code(), Some(502));
            assert!(err.is_retryable());
        }
        other => panic!("expected an HTTP error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_default_headers_are_sent() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/tts/v1/voices")
            .header("X-Watson-Learning-Opt-Out", "true")
            .header_exists("User-Agent");
        then.status(200).json_body(json!({
            "voices": [{"name": "en-US_AllisonVoice", "gender": "female", "language": "en-US"}]
        }));
    });

    let tts = TextToSpeech::new(basic())
        .with_service_url(server.url("/tts"))
        .with_default_header("X-Watson-Learning-Opt-Out", "true");
    let voices = tokio_test::assert_ok!(tts.get_voices().await);

    mock.assert();
    assert_eq!(voices[0].name, "en-US_AllisonVoice");
    Ok(())
}
