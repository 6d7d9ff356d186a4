use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use httpmock::prelude::*;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::{http, Message};
use watson_sdk::services::speech_to_text::{transcript, RecognitionSettings, SpeechToText};
use watson_sdk::{BasicAuthentication, IamAccessToken, MediaType, WatsonError, WatsonService};

#[derive(Debug, Default)]
struct Handshake {
    uri: String,
    authorization: Option<String>,
    watson_token: Option<String>,
    attempts: usize,
}

/// Accepts one socket and plays the recognition protocol: `start_replies` after
/// `start`, then the scripted messages after `stop`. The first `rejections`
/// handshakes are refused with 401. Returns the audio bytes received.
async fn recognition_server(
    start_replies: Vec<Value>,
    after_stop: Vec<Value>,
    rejections: usize,
) -> Result<(String, Arc<Mutex<Handshake>>, JoinHandle<Result<Vec<u8>>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    let handshake = Arc::new(Mutex::new(Handshake::default()));
    let recorded = handshake.clone();

    let task = tokio::spawn(async move {
        let mut socket = loop {
            let (stream, _) = listener.accept().await?;
            let record = recorded.clone();
            let accepted = tokio_tungstenite::accept_hdr_async(stream, move |request: &Request, response: Response| {
                let mut recorded = record.lock().unwrap();
                recorded.attempts += 1;
                recorded.uri = request.uri().to_string();
                let header = |name: &str| {
                    request
                        .headers()
                        .get(name)
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_string)
                };
                recorded.authorization = header("authorization");
                recorded.watson_token = header("x-watson-authorization-token");
                if recorded.attempts <= rejections {
                    let refusal = http::Response::builder()
                        .status(401)
                        .body(Some("Unauthorized".to_string()))
                        .unwrap();
                    return Err::<Response, ErrorResponse>(refusal);
                }
                Ok::<Response, ErrorResponse>(response)
            })
            .await;
            let refused = handshake_attempts(&recorded) <= rejections;
            match accepted {
                Ok(socket) => break socket,
                Err(_) if refused => continue,
                Err(e) => return Err(e.into()),
            }
        };

        let mut audio = Vec::new();
        while let Some(frame) = socket.next().await {
            match frame? {
                Message::Text(text) => {
                    let message: Value = serde_json::from_str(text.as_str())?;
                    match message["action"].as_str() {
                        Some("start") => {
                            assert_eq!(message["content-type"], "audio/l16;rate=16000");
                            for reply in &start_replies {
                                socket.send(Message::Text(reply.to_string().into())).await?;
                            }
                        }
                        Some("stop") => {
                            for reply in &after_stop {
                                socket.send(Message::Text(reply.to_string().into())).await?;
                            }
                        }
                        other => panic!("unexpected action {:?}", other),
                    }
                }
                Message::Binary(chunk) => audio.extend_from_slice(&chunk),
                Message::Close(_) => break,
                _ => {}
            }
        }
        Ok::<Vec<u8>, anyhow::Error>(audio)
    });

    Ok((format!("http://{}/speech-to-text/api", address), handshake, task))
}

fn handshake_attempts(handshake: &Mutex<Handshake>) -> usize {
    handshake.lock().unwrap().attempts
}

#[tokio::test]
async fn test_streaming_recognition_session() -> Result<()> {
    let (url, handshake, server) = recognition_server(
        vec![json!({"state": "listening"})],
        vec![
            json!({"result_index": 0, "results": [{"final": false, "alternatives": [{"transcript": "hello"}]}]}),
            json!({"result_index": 0, "results": [{"final": true, "alternatives": [{"transcript": "hello world ", "confidence": 0.91}]}]}),
            json!({"result_index": 1, "results": [{"final": true, "alternatives": [{"transcript": "how are you", "confidence": 0.88}]}]}),
            json!({"state": "listening"}),
        ],
        0,
    )
    .await?;

    let stt = SpeechToText::new(Arc::new(IamAccessToken::new("stream-token"))).with_service_url(url);
    let settings = RecognitionSettings::new(MediaType::L16(16000).as_str()).interim_results(true);

    let mut session = stt.recognize_stream(&settings, None).await?;
    session.send_audio(vec![0u8; 320]).await?;
    session.send_audio(vec![1u8; 160]).await?;
    let results = session.finish().await?;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|result| result.is_final));
    assert_eq!(transcript(&results), "hello world how are you");
    assert_eq!(results[0].alternatives[0].confidence, Some(0.91));

    let audio = server.await??;
    assert_eq!(audio.len(), 480);

    let handshake = handshake.lock().unwrap();
    assert_eq!(
        handshake.uri,
        "/speech-to-text/api/v1/recognize?model=en-US_BroadbandModel"
    );
    assert_eq!(handshake.authorization.as_deref(), Some("Bearer stream-token"));
    Ok(())
}

#[tokio::test]
async fn test_error_before_listening_is_protocol_error() -> Result<()> {
    let (url, _, _server) = recognition_server(
        vec![json!({"error": "Model en-XX_BroadbandModel not found"})],
        Vec::new(),
        0,
    )
    .await?;

    let stt = SpeechToText::new(Arc::new(IamAccessToken::new("t"))).with_service_url(url);
    let settings = RecognitionSettings::new("audio/l16;rate=16000");

    match stt.recognize_stream(&settings, Some("en-XX_BroadbandModel")).await {
        Err(WatsonError::Protocol { message }) => {
            assert_eq!(message, "Model en-XX_BroadbandModel not found");
        }
        other => panic!("expected a protocol error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_warnings_before_listening_are_tolerated() -> Result<()> {
    let (url, _, server) = recognition_server(
        vec![
            json!({"warnings": ["Unknown arguments: foo."]}),
            json!({"state": "listening"}),
        ],
        vec![
            json!({"result_index": 0, "results": [{"final": true, "alternatives": [{"transcript": "still here"}]}]}),
            json!({"warnings": "Late notice."}),
            json!({"state": "listening"}),
        ],
        0,
    )
    .await?;

    let stt = SpeechToText::new(Arc::new(IamAccessToken::new("t"))).with_service_url(url);
    let settings = RecognitionSettings::new("audio/l16;rate=16000");

    let mut session = stt.recognize_stream(&settings, None).await?;
    session.send_audio(vec![0u8; 64]).await?;
    let results = session.finish().await?;

    assert_eq!(transcript(&results), "still here");
    assert_eq!(server.await??.len(), 64);
    Ok(())
}

#[tokio::test]
async fn test_rejected_handshake_refreshes_token_and_reconnects() -> Result<()> {
    let token_server = MockServer::start();
    let token_mock = token_server.mock(|when, then| {
        when.method(GET).path("/token");
        then.status(200).body("socket-token");
    });
    let (url, handshake, server) = recognition_server(
        vec![json!({"state": "listening"})],
        vec![json!({"state": "listening"})],
        1,
    )
    .await?;

    let auth = Arc::new(BasicAuthentication::with_token_url(
        "user",
        "pass",
        token_server.url("/token"),
        "https://stream.watsonplatform.net/speech-to-text/api",
    ));
    let stt = SpeechToText::new(auth).with_service_url(url);
    let settings = RecognitionSettings::new("audio/l16;rate=16000");

    let session = stt.recognize_stream(&settings, None).await?;
    let results = session.finish().await?;
    assert!(results.is_empty());
    server.await??;

    token_mock.assert_hits(2);
    let handshake = handshake.lock().unwrap();
    assert_eq!(handshake.attempts, 2);
    assert_eq!(handshake.watson_token.as_deref(), Some("socket-token"));
    Ok(())
}

#[tokio::test]
async fn test_static_token_rejection_is_not_retried() -> Result<()> {
    let (url, handshake, _server) = recognition_server(Vec::new(), Vec::new(), 2).await?;

    let stt = SpeechToText::new(Arc::new(IamAccessToken::new("revoked"))).with_service_url(url);
    let settings = RecognitionSettings::new("audio/l16;rate=16000");

    let err = stt.recognize_stream(&settings, None).await.unwrap_err();
    assert!(matches!(err, WatsonError::WebSocket(_)));
    assert_eq!(err.code(), Some(401));
    assert_eq!(handshake_attempts(&handshake), 1);
    Ok(())
}

#[tokio::test]
async fn test_one_shot_recognize_over_http() -> Result<()> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/stt/v1/recognize")
            .query_param("model", "en-US_NarrowbandModel")
            .query_param("continuous", "true")
            .header("Content-Type", "audio/flac")
            .body("fLaC");
        then.status(200).json_body(json!({
            "result_index": 0,
            "results": [{"final": true, "alternatives": [{"transcript": "thunderstorms ", "confidence": 0.9}]}]
        }));
    });

    let stt = SpeechToText::new(Arc::new(IamAccessToken::new("t")))
        .with_service_url(server.url("/stt"));
    let settings = RecognitionSettings::new("audio/flac").continuous(true);
    let results = stt
        .recognize(b"fLaC".to_vec(), &settings, Some("en-US_NarrowbandModel"))
        .await?;

    mock.assert();
    assert_eq!(transcript(&results.results), "thunderstorms");
    Ok(())
}
