use super::models::{RecognitionSettings, ServerMessage, SpeechRecognitionResult, SpeechRecognitionResults};
use crate::core::request::RestRequest;
use crate::utils::error::{Result, WatsonError};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

const LISTENING_TIMEOUT: Duration = Duration::from_secs(10);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An open `/v1/recognize` socket. Audio goes in with [`send_audio`], results
/// come back through [`next_results`] and [`finish`].
///
/// [`send_audio`]: RecognizeSession::send_audio
/// [`next_results`]: RecognizeSession::next_results
/// [`finish`]: RecognizeSession::finish
pub struct RecognizeSession {
    socket: Socket,
    results: Vec<SpeechRecognitionResult>,
    stopped: bool,
}

impl std::fmt::Debug for RecognizeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognizeSession")
            .field("results", &self.results.len())
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}

fn protocol(message: impl Into<String>) -> WatsonError {
    WatsonError::Protocol {
        message: message.into(),
    }
}

/// Turns an authenticated REST request into a websocket handshake request:
/// http(s) becomes ws(s) and every header the strategy attached is carried over.
pub(crate) fn handshake_request(
    request: &RestRequest,
) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request> {
    let mut url = request.full_url()?;
    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => other,
    }
    .to_string();
    url.set_scheme(&scheme)
        .map_err(|_| protocol(format!("cannot use scheme {} for a websocket", scheme)))?;

    let mut handshake = url.as_str().into_client_request()?;
    for (name, value) in &request.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| protocol(format!("invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| protocol(format!("invalid value for header {}: {}", name, e)))?;
        handshake.headers_mut().insert(name, value);
    }
    Ok(handshake)
}

fn note_ignored(message: &ServerMessage) {
    match message {
        ServerMessage::Warnings(warnings) => {
            tracing::warn!("Recognize session warnings: {}", warnings.join("; "))
        }
        ServerMessage::State(state) => tracing::debug!("Recognize session state: {}", state),
        other => tracing::debug!("Ignoring recognize message: {:?}", other),
    }
}

/// Results are addressed by `result_index`: later messages overwrite interim
/// hypotheses at the same position. Positions past the end are appended.
fn merge_results(results: &mut Vec<SpeechRecognitionResult>, message: &SpeechRecognitionResults) {
    let start = usize::try_from(message.result_index).unwrap_or(0);
    for (offset, result) in message.results.iter().enumerate() {
        let position = start.saturating_add(offset);
        if position < results.len() {
            results[position] = result.clone();
        } else {
            results.push(result.clone());
        }
    }
}

impl RecognizeSession {
    pub(crate) async fn open(request: &RestRequest, settings: &RecognitionSettings) -> Result<Self> {
        let handshake = handshake_request(request)?;
        tracing::debug!("Opening recognize socket at {}", handshake.uri());

        let (socket, _) = connect_async(handshake).await?;
        let mut session = Self {
            socket,
            results: Vec::new(),
            stopped: false,
        };

        session
            .socket
            .send(Message::Text(settings.start_message()?.into()))
            .await?;

        tokio::time::timeout(LISTENING_TIMEOUT, session.await_listening())
            .await
            .map_err(|_| protocol("timed out waiting for the service to start listening"))??;

        tracing::info!("Recognize session listening");
        Ok(session)
    }

    async fn await_listening(&mut self) -> Result<()> {
        loop {
            match self.read_message().await? {
                Some(ServerMessage::State(state)) if state == "listening" => return Ok(()),
                Some(ServerMessage::Error(message)) => return Err(protocol(message)),
                Some(ServerMessage::Results(results)) => self.merge(&results),
                Some(message) => note_ignored(&message),
                None => return Err(protocol("socket closed before the session started")),
            }
        }
    }

    /// The next parsed text frame, or `None` once the socket has closed.
    async fn read_message(&mut self) -> Result<Option<ServerMessage>> {
        while let Some(frame) = self.socket.next().await {
            match frame? {
                Message::Text(text) => return ServerMessage::parse(text.as_str()).map(Some),
                Message::Close(_) => return Ok(None),
                // ping/pong is answered by tungstenite; binary frames are not part of the protocol
                _ => {}
            }
        }
        Ok(None)
    }

    fn merge(&mut self, message: &SpeechRecognitionResults) {
        merge_results(&mut self.results, message);
    }

    pub async fn send_audio(&mut self, chunk: Vec<u8>) -> Result<()> {
        if self.stopped {
            return Err(protocol("audio sent after the session was stopped"));
        }
        self.socket.send(Message::Binary(chunk.into())).await?;
        Ok(())
    }

    /// Waits for the next batch of (possibly interim) results. Returns `None`
    /// when the service goes back to listening after a stop, or the socket closes.
    pub async fn next_results(&mut self) -> Result<Option<SpeechRecognitionResults>> {
        loop {
            match self.read_message().await? {
                Some(ServerMessage::Results(results)) => {
                    self.merge(&results);
                    return Ok(Some(results));
                }
                Some(ServerMessage::Error(message)) => {
                    tracing::error!("Recognition failed: {}", message);
                    return Err(protocol(message));
                }
                Some(message) if message.is_listening() => return Ok(None),
                Some(message) => note_ignored(&message),
                None => return Ok(None),
            }
        }
    }

    /// The transcript accumulated so far.
    pub fn results(&self) -> &[SpeechRecognitionResult] {
        &self.results
    }

    /// Signals end of audio, drains the remaining results and closes the socket.
    pub async fn finish(mut self) -> Result<Vec<SpeechRecognitionResult>> {
        self.stopped = true;
        self.socket
            .send(Message::Text(r#"{"action": "stop"}"#.to_string().into()))
            .await?;

        while self.next_results().await?.is_some() {}

        if let Err(e) = self.socket.close(None).await {
            tracing::debug!("Closing recognize socket: {}", e);
        }

        let results = self.results;
        tracing::info!("Recognize session finished with {} results", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::speech_to_text::Alternative;
    use reqwest::Method;

    #[test]
    fn test_handshake_switches_scheme_and_keeps_headers() {
        let request = RestRequest::new(
            Method::GET,
            "https://stream.watsonplatform.net/speech-to-text/api",
            "/v1/recognize",
        )
        .query("model", "en-US_BroadbandModel")
        .header("X-Watson-Authorization-Token", "abc");

        let handshake = handshake_request(&request).unwrap();
        assert_eq!(
            handshake.uri().to_string(),
            "wss://stream.watsonplatform.net/speech-to-text/api/v1/recognize?model=en-US_BroadbandModel"
        );
        assert_eq!(
            handshake.headers()["x-watson-authorization-token"],
            HeaderValue::from_static("abc")
        );
    }

    fn batch(result_index: i64, texts: &[&str]) -> SpeechRecognitionResults {
        SpeechRecognitionResults {
            result_index,
            results: texts
                .iter()
                .map(|text| SpeechRecognitionResult {
                    is_final: true,
                    alternatives: vec![Alternative {
                        transcript: text.to_string(),
                        confidence: None,
                    }],
                })
                .collect(),
        }
    }

    #[test]
    fn test_merge_replaces_by_index_and_tolerates_huge_indices() {
        let mut results = Vec::new();
        merge_results(&mut results, &batch(0, &["hel"]));
        merge_results(&mut results, &batch(0, &["hello", "there"]));
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].best_transcript(), Some("hello"));

        merge_results(&mut results, &batch(i64::MAX, &["far", "away"]));
        assert_eq!(results.len(), 4);
        assert_eq!(results[3].best_transcript(), Some("away"));
    }

    #[test]
    fn test_plain_http_maps_to_ws() {
        let request = RestRequest::new(Method::GET, "http://127.0.0.1:9000", "/v1/recognize");
        let handshake = handshake_request(&request).unwrap();
        assert_eq!(handshake.uri().scheme_str(), Some("ws"));
    }
}
