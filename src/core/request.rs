use crate::utils::error::Result;
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use std::collections::HashMap;
use url::Url;

/// Media types accepted or produced by the Watson REST endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaType {
    Json,
    FormUrlEncoded,
    PlainText,
    Html,
    Xml,
    OctetStream,
    Wav,
    Flac,
    OggOpus,
    /// Raw linear PCM at the given sample rate.
    L16(u32),
    Other(String),
}

impl MediaType {
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        use std::borrow::Cow;
        match self {
            MediaType::Json => Cow::Borrowed("application/json"),
            MediaType::FormUrlEncoded => Cow::Borrowed("application/x-www-form-urlencoded"),
            MediaType::PlainText => Cow::Borrowed("text/plain"),
            MediaType::Html => Cow::Borrowed("text/html"),
            MediaType::Xml => Cow::Borrowed("application/xml"),
            MediaType::OctetStream => Cow::Borrowed("application/octet-stream"),
            MediaType::Wav => Cow::Borrowed("audio/wav"),
            MediaType::Flac => Cow::Borrowed("audio/flac"),
            MediaType::OggOpus => Cow::Borrowed("audio/ogg;codecs=opus"),
            MediaType::L16(rate) => Cow::Owned(format!("audio/l16;rate={}", rate)),
            MediaType::Other(value) => Cow::Borrowed(value.as_str()),
        }
    }
}

/// One part of a multipart/form-data body.
#[derive(Debug, Clone)]
pub struct MultipartPart {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<MediaType>,
    pub data: Vec<u8>,
}

impl MultipartPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: value.into().into_bytes(),
        }
    }

    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: MediaType,
        data: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some(content_type),
            data,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Bytes(Vec<u8>),
    Multipart(Vec<MultipartPart>),
}

/// Percent-encodes an identifier so it stays a single path segment.
pub fn path_segment(id: &str) -> String {
    url::form_urlencoded::byte_serialize(id.as_bytes())
        .map(|chunk| if chunk == "+" { "%20" } else { chunk })
        .collect()
}

/// Everything needed to issue one call against a Watson endpoint.
///
/// The request is plain data so the gateway can authenticate and replay it
/// after a token refresh without rebuilding it.
#[derive(Debug, Clone)]
pub struct RestRequest {
    pub method: Method,
    pub url: String,
    pub accept: Option<MediaType>,
    pub content_type: Option<MediaType>,
    pub query: Vec<(String, String)>,
    pub headers: HashMap<String, String>,
    pub body: Option<RequestBody>,
}

impl RestRequest {
    pub fn new(method: Method, service_url: &str, endpoint: &str) -> Self {
        Self {
            method,
            url: format!("{}{}", service_url, endpoint),
            accept: None,
            content_type: None,
            query: Vec::new(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn user_agent() -> String {
        format!(
            "watson-sdk-rust/{} {}/{}",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        )
    }

    pub fn accept(mut self, media_type: MediaType) -> Self {
        self.accept = Some(media_type);
        self
    }

    pub fn content_type(mut self, media_type: MediaType) -> Self {
        self.content_type = Some(media_type);
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    pub fn query_opt<V: ToString>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(name, value),
            None => self,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: &HashMap<String, String>) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn json_body<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(RequestBody::Bytes(serde_json::to_vec(body)?));
        self.content_type = Some(MediaType::Json);
        Ok(self)
    }

    pub fn form_body(mut self, fields: &[(&str, &str)]) -> Self {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        self.body = Some(RequestBody::Bytes(encoded.into_bytes()));
        self.content_type = Some(MediaType::FormUrlEncoded);
        self
    }

    pub fn text_body(mut self, text: impl Into<String>, media_type: MediaType) -> Self {
        self.body = Some(RequestBody::Bytes(text.into().into_bytes()));
        self.content_type = Some(media_type);
        self
    }

    pub fn bytes_body(mut self, data: Vec<u8>, media_type: MediaType) -> Self {
        self.body = Some(RequestBody::Bytes(data));
        self.content_type = Some(media_type);
        self
    }

    /// Content type is left to reqwest so the boundary is set correctly.
    pub fn multipart_body(mut self, parts: Vec<MultipartPart>) -> Self {
        self.body = Some(RequestBody::Multipart(parts));
        self.content_type = None;
        self
    }

    /// Service URL + endpoint with the query items appended, URL-escaped.
    pub fn full_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.url)?;
        if !self.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    pub fn into_builder(self, client: &Client) -> Result<RequestBuilder> {
        let url = self.full_url()?;
        let mut builder = client.request(self.method, url);

        if !self
            .headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case("user-agent"))
        {
            builder = builder.header(reqwest::header::USER_AGENT, Self::user_agent());
        }

        if let Some(accept) = &self.accept {
            builder = builder.header(reqwest::header::ACCEPT, accept.as_str().into_owned());
        }
        if let Some(content_type) = &self.content_type {
            builder =
                builder.header(reqwest::header::CONTENT_TYPE, content_type.as_str().into_owned());
        }
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        match self.body {
            Some(RequestBody::Bytes(data)) => {
                builder = builder.body(data);
            }
            Some(RequestBody::Multipart(parts)) => {
                let mut form = reqwest::multipart::Form::new();
                for part in parts {
                    let mut p = reqwest::multipart::Part::bytes(part.data);
                    if let Some(filename) = part.filename {
                        p = p.file_name(filename);
                    }
                    if let Some(content_type) = part.content_type {
                        p = p.mime_str(&content_type.as_str())?;
                    }
                    form = form.part(part.name, p);
                }
                builder = builder.multipart(form);
            }
            None => {}
        }

        Ok(builder)
    }
}
