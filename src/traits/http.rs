use anyhow::{Context, Result};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;
use url::Url;

use crate::signing::HmacSigner;

const USER_AGENT_VALUE: &str = "Bulk application creation - rust";
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Body format of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Xml,
}

impl ContentType {
    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Xml => "application/xml",
        }
    }
}

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    #[cfg(test)]
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for blocking HTTP calls, allowing for mocking in tests.
///
/// Any response that arrives is `Ok`, whatever its status; `Err` means the
/// request never completed.
pub trait HttpClient: Send + Sync {
    /// Issue a signed GET request
    fn get(&self, url: &Url, content_type: ContentType) -> Result<HttpResponse>;

    /// Issue a signed POST request with a JSON body
    fn post_json(&self, url: &Url, body: &str) -> Result<HttpResponse>;
}

/// Real HTTP client using reqwest with HMAC-signed requests
pub struct ReqwestHttpClient {
    client: reqwest::blocking::Client,
    signer: HmacSigner,
}

impl ReqwestHttpClient {
    pub fn new(signer: HmacSigner) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, signer })
    }

    fn send(
        &self,
        method: Method,
        url: &Url,
        content_type: ContentType,
        body: Option<&str>,
    ) -> Result<HttpResponse> {
        let authorization = self.signer.authorization(method.as_str(), url)?;

        let mut request = self
            .client
            .request(method, url.clone())
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header(CONTENT_TYPE, content_type.mime())
            .header(AUTHORIZATION, authorization);

        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request
            .send()
            .with_context(|| format!("Failed to call: {}", url))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .with_context(|| format!("Failed to read response body from: {}", url))?;

        Ok(HttpResponse { status, body })
    }
}

impl HttpClient for ReqwestHttpClient {
    fn get(&self, url: &Url, content_type: ContentType) -> Result<HttpResponse> {
        self.send(Method::GET, url, content_type, None)
    }

    fn post_json(&self, url: &Url, body: &str) -> Result<HttpResponse> {
        self.send(Method::POST, url, ContentType::Json, Some(body))
    }
}

/// A request seen by MockHttpClient
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub url: String,
    pub body: Option<String>,
}

#[cfg(test)]
enum MockReply {
    Response(HttpResponse),
    TransportError(String),
}

/// Mock HTTP client replaying scripted responses.
///
/// Each scripted reply is bound to a URL fragment and consumed by the first
/// request whose URL contains that fragment.
#[cfg(test)]
pub struct MockHttpClient {
    replies: std::sync::Mutex<Vec<(String, MockReply)>>,
    calls: std::sync::Mutex<Vec<RecordedCall>>,
}

#[cfg(test)]
impl MockHttpClient {
    pub fn new() -> Self {
        Self {
            replies: std::sync::Mutex::new(Vec::new()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Queue a response for the next request matching `url_fragment`
    pub fn respond(&self, url_fragment: &str, status: u16, body: &str) -> &Self {
        self.replies.lock().unwrap().push((
            url_fragment.to_string(),
            MockReply::Response(HttpResponse::new(status, body)),
        ));
        self
    }

    /// Queue a transport failure for the next request matching `url_fragment`
    pub fn fail(&self, url_fragment: &str, message: &str) -> &Self {
        self.replies.lock().unwrap().push((
            url_fragment.to_string(),
            MockReply::TransportError(message.to_string()),
        ));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded requests whose URL contains `url_fragment`
    pub fn call_count(&self, url_fragment: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.url.contains(url_fragment))
            .count()
    }

    fn reply(&self, method: &str, url: &Url, body: Option<&str>) -> Result<HttpResponse> {
        let url = url.to_string();
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.to_string(),
            url: url.clone(),
            body: body.map(str::to_string),
        });

        let mut replies = self.replies.lock().unwrap();
        let position = replies
            .iter()
            .position(|(fragment, _)| url.contains(fragment.as_str()))
            .ok_or_else(|| anyhow::anyhow!("No mock response configured for {}", url))?;

        match replies.remove(position).1 {
            MockReply::Response(response) => Ok(response),
            MockReply::TransportError(message) => Err(anyhow::anyhow!("{}", message)),
        }
    }
}

#[cfg(test)]
impl Default for MockHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl HttpClient for MockHttpClient {
    fn get(&self, url: &Url, _content_type: ContentType) -> Result<HttpResponse> {
        self.reply("GET", url, None)
    }

    fn post_json(&self, url: &Url, body: &str) -> Result<HttpResponse> {
        self.reply("POST", url, Some(body))
    }
}
