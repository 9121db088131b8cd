use super::{ProgressSink, Transport};
use crate::{config::Config, error::TransportError, session::AnalysisRequest};
use anyhow::{Context, Result, anyhow};
use reqwest::blocking::{Client, multipart};
use serde_json::Value;
use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new(cfg: &Config) -> Result<Self> {
        let base_url = cfg.service.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(anyhow!("service.base_url is empty"));
        }
        let timeout = if cfg.service.timeout_seconds > 0 {
            Some(Duration::from_secs(cfg.service.timeout_seconds))
        } else {
            None
        };
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(cfg.service.user_agent.clone())
            .build()
            .with_context(|| "building HTTP client")?;
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout.unwrap_or_default())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

impl Transport for HttpTransport {
    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn health(&self) -> Result<Value, TransportError> {
        let url = self.url("/health");
        debug!("GET {url}");
        let resp = self.client.get(&url).send().map_err(|e| self.classify(e))?;
        let status = resp.status().as_u16();
        let body = resp.bytes().map_err(|e| self.classify(e))?;
        decode_response(status, &body)
    }

    fn send(&self, req: &AnalysisRequest, progress: ProgressSink) -> Result<Value, TransportError> {
        let url = self.url(req.task.endpoint());
        let doc = &req.document;
        let total = doc.byte_size();

        let reader = ProgressReader::new(doc.bytes(), progress);
        let part = multipart::Part::reader_with_length(reader, total)
            .file_name(doc.name().to_string())
            .mime_str(doc.media_type())
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let mut form = multipart::Form::new().part("file", part);
        if let Some(question) = &req.question {
            form = form.text("question", question.clone());
        }

        debug!("POST {url} bytes={total} epoch={}", req.epoch);
        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|e| self.classify(e))?;

        let status = resp.status().as_u16();
        let body = resp.bytes().map_err(|e| self.classify(e))?;
        debug!("{url} -> {status} ({} bytes)", body.len());
        decode_response(status, &body)
    }
}

/// Maps a status and body to the service payload or a transport error.
pub fn decode_response(status: u16, body: &[u8]) -> Result<Value, TransportError> {
    if !(200..300).contains(&status) {
        let message = error_message(body)
            .unwrap_or_else(|| format!("Request failed with status code {status}"));
        return Err(TransportError::Status { status, message });
    }
    serde_json::from_slice(body).map_err(|e| TransportError::Decode(e.to_string()))
}

/// Extracts `detail`, then `error`, from a JSON error body. Empty values are
/// treated as missing.
pub fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let obj = value.as_object()?;
    ["detail", "error"]
        .iter()
        .filter_map(|k| obj.get(*k))
        .find_map(|v| match v {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
}

/// Counts file bytes as reqwest pulls them into the request body, and
/// signals body-sent once the file part is exhausted.
struct ProgressReader {
    inner: Cursor<Arc<[u8]>>,
    total: u64,
    sink: ProgressSink,
    finished: bool,
}

impl ProgressReader {
    fn new(bytes: Arc<[u8]>, sink: ProgressSink) -> Self {
        let total = bytes.len() as u64;
        Self {
            inner: Cursor::new(bytes),
            total,
            sink,
            finished: false,
        }
    }
}

impl Read for ProgressReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.sink.bytes(self.inner.position(), Some(self.total));
        } else if !buf.is_empty() && !self.finished {
            self.finished = true;
            self.sink.body_sent();
        }
        Ok(n)
    }
}
