//! HTTP session for MAAS REST API calls

use super::auth::Credentials;
use crate::error::{Error, Result};
use crate::resource::{FormField, Verb};
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control() && c != ' ', "")
}

/// Raw answer from the server, before any decoding
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: StatusCode,
    body: String,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: String) -> Self {
        Self { status, body }
    }

    /// True for any 2xx status
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    /// Decode the body as JSON. An empty body decodes to `null`.
    pub fn json(&self) -> Result<Value> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body).map_err(Error::Decode)
    }
}

/// Authenticated HTTP session shared by every resource of a client
#[derive(Clone)]
pub struct MaasSession {
    client: Client,
    credentials: Credentials,
}

impl MaasSession {
    /// Create a new session signing every request with `credentials`
    pub fn new(credentials: Credentials) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("maas-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            credentials,
        })
    }

    /// Plain authenticated GET
    pub async fn get(&self, url: &str) -> Result<RawResponse> {
        self.request(Verb::Get, url, &Map::new(), None).await
    }

    /// Send one request.
    ///
    /// `params` become the query string. A non-empty `files` map is sent as a
    /// `multipart/form-data` body.
    pub async fn request(
        &self,
        verb: Verb,
        url: &str,
        params: &Map<String, Value>,
        files: Option<&BTreeMap<String, FormField>>,
    ) -> Result<RawResponse> {
        tracing::debug!("{} {}", verb, url);

        let mut request = self
            .client
            .request(verb.as_method(), url)
            .header(AUTHORIZATION, self.credentials.authorization_header());

        let query = query_pairs(params);
        if !query.is_empty() {
            request = request.query(&query);
        }

        if let Some(files) = files.filter(|f| !f.is_empty()) {
            request = request.multipart(multipart_form(files)?);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
        }

        Ok(RawResponse::new(status, body))
    }
}

/// Render a JSON scalar the way it is sent on the wire
pub(crate) fn wire_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Flatten query params: nulls are dropped, arrays repeat their key
fn query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for (key, value) in params {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items.iter().filter(|v| !v.is_null()) {
                    pairs.push((key.clone(), wire_string(item)));
                }
            }
            other => pairs.push((key.clone(), wire_string(other))),
        }
    }

    pairs
}

/// Build the multipart body from converted form fields
fn multipart_form(files: &BTreeMap<String, FormField>) -> Result<Form> {
    let mut form = Form::new();

    for (name, field) in files {
        let part = match field {
            FormField::Text {
                filename: None,
                value,
            } => Part::text(value.clone()),
            FormField::Text {
                filename: Some(filename),
                value,
            } => Part::text(value.clone()).file_name(filename.clone()),
            FormField::Raw(items) => file_part(name, items)?,
        };
        form = form.part(name.clone(), part);
    }

    Ok(form)
}

/// A pass-through sequence is a `(filename, content[, content_type[, headers]])` tuple
fn file_part(name: &str, items: &[Value]) -> Result<Part> {
    let invalid = || Error::InvalidFormField {
        field: name.to_string(),
    };

    if !(2..=4).contains(&items.len()) {
        return Err(invalid());
    }

    let content = wire_string(&items[1]).into_bytes();
    let mut part = Part::bytes(content);

    if let Some(filename) = items[0].as_str() {
        part = part.file_name(filename.to_string());
    }

    if let Some(mime) = items.get(2).and_then(|v| v.as_str()) {
        part = part.mime_str(mime).map_err(|_| invalid())?;
    }

    Ok(part)
}
