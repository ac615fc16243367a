//! Operations - invocable actions synthesized from the describe document
//!
//! Two calling conventions are supported and may be mixed:
//!
//! - legacy flat keyword arguments ([`CallArgs::kwarg`]) that fill uri
//!   template variables, plus the explicit `params` / `files` options
//! - the unified `args` map ([`CallArgs::args`]) holding every logical
//!   argument of the call
//!
//! # Example
//!
//! ```ignore
//! let machine = client.resource("machine")?;
//! let reply = machine
//!     .call("details", CallArgs::new().arg("system_id", "abc123"))
//!     .await?;
//! ```

use super::registry::{OperationSpec, Resource, Verb};
use super::template::format_uri;
use crate::error::{Error, Result};
use crate::maas::http::wire_string;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Arguments of one operation call
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    kwargs: Map<String, Value>,
    args: Map<String, Value>,
    params: Option<Map<String, Value>>,
    files: Option<Map<String, Value>>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Legacy flat keyword argument
    pub fn kwarg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.to_string(), value.into());
        self
    }

    /// One entry of the unified `args` map
    pub fn arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }

    /// Replace the unified `args` map (also known as `arguments`)
    pub fn args(mut self, args: Map<String, Value>) -> Self {
        self.args = args;
        self
    }

    /// Explicit query params for GET / DELETE
    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    /// Explicit form fields for POST / PUT
    pub fn files(mut self, files: Map<String, Value>) -> Self {
        self.files = Some(files);
        self
    }

    /// Uri substitution map: plain kwargs layered over `args`, kwargs win ties
    pub fn uri_args(&self) -> Map<String, Value> {
        let mut merged = self.args.clone();
        for (key, value) in &self.kwargs {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

/// One multipart field
#[derive(Debug, Clone, PartialEq)]
pub enum FormField {
    /// `(filename, text)`; scalars are converted with no filename
    Text {
        filename: Option<String>,
        value: String,
    },
    /// Sequence passed through unchanged
    Raw(Vec<Value>),
}

/// Convert a mapping into multipart form fields.
///
/// Scalars become `(None, stringified)` text parts, sequences pass through.
pub fn convert_files(mapping: Map<String, Value>) -> BTreeMap<String, FormField> {
    mapping
        .into_iter()
        .map(|(key, value)| {
            let field = match value {
                Value::Array(items) => FormField::Raw(items),
                other => FormField::Text {
                    filename: None,
                    value: wire_string(&other),
                },
            };
            (key, field)
        })
        .collect()
}

/// A fully routed request, ready for the session
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub verb: Verb,
    pub url: String,
    /// Query string params, including the `op` tag
    pub params: Map<String, Value>,
    /// Multipart body for body-bearing verbs
    pub files: Option<BTreeMap<String, FormField>>,
}

/// Decoded answer of a successful call
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// JSON body of a non-DELETE call
    Json(Value),
    /// Status code of a DELETE call
    Status(u16),
}

impl Reply {
    pub fn into_json(self) -> Value {
        match self {
            Reply::Json(value) => value,
            Reply::Status(code) => Value::from(code),
        }
    }
}

/// A single callable action of a resource
#[derive(Debug, Clone)]
pub struct Operation {
    name: String,
    method: Verb,
    op: Option<String>,
    doc: String,
    restful: bool,
}

impl Operation {
    pub fn new(spec: &OperationSpec) -> Self {
        Self {
            name: spec.name.clone(),
            method: spec.method,
            op: spec.op.clone(),
            doc: spec.doc.clone().unwrap_or_default(),
            restful: spec.restful,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> Verb {
        self.method
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub fn restful(&self) -> bool {
        self.restful
    }

    /// Help text: verb header followed by the server's documentation
    pub fn help(&self) -> String {
        format!(
            "method: {}\n---\n{}",
            self.method.to_string().to_lowercase(),
            self.doc
        )
    }

    /// Route the call arguments into uri, query params and form fields.
    ///
    /// No I/O happens here; template and argument errors surface before the
    /// request is sent.
    pub fn prepare(&self, resource: &Resource, call: CallArgs) -> Result<PreparedRequest> {
        let url = format_uri(resource.uri(), &call.uri_args())?;

        let CallArgs {
            mut kwargs,
            mut args,
            params: explicit_params,
            files: explicit_files,
        } = call;

        // consumed by the uri
        for reserved in resource.params() {
            kwargs.remove(reserved);
            args.remove(reserved);
        }

        if let Some(name) = kwargs.keys().next() {
            return Err(Error::UnexpectedArgument { name: name.clone() });
        }

        let mut params = Map::new();
        let mut files = None;

        if self.method.uses_query() {
            params = explicit_params.unwrap_or(args);
        } else {
            files = Some(convert_files(explicit_files.unwrap_or(args)));
        }

        // the declared tag always wins over caller-supplied `op`
        if let Some(op) = &self.op {
            params.insert("op".to_string(), Value::String(op.clone()));
        }

        Ok(PreparedRequest {
            verb: self.method,
            url,
            params,
            files,
        })
    }

    /// Invoke the operation on `resource`.
    ///
    /// A 2xx answer decodes to [`Reply::Json`], or [`Reply::Status`] for
    /// DELETE. Any other status is an [`Error::Api`] carrying the body.
    pub async fn invoke(&self, resource: &Resource, call: CallArgs) -> Result<Reply> {
        let request = self.prepare(resource, call)?;

        tracing::debug!(
            "invoke {}.{} ({} {})",
            resource.name(),
            self.name,
            request.verb,
            request.url
        );

        let response = resource
            .session()
            .request(
                request.verb,
                &request.url,
                &request.params,
                request.files.as_ref(),
            )
            .await?;

        if !response.ok() {
            return Err(Error::Api {
                status: response.status_code(),
                body: response.text().to_string(),
            });
        }

        match self.method {
            Verb::Delete => Ok(Reply::Status(response.status_code())),
            _ => Ok(Reply::Json(response.json()?)),
        }
    }
}
