//! Error types for the MAAS client library.

use thiserror::Error;

/// Errors raised while building the client, invoking operations or
/// refreshing the record cache.
#[derive(Debug, Error)]
pub enum Error {
    /// API key is not of the form `consumer:key:secret`
    #[error("invalid API key: expected 'consumer_key:token_key:token_secret'")]
    InvalidApiKey,

    #[error("invalid MAAS url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The describe endpoint answered with a non-2xx status
    #[error("failed to fetch API description ({status}): {body}")]
    Describe { status: u16, body: String },

    /// The describe document is not valid JSON or lacks required fields
    #[error("malformed API description: {0}")]
    Schema(#[source] serde_json::Error),

    #[error("missing value for '{{{name}}}' in uri template {template}")]
    MissingTemplateArg { template: String, name: String },

    #[error("malformed uri template: {template}")]
    MalformedTemplate { template: String },

    /// A plain keyword argument that is neither a uri parameter nor a
    /// pass-through option
    #[error("unexpected argument '{name}'")]
    UnexpectedArgument { name: String },

    #[error("form field '{field}' must be (filename, content[, content_type[, headers]])")]
    InvalidFormField { field: String },

    #[error("unknown resource: {0}")]
    UnknownResource(String),

    #[error("resource '{resource}' has no operation '{operation}'")]
    UnknownOperation { resource: String, operation: String },

    /// Non-2xx answer to an operation; carries the raw response body
    #[error("API request failed ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode response JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status of a failed exchange, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } | Error::Describe { status, .. } => Some(*status),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
