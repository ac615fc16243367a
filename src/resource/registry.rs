//! Resource Registry - build resources from the server's describe document
//!
//! The describe document lists every handler the server exposes. Each
//! authenticated handler becomes a [`Resource`] holding one [`Operation`]
//! per declared action.

use super::naming::handler_command_name;
use super::operation::{CallArgs, Operation, Reply};
use crate::error::{Error, Result};
use crate::maas::http::MaasSession;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// HTTP verb of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub fn as_method(self) -> reqwest::Method {
        match self {
            Verb::Get => reqwest::Method::GET,
            Verb::Post => reqwest::Method::POST,
            Verb::Put => reqwest::Method::PUT,
            Verb::Delete => reqwest::Method::DELETE,
        }
    }

    /// GET and DELETE carry their data in the query string
    pub fn uses_query(self) -> bool {
        matches!(self, Verb::Get | Verb::Delete)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_method().as_str())
    }
}

/// Action definition from the describe document
#[derive(Debug, Clone, Deserialize)]
pub struct OperationSpec {
    pub name: String,
    pub method: Verb,
    /// Query-operation tag, sent as `?op=<tag>`
    #[serde(default)]
    pub op: Option<String>,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub restful: bool,
}

/// Authenticated handler definition
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceAuth {
    pub uri: String,
    /// Template parameters consumed by the uri
    pub params: BTreeSet<String>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub doc: Option<String>,
    pub actions: Vec<OperationSpec>,
}

/// One entry of the describe document's `resources` list
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDescription {
    pub name: String,
    #[serde(default)]
    pub auth: Option<ResourceAuth>,
}

/// Root structure of `GET /api/2.0/describe/`
#[derive(Debug, Clone, Deserialize)]
pub struct Description {
    pub resources: Vec<ResourceDescription>,
}

impl Description {
    /// Parse a describe document
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(Error::Schema)
    }

    /// Build every authenticated resource, keyed by its normalized name
    pub fn build_resources(&self, session: &Arc<MaasSession>) -> BTreeMap<String, Resource> {
        let mut resources = BTreeMap::new();

        for entry in &self.resources {
            let Some(auth) = &entry.auth else {
                continue;
            };

            let name = handler_command_name(&entry.name);
            let resource = Resource::new(&name, Arc::clone(session), auth);
            if resources.insert(name.clone(), resource).is_some() {
                tracing::warn!("Handler {} replaces an earlier resource '{}'", entry.name, name);
            }
        }

        resources
    }
}

/// A remote collection exposing the operations of one handler
#[derive(Clone)]
pub struct Resource {
    name: String,
    session: Arc<MaasSession>,
    uri: String,
    params: BTreeSet<String>,
    path: String,
    doc: Option<String>,
    operations: BTreeMap<String, Operation>,
}

impl Resource {
    pub fn new(name: &str, session: Arc<MaasSession>, definition: &ResourceAuth) -> Self {
        let operations = definition
            .actions
            .iter()
            .map(|spec| (spec.name.clone(), Operation::new(spec)))
            .collect();

        Self {
            name: name.to_string(),
            session,
            uri: definition.uri.clone(),
            params: definition.params.clone(),
            path: definition.path.clone(),
            doc: definition.doc.clone(),
            operations,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Reserved template parameter names
    pub fn params(&self) -> &BTreeSet<String> {
        &self.params
    }

    pub fn session(&self) -> &MaasSession {
        &self.session
    }

    /// Look up an operation by name
    pub fn operation(&self, name: &str) -> Result<&Operation> {
        self.operations
            .get(name)
            .ok_or_else(|| Error::UnknownOperation {
                resource: self.name.clone(),
                operation: name.to_string(),
            })
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    /// Invoke the named operation on this resource
    pub async fn call(&self, operation: &str, call: CallArgs) -> Result<Reply> {
        self.operation(operation)?.invoke(self, call).await
    }

    /// Help text: handler path and its documentation
    pub fn help(&self) -> String {
        let mut text = format!("path: {:?}", self.path);
        if let Some(doc) = self.doc.as_deref().filter(|d| !d.is_empty()) {
            text.push_str("\ndoc: ");
            text.push_str(doc);
        }
        text
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("uri", &self.uri)
            .field("params", &self.params)
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}
