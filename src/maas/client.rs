//! MAAS Client
//!
//! Main client: fetches the API description once, exposes the resulting
//! resources by name and keeps the per-kind record caches.

use super::auth::Credentials;
use super::http::MaasSession;
use crate::cache::filter::FilterSpec;
use crate::cache::{RecordCache, RecordKind};
use crate::error::{Error, Result};
use crate::resource::{CallArgs, Description, Reply, Resource};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Path of the describe document, relative to the MAAS base url
pub const DESCRIBE_PATH: &str = "/api/2.0/describe/";

/// Main MAAS client
pub struct MaasClient {
    base_url: String,
    session: Arc<MaasSession>,
    description: Value,
    resources: BTreeMap<String, Resource>,
    caches: HashMap<&'static str, RecordCache>,
}

impl MaasClient {
    /// Connect to a MAAS server.
    ///
    /// `url` is the MAAS base url (e.g. `http://maas:5240/MAAS`) and
    /// `api_key` the `consumer:key:secret` triple.
    pub async fn connect(url: &str, api_key: &str) -> Result<Self> {
        let credentials: Credentials = api_key.parse()?;
        let session = MaasSession::new(credentials)?;
        Self::with_session(url, session).await
    }

    /// Build a client over an existing session
    pub async fn with_session(url: &str, session: MaasSession) -> Result<Self> {
        url::Url::parse(url).map_err(|source| Error::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let mut client = Self {
            base_url: url.trim_end_matches('/').to_string(),
            session: Arc::new(session),
            description: Value::Null,
            resources: BTreeMap::new(),
            caches: HashMap::new(),
        };
        client.load_resources().await?;
        client
            .caches
            .insert(RecordKind::MACHINES.name, RecordCache::new(RecordKind::MACHINES));

        Ok(client)
    }

    /// Fetch the describe document and build every resource
    async fn load_resources(&mut self) -> Result<()> {
        let url = format!("{}{}", self.base_url, DESCRIBE_PATH);
        tracing::info!("Loading API description from {}", url);

        let response = self.session.get(&url).await?;
        if !response.ok() {
            return Err(Error::Describe {
                status: response.status_code(),
                body: response.text().to_string(),
            });
        }

        let document: Value = serde_json::from_str(response.text()).map_err(Error::Schema)?;
        let description = Description::from_value(document.clone())?;

        self.resources = description.build_resources(&self.session);
        self.description = document;

        tracing::info!("Loaded {} resources", self.resources.len());
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Raw describe document as returned by the server
    pub fn description(&self) -> &Value {
        &self.description
    }

    /// Look up a resource by its normalized name
    pub fn resource(&self, name: &str) -> Result<&Resource> {
        self.resources
            .get(name)
            .ok_or_else(|| Error::UnknownResource(name.to_string()))
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Invoke `operation` on `resource`
    pub async fn call(&self, resource: &str, operation: &str, call: CallArgs) -> Result<Reply> {
        self.resource(resource)?.call(operation, call).await
    }

    // =========================================================================
    // Cached search
    // =========================================================================

    /// Cache for a record kind, if it has been created
    pub fn cache(&self, kind: RecordKind) -> Option<&RecordCache> {
        self.caches.get(kind.name)
    }

    /// Update the local cache of `kind` with the results of a read.
    ///
    /// An empty `filter_args` loads the whole collection.
    pub async fn reload_cache(
        &mut self,
        kind: RecordKind,
        filter_args: Map<String, Value>,
        reset: bool,
    ) -> Result<usize> {
        let resource = self
            .resources
            .get(kind.resource)
            .ok_or_else(|| Error::UnknownResource(kind.resource.to_string()))?;

        let cache = self
            .caches
            .entry(kind.name)
            .or_insert_with(|| RecordCache::new(kind));

        cache.refresh(resource, filter_args, reset).await
    }

    /// Identifiers of cached records of `kind` matching `spec`.
    ///
    /// With `update`, the cache is refreshed from the server first.
    pub async fn find_ids(
        &mut self,
        kind: RecordKind,
        spec: &FilterSpec,
        update: bool,
    ) -> Result<HashSet<String>> {
        if update {
            self.reload_cache(kind, Map::new(), false).await?;
        }

        Ok(self
            .cache(kind)
            .map(|cache| cache.match_ids(spec))
            .unwrap_or_default())
    }

    /// Cached records of `kind` matching `spec`, in no particular order
    pub async fn find(
        &mut self,
        kind: RecordKind,
        spec: &FilterSpec,
        update: bool,
    ) -> Result<Vec<Value>> {
        let ids = self.find_ids(kind, spec, update).await?;

        Ok(self
            .cache(kind)
            .map(|cache| cache.select(ids).cloned().collect())
            .unwrap_or_default())
    }

    pub async fn reload_machines(&mut self, filter_args: Map<String, Value>, reset: bool) -> Result<usize> {
        self.reload_cache(RecordKind::MACHINES, filter_args, reset).await
    }

    pub async fn find_machine_ids(&mut self, spec: &FilterSpec, update: bool) -> Result<HashSet<String>> {
        self.find_ids(RecordKind::MACHINES, spec, update).await
    }

    pub async fn find_machines(&mut self, spec: &FilterSpec, update: bool) -> Result<Vec<Value>> {
        self.find(RecordKind::MACHINES, spec, update).await
    }
}

/// Format a client error for display
/// Security: avoids echoing raw server bodies for well-known statuses
pub fn format_api_error(error: &anyhow::Error) -> String {
    if let Some(err) = error.downcast_ref::<Error>() {
        match err.status() {
            Some(401) => return "Authentication failed. Check your MAAS API key.".to_string(),
            Some(403) => return "Permission denied for this MAAS user.".to_string(),
            Some(404) => return "Resource not found.".to_string(),
            Some(409) => return "Conflict. The object may be in a state that forbids this action.".to_string(),
            Some(503) => return "MAAS is temporarily unavailable. Please try again.".to_string(),
            _ => {}
        }
    }

    let error_str = format!("{:#}", error);

    let sanitized = error_str
        .chars()
        .filter(|c| !c.is_control())
        .take(300)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
