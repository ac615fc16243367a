//! Dynamic client for the MAAS REST API.
//!
//! The server publishes a describe document listing its handlers and their
//! actions. [`MaasClient`] turns it into [`Resource`]s holding callable
//! [`Operation`]s, and keeps a local [`RecordCache`] per record kind that
//! can be searched offline with a [`FilterSpec`].
//!
//! ```ignore
//! use maas_client::{FilterSpec, MaasClient};
//!
//! let mut client = MaasClient::connect("http://maas:5240/MAAS", &api_key).await?;
//! let ready = client
//!     .find_machines(&FilterSpec::new().with("status_name", "Ready"), true)
//!     .await?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod maas;
pub mod resource;

pub use cache::filter::{FilterSpec, Matcher};
pub use cache::{RecordCache, RecordKind};
pub use error::{Error, Result};
pub use maas::client::MaasClient;
pub use resource::{CallArgs, Operation, Reply, Resource};
