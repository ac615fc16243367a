//! Resource abstraction layer
//!
//! The server describes its own API, so nothing here is hard-coded per
//! endpoint. Resources and their operations are synthesized at runtime
//! from the describe document.
//!
//! # Architecture
//!
//! - [`naming`] - Turns handler names (`MachinesHandler`) into resource names (`machines`)
//! - [`registry`] - Describe document types and the [`Resource`] built from each entry
//! - [`operation`] - Argument routing and invocation of a single action
//! - [`template`] - Uri template substitution
//!
//! # Example
//!
//! ```ignore
//! use maas_client::resource::CallArgs;
//!
//! async fn list_machines(client: &MaasClient) -> maas_client::Result<serde_json::Value> {
//!     let machines = client.resource("machines")?;
//!     Ok(machines.call("read", CallArgs::new()).await?.into_json())
//! }
//! ```

pub mod naming;
pub mod operation;
pub mod registry;
pub mod template;

pub use naming::handler_command_name;
pub use operation::{convert_files, CallArgs, FormField, Operation, PreparedRequest, Reply};
pub use registry::{
    Description, OperationSpec, Resource, ResourceAuth, ResourceDescription, Verb,
};
