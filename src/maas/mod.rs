//! MAAS API interaction module
//!
//! This module provides the connection side of the client: OAuth signing,
//! the HTTP session shared by every resource, and the client that
//! bootstraps itself from the server's describe document.
//!
//! # Module Structure
//!
//! - [`auth`] - OAuth 1.0 PLAINTEXT credentials parsed from a MAAS API key
//! - [`client`] - Main MAAS client: resources and record caches
//! - [`http`] - HTTP session and raw responses
//!
//! # Example
//!
//! ```ignore
//! use maas_client::maas::client::MaasClient;
//!
//! async fn example() -> maas_client::Result<()> {
//!     let client = MaasClient::connect("http://maas:5240/MAAS", "consumer:key:secret").await?;
//!     let machines = client.call("machines", "read", Default::default()).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
