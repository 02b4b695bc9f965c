//! Client library for the cloud-drive backend.
//!
//! - `api`: HTTP client pipeline and the file/share/search/user endpoints
//! - `session`: token and cached profile, persisted through a `KeyValueStore`
//! - `router`: route table and the authentication guard
//! - `host`: ports the embedding application implements (notices, navigation, title)

pub mod api;
pub mod config;
pub mod host;
pub mod router;
pub mod session;

pub use api::{ApiClient, ApiError};
pub use config::ClientConfig;
pub use router::Router;
pub use session::Session;
