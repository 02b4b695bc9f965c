//! API client for the cloud-drive backend.
//!
//! `client` runs every call through the request/response pipeline; the
//! domain modules (`file`, `share`, `search`, `user`) are thin functions
//! that validate their inputs and describe one request each.

pub mod client;
pub mod download;
pub mod error;
pub mod file;
pub mod pipeline;
pub mod progress;
pub mod search;
pub mod share;
pub mod transport;
pub mod types;
pub mod user;


pub use client::{ApiClient, ApiClientBuilder};
pub use download::DownloadedFile;
pub use error::{ApiError, RedirectTiming};
pub use progress::{UploadEvent, UploadProgress};
pub use transport::{ApiRequest, ReqwestTransport, Transport};
