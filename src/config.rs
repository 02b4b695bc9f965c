//! Client configuration, resolved from the environment.
//!
//! API base URL: CLOUD_DRIVE_API_URL > VITE_API_BASE_URL > localhost default.
//! A `.env` file in the working directory is honoured (shared with the web
//! front-end's Vite variables).

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Time the session-expired notice stays up before a transport 401 redirects.
pub const DEFAULT_AUTH_REDIRECT_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_APP_TITLE: &str = "Cloud Drive";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub auth_redirect_delay: Duration,
    /// Suffix of every document title, and the fallback title.
    pub app_title: String,
    /// Directory holding the persisted session files.
    pub store_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            auth_redirect_delay: DEFAULT_AUTH_REDIRECT_DELAY,
            app_title: DEFAULT_APP_TITLE.to_string(),
            store_dir: default_store_dir(),
        }
    }
}

impl ClientConfig {
    /// Load `.env` (if present) and resolve the config from the environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("CLOUD_DRIVE_API_URL").or_else(|| lookup("VITE_API_BASE_URL")) {
            config = config.with_base_url(&url);
        }

        if let Some(raw) = lookup("CLOUD_DRIVE_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => log::warn!("Ignoring invalid CLOUD_DRIVE_TIMEOUT_SECS={:?}", raw),
            }
        }

        if let Some(dir) = lookup("CLOUD_DRIVE_STORE_DIR").filter(|d| !d.trim().is_empty()) {
            config.store_dir = PathBuf::from(dir);
        }

        config
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        let trimmed = base_url.trim().trim_end_matches('/');
        if !trimmed.is_empty() {
            self.base_url = trimmed.to_string();
        }
        self
    }

    /// Absolute URL for an API path such as `/file/list`.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("cloud-drive")
}
