//! Side-effect ports supplied by whatever hosts the client.
//!
//! The HTTP pipeline and the router stay pure; the only ways they reach the
//! outside world are these traits. The CLI wires them to stderr and the
//! `Router`; tests wire them to recorders.

use std::sync::Arc;
use std::time::Duration;

/// Default display time for a notice, matching the web UI toast.
pub const NOTICE_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn label(&self) -> &str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

/// A user-visible message.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub duration: Duration,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
            duration: NOTICE_DURATION,
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Navigation requests raised by the HTTP pipeline.
pub trait Navigator: Send + Sync {
    /// Full path (with query) of the location currently displayed.
    fn current_path(&self) -> String;

    /// Replace the current location with the login route, carrying `redirect`
    /// as the path to return to. `delay` is zero for an immediate redirect.
    fn redirect_to_login(&self, redirect: &str, delay: Duration);
}

/// Receives the document title computed by the navigation guard.
pub trait TitleSink: Send + Sync {
    fn set_title(&self, title: &str);
}

/// Notifier that routes notices into the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Error => log::error!("{}", notice.message),
            NoticeLevel::Warning => log::warn!("{}", notice.message),
            NoticeLevel::Info | NoticeLevel::Success => log::info!("{}", notice.message),
        }
    }
}

/// Navigator for hosts without any routing; only logs the request.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedNavigator;

impl Navigator for DetachedNavigator {
    fn current_path(&self) -> String {
        "/".to_string()
    }

    fn redirect_to_login(&self, redirect: &str, delay: Duration) {
        log::info!(
            "Login required (would redirect from {} after {}ms)",
            redirect,
            delay.as_millis()
        );
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogTitle;

impl TitleSink for LogTitle {
    fn set_title(&self, title: &str) {
        log::debug!("Title: {}", title);
    }
}

/// The host ports the HTTP client needs.
#[derive(Clone)]
pub struct Ports {
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
}

impl Ports {
    pub fn new(notifier: Arc<dyn Notifier>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            notifier,
            navigator,
        }
    }
}

impl Default for Ports {
    fn default() -> Self {
        Self::new(Arc::new(LogNotifier), Arc::new(DetachedNavigator))
    }
}
