//! Notification Port
//!
//! User-facing notices raised by the list core, most importantly fetch
//! failures. The port is injected into loaders at construction; there is no
//! global toast handle. Render surfaces receive notices through a
//! [`ChannelNotifier`] and drain them on their own thread.

use std::sync::Arc;

use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::error::{Error, Result};

/// Severity of a notice
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A message for the user
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: Arc<str>,
    pub message: Arc<str>,
    pub timestamp: DateTime<Local>,
}

impl Notice {
    /// Create a notice with current timestamp
    pub fn new(level: NoticeLevel, title: impl Into<Arc<str>>, message: impl Into<Arc<str>>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            timestamp: Local::now(),
        }
    }

    pub fn info(title: impl Into<Arc<str>>, message: impl Into<Arc<str>>) -> Self {
        Self::new(NoticeLevel::Info, title, message)
    }

    pub fn error(title: impl Into<Arc<str>>, message: impl Into<Arc<str>>) -> Self {
        Self::new(NoticeLevel::Error, title, message)
    }
}

/// Sink for user-facing notices
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notice: Notice);
}

/// Drops every notice; the default when no UI is attached
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notice: Notice) {}
}

/// Writes notices to the log
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => {
                tracing::error!(title = %notice.title, "{}", notice.message)
            }
            NoticeLevel::Warning => {
                tracing::warn!(title = %notice.title, "{}", notice.message)
            }
            NoticeLevel::Info | NoticeLevel::Success => {
                tracing::info!(title = %notice.title, "{}", notice.message)
            }
        }
    }
}

/// Forwards notices over a channel to a render surface
#[derive(Clone, Debug)]
pub struct ChannelNotifier {
    tx: Sender<Notice>,
}

impl ChannelNotifier {
    pub fn new(tx: Sender<Notice>) -> Self {
        Self { tx }
    }

    /// Create a notifier together with the receiving end
    pub fn channel() -> (Self, Receiver<Notice>) {
        let (tx, rx) = unbounded();
        (Self::new(tx), rx)
    }

    /// Send a notice, failing if the receiver is gone
    pub fn try_notify(&self, notice: Notice) -> Result<()> {
        self.tx.send(notice).map_err(|e| Error::ChannelSend {
            message: e.to_string(),
        })
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        if let Err(e) = self.try_notify(notice) {
            tracing::debug!(error = %e, "Notice dropped, receiver closed");
        }
    }
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, notice: Notice) {
        (**self).notify(notice)
    }
}
