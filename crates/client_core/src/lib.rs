//! View controllers for the package lifecycle: a paginated list over the
//! search endpoint and a detail view issuing pack/deliver/cancel commands,
//! both re-synced by realtime refresh signals.
//!
//! Controllers own their state for the lifetime of a view and catch every
//! failure at their own boundary; nothing propagates to callers, all
//! failures terminate in a transient [`Notice`].

use shared::error::GatewayError;
use tokio::sync::broadcast;

mod detail;
mod list;
mod status;

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

pub use detail::{DetailPhase, DetailState, PackageDetailController, TransitionKind};
pub use list::{ListState, PackageListController, PackageRow};
pub use status::{status_badge, StatusBadge, Tone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// Transient user-visible notification. Rendering is owned by an external
/// UI collaborator; controllers only emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// One notice per message, in backend order.
fn notify_failure(notices: &broadcast::Sender<Notice>, err: &GatewayError) {
    for message in err.messages() {
        let _ = notices.send(Notice::error(message));
    }
}
