//! Dashboard event sink
//!
//! Where re-rendered views, rebuilt selectors and upload progress go after
//! the dashboard has updated its own state. The WebSocket hub implements
//! this to push updates to open dashboards.

use super::notifier::RecipientSelector;
use super::upload::UploadState;

pub trait DashboardEvents: Send + Sync {
    fn view_rendered(&self, _view: &str, _count: usize, _markup: &str) {}

    fn recipients_changed(&self, _selector: &RecipientSelector) {}

    fn upload_progress(&self, _state: &UploadState) {}
}

/// Discards every event
pub struct NoopEvents;

impl DashboardEvents for NoopEvents {}
