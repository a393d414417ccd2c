//! Submit controls
//!
//! A form's submit button: disabled with a busy label while its action
//! runs, restored when the action ends either way. Disabling is the only
//! exclusion mechanism; a second submit while busy is rejected, not queued.
//!
//! List rows carry their own action buttons ([`RowControls`]); each row's
//! button is busy independently of the others.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use super::error::{PortalError, PortalResult};
use crate::live::{lock, read, write};

/// Observable state of a control
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlState {
    pub id: String,
    pub label: String,
    pub disabled: bool,
}

pub struct SubmitControl {
    id: String,
    idle_label: String,
    busy: AtomicBool,
    label: RwLock<String>,
}

impl SubmitControl {
    pub fn new(id: impl Into<String>, idle_label: impl Into<String>) -> Self {
        let idle_label = idle_label.into();
        Self {
            id: id.into(),
            label: RwLock::new(idle_label.clone()),
            idle_label,
            busy: AtomicBool::new(false),
        }
    }

    /// Disable the control for the duration of an action
    pub fn begin(&self, busy_label: &str) -> PortalResult<BusyGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PortalError::Busy(self.idle_label.clone()));
        }

        *write(&self.label) = busy_label.to_string();
        Ok(BusyGuard { control: self })
    }

    pub fn is_disabled(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn label(&self) -> String {
        read(&self.label).clone()
    }

    pub fn state(&self) -> ControlState {
        ControlState {
            id: self.id.clone(),
            label: self.label(),
            disabled: self.is_disabled(),
        }
    }
}

/// Re-enables its control when dropped
pub struct BusyGuard<'a> {
    control: &'a SubmitControl,
}

impl BusyGuard<'_> {
    /// Change the busy label mid-action
    pub fn set_label(&self, label: &str) {
        *write(&self.control.label) = label.to_string();
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        *write(&self.control.label) = self.control.idle_label.clone();
        self.control.busy.store(false, Ordering::Release);
    }
}

/// One action button per list row, e.g. every investor's "Remove"
pub struct RowControls {
    action: String,
    idle_label: String,
    /// Row id to busy label
    busy: Mutex<HashMap<String, String>>,
}

impl RowControls {
    pub fn new(action: impl Into<String>, idle_label: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            idle_label: idle_label.into(),
            busy: Mutex::new(HashMap::new()),
        }
    }

    /// Disable `row`'s button for the duration of an action
    pub fn begin(&self, row: &str, busy_label: &str) -> PortalResult<RowGuard<'_>> {
        let mut busy = lock(&self.busy);
        if busy.contains_key(row) {
            return Err(PortalError::Busy(self.idle_label.clone()));
        }
        busy.insert(row.to_string(), busy_label.to_string());
        Ok(RowGuard {
            controls: self,
            row: row.to_string(),
        })
    }

    pub fn is_disabled(&self, row: &str) -> bool {
        lock(&self.busy).contains_key(row)
    }

    pub fn state(&self, row: &str) -> ControlState {
        let label = lock(&self.busy).get(row).cloned();
        ControlState {
            id: format!("{}-{}", self.action, row),
            disabled: label.is_some(),
            label: label.unwrap_or_else(|| self.idle_label.clone()),
        }
    }
}

/// Re-enables its row's button when dropped
pub struct RowGuard<'a> {
    controls: &'a RowControls,
    row: String,
}

impl Drop for RowGuard<'_> {
    fn drop(&mut self) {
        lock(&self.controls.busy).remove(&self.row);
    }
}
