//! Object change notifications.

use crate::{ManagedValue, PropertyName};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One property's change within a write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyChange {
    pub name: PropertyName,
    pub old_value: Option<ManagedValue>,
    pub new_value: Option<ManagedValue>,
}

/// What happened to an observed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "changes", rename_all = "camelCase")]
pub enum ObjectChange {
    /// One or more properties were written
    Change(Vec<PropertyChange>),
    /// The object was deleted; no further notifications follow
    Deleted,
}

/// Callback invoked with each change to an observed object.
pub type ChangeCallback = Arc<dyn Fn(&ObjectChange) + Send + Sync>;

/// Keeps an observation alive. Dropping the token stops notifications.
pub struct NotificationToken {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl NotificationToken {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop receiving notifications. Idempotent.
    pub fn invalidate(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for NotificationToken {
    fn drop(&mut self) {
        self.invalidate();
    }
}

impl fmt::Debug for NotificationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationToken")
            .field("active", &self.is_active())
            .finish()
    }
}
