//! Notification event produced by mutating operations.
//!
//! # Responsibility
//! - Describe who must be informed about a change to which item.
//!
//! # Invariants
//! - Events never target the requester of the originating operation.
//! - Event content is dispatch-ready metadata; templating happens outside
//!   the core.

use crate::model::item::ItemId;
use serde::{Deserialize, Serialize};

/// One recipient to inform about one item change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Identity to notify.
    pub recipient: String,
    /// Item the notification is about.
    pub content_id: ItemId,
    /// Item label at the time of the change.
    pub content_name: String,
}

impl Event {
    /// Creates a dispatch-ready event.
    pub fn new(recipient: impl Into<String>, content_id: ItemId, content_name: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            content_id,
            content_name: content_name.into(),
        }
    }
}
