//! Best-effort host probe used to enrich failure messages.
//!
//! Every field is read independently; a field that cannot be read takes its
//! default instead of failing the probe.

use serde::Serialize;

use crate::document::active_document;
use crate::variant::AutomationObject;

/// Snapshot of what the host reports about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub active_document_name: Option<String>,
    /// `-1` when the document count could not be read.
    pub documents_count: i64,
    pub visible: bool,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            active_document_name: None,
            documents_count: -1,
            visible: false,
        }
    }
}

impl Diagnostics {
    /// ` | active=<name>, count=<n>, visible=<bool>` suffix for messages.
    pub fn summary(&self) -> String {
        format!(
            " | active={}, count={}, visible={}",
            self.active_document_name.as_deref().unwrap_or("None"),
            self.documents_count,
            self.visible
        )
    }
}

/// Probe the attached application.
pub fn probe(application: &dyn AutomationObject) -> Diagnostics {
    let active_document_name = active_document(application)
        .and_then(|doc| doc.get_text("Name").ok().flatten());

    let documents_count = application
        .get_object("Documents")
        .ok()
        .flatten()
        .and_then(|docs| docs.get("Count").ok())
        .and_then(|count| count.as_i64())
        .unwrap_or(-1);

    let visible = application
        .get("Visible")
        .ok()
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    Diagnostics {
        active_document_name,
        documents_count,
        visible,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
