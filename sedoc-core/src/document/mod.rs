//! Open-document discovery.
//!
//! [`enumerate`] walks `Application.Documents`, classifies every entry and
//! marks the active one.  Hosts that only expose `ActiveDocument` (no usable
//! collection) still produce a single-entry list.  Any document whose fields
//! cannot be read is logged and left out; it never aborts the enumeration.

pub mod info;

pub use info::{DocumentInfo, DocumentType};

use serde::Serialize;

use crate::collection::items;
use crate::config::EngineConfig;
use crate::errors::SolidEdgeError;
use crate::identity::{normalize_name, normalize_path};
use crate::variant::AutomationObject;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Extension of the final path component, without the dot.
pub fn extension_of(path: &str) -> Option<&str> {
    let file = path.rsplit(['\\', '/']).next().unwrap_or(path);
    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Decide the document type.  A recognised extension (of `full_name`, or of
/// `display_name` when there is no path) always wins over the raw type code,
/// which is only consulted when the extension says nothing.
pub fn resolve_type(
    full_name: &str,
    display_name: &str,
    type_code: impl FnOnce() -> Option<i64>,
) -> DocumentType {
    let source = if full_name.trim().is_empty() {
        display_name
    } else {
        full_name
    };
    extension_of(source.trim())
        .and_then(DocumentType::from_extension)
        .or_else(|| type_code().and_then(DocumentType::from_type_code))
        .unwrap_or(DocumentType::Unknown)
}

/// Classify a live document handle.
pub fn classify(
    document: &dyn AutomationObject,
    full_name: &str,
    display_name: &str,
) -> DocumentType {
    resolve_type(full_name, display_name, || match document.get("Type") {
        Ok(code) => code.as_i64(),
        Err(e) => {
            log::debug!("document Type unavailable for {display_name}: {e}");
            None
        }
    })
}

// ---------------------------------------------------------------------------
// Field reading
// ---------------------------------------------------------------------------

/// Name and path as read from one document handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DocumentFields {
    pub name: String,
    /// `None` when the host has no path for the document (e.g. unsaved).
    pub path: Option<String>,
}

impl DocumentFields {
    /// Read `Name` / `FullName`.  Fails only when `Name` itself raises.
    pub fn read(
        document: &dyn AutomationObject,
        config: &EngineConfig,
    ) -> Result<Self, SolidEdgeError> {
        let name = document
            .get_text("Name")?
            .unwrap_or_else(|| config.untitled_name.clone());
        let path = match document.get_text("FullName") {
            Ok(path) => path,
            Err(e) => {
                log::debug!("FullName unavailable for {name}: {e}");
                None
            }
        };
        Ok(Self { name, path })
    }

    /// `FullName`, defaulting to the display name.
    pub fn full_name(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }

    /// Same document as `other`: by normalised path when both have one,
    /// otherwise by normalised name.
    pub fn same_as(&self, other: &DocumentFields) -> bool {
        match (&self.path, &other.path) {
            (Some(a), Some(b)) => normalize_path(a) == normalize_path(b),
            _ => normalize_name(&self.name) == normalize_name(&other.name),
        }
    }

    fn into_info(self, document: &dyn AutomationObject, is_active: bool) -> DocumentInfo {
        let document_type = classify(document, self.full_name(), &self.name);
        let full_name = self.full_name().to_owned();
        DocumentInfo {
            name: self.name,
            full_name,
            document_type,
            is_active,
        }
    }
}

// ---------------------------------------------------------------------------
// Enumeration
// ---------------------------------------------------------------------------

/// Result of one enumeration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Enumeration {
    pub documents: Vec<DocumentInfo>,
    pub active_name: Option<String>,
}

/// Read the active document handle, treating a raising or empty property as
/// "no active document".
pub(crate) fn active_document(
    application: &dyn AutomationObject,
) -> Option<Box<dyn AutomationObject>> {
    match application.get_object("ActiveDocument") {
        Ok(active) => active,
        Err(e) => {
            log::debug!("no active document: {e}");
            None
        }
    }
}

/// Enumerate every open document.
pub fn enumerate(
    application: &dyn AutomationObject,
    config: &EngineConfig,
) -> Result<Enumeration, SolidEdgeError> {
    let active = active_document(application);
    let active_fields = active
        .as_deref()
        .and_then(|doc| match DocumentFields::read(doc, config) {
            Ok(fields) => Some(fields),
            Err(e) => {
                log::debug!("active document fields unreadable: {e}");
                None
            }
        });

    let collection = match application.get_object("Documents") {
        Ok(collection) => collection,
        Err(e) => {
            log::debug!("Documents collection unavailable: {e}");
            None
        }
    };

    let mut documents = Vec::new();
    let mut iter = items(collection.as_deref());
    for document in iter.by_ref() {
        let fields = match DocumentFields::read(document.as_ref(), config) {
            Ok(fields) => fields,
            Err(e) => {
                log::debug!("skipping document with unreadable fields: {e}");
                continue;
            }
        };
        let is_active = active_fields
            .as_ref()
            .is_some_and(|active| fields.same_as(active));
        documents.push(fields.into_info(document.as_ref(), is_active));
    }
    if iter.skipped() > 0 {
        log::debug!("{} document(s) could not be retrieved", iter.skipped());
    }
    drop(iter);

    if documents.is_empty() {
        if let (Some(doc), Some(fields)) = (active.as_deref(), active_fields.clone()) {
            log::debug!("collection empty, falling back to the active document");
            documents.push(fields.into_info(doc, true));
        }
    }

    sort_documents(&mut documents);

    Ok(Enumeration {
        documents,
        active_name: active_fields.map(|f| f.name),
    })
}

/// Active document first, the rest by case-insensitive name.  Stable.
pub fn sort_documents(documents: &mut [DocumentInfo]) {
    documents.sort_by(|a, b| {
        b.is_active
            .cmp(&a.is_active)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
