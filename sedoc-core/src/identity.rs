//! Document identity keys and activation.
//!
//! A document is re-identified across calls by its normalised path; the
//! lower-cased display name is only used when the caller has no path at
//! all.  When a path is supplied, name equality never produces a match.

use crate::collection::items;
use crate::config::EngineConfig;
use crate::document::{active_document, DocumentFields};
use crate::errors::SolidEdgeError;
use crate::variant::{AutomationObject, Handle};

// ---------------------------------------------------------------------------
// Path normalisation
// ---------------------------------------------------------------------------

/// Split off a drive (`C:`) or UNC (`\\server\share`) prefix.
fn split_prefix(path: &str) -> (&str, &str) {
    if let Some(tail) = path.strip_prefix(r"\\") {
        if let Some(server_end) = tail.find('\\') {
            let after = &tail[server_end + 1..];
            let share_end = after.find('\\').unwrap_or(after.len());
            return path.split_at(2 + server_end + 1 + share_end);
        }
    }
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        return path.split_at(2);
    }
    ("", path)
}

/// Normalise a Windows path for comparison: unify separators, drop `.` and
/// empty components, resolve `..` lexically, and case-fold.
///
/// Returns an empty string for blank input.
pub fn normalize_path(path: &str) -> String {
    let path = path.trim().replace('/', "\\");
    if path.is_empty() {
        return String::new();
    }

    let (prefix, rest) = split_prefix(&path);
    let rooted = rest.starts_with('\\');
    let mut parts: Vec<&str> = Vec::new();
    for part in rest.split('\\') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let mut normalized = String::with_capacity(path.len());
    normalized.push_str(prefix);
    if rooted {
        normalized.push('\\');
    }
    normalized.push_str(&parts.join("\\"));
    if normalized.is_empty() {
        normalized.push('.');
    }
    normalized.to_lowercase()
}

pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Identity key
// ---------------------------------------------------------------------------

/// Which document a caller is asking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityKey {
    /// Normalised path; exclusive, names are ignored.
    Path(String),
    /// Lower-cased display name, used only when no path was given.
    Name(String),
}

impl IdentityKey {
    /// Build the key from the caller's `full_name` / `name` pair.  `None`
    /// when both are blank.
    pub fn new(full_name: Option<&str>, name: Option<&str>) -> Option<Self> {
        let path = full_name.map(normalize_path).unwrap_or_default();
        if !path.is_empty() {
            return Some(IdentityKey::Path(path));
        }
        let name = name.map(normalize_name).unwrap_or_default();
        if !name.is_empty() {
            return Some(IdentityKey::Name(name));
        }
        None
    }

    pub(crate) fn matches(&self, fields: &DocumentFields) -> bool {
        match self {
            IdentityKey::Path(path) => {
                let own = normalize_path(fields.full_name());
                !own.is_empty() && own == *path
            }
            IdentityKey::Name(name) => {
                let own = normalize_name(&fields.name);
                !own.is_empty() && own == *name
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Find the first open document matching `key`.
///
/// Scans `Application.Documents`; when the host offers no enumerable
/// documents at all, the active document is the only candidate.
pub(crate) fn find_document(
    application: &dyn AutomationObject,
    key: &IdentityKey,
    config: &EngineConfig,
) -> Result<Option<(Handle, DocumentFields)>, SolidEdgeError> {
    let collection = match application.get_object("Documents") {
        Ok(collection) => collection,
        Err(e) => {
            log::debug!("Documents collection unavailable: {e}");
            None
        }
    };

    let mut seen = 0usize;
    for document in items(collection.as_deref()) {
        seen += 1;
        match DocumentFields::read(document.as_ref(), config) {
            Ok(fields) if key.matches(&fields) => return Ok(Some((document, fields))),
            Ok(_) => {}
            Err(e) => log::debug!("skipping document during lookup: {e}"),
        }
    }

    if seen == 0 {
        if let Some(active) = active_document(application) {
            if let Ok(fields) = DocumentFields::read(active.as_ref(), config) {
                if key.matches(&fields) {
                    return Ok(Some((active, fields)));
                }
            }
        }
    }
    Ok(None)
}

/// `true` when `fields` describes the host's current active document.
pub(crate) fn is_active_document(
    application: &dyn AutomationObject,
    fields: &DocumentFields,
    config: &EngineConfig,
) -> bool {
    let Some(active) = active_document(application) else {
        return false;
    };
    match DocumentFields::read(active.as_ref(), config) {
        Ok(active_fields) => fields.same_as(&active_fields),
        Err(e) => {
            log::debug!("active document unreadable: {e}");
            false
        }
    }
}

/// Activate the document identified by `full_name` (preferred) or `name`.
///
/// Stops at the first match.  Returns `Ok(false)` when nothing matches.
pub fn activate(
    application: &dyn AutomationObject,
    full_name: Option<&str>,
    name: Option<&str>,
    config: &EngineConfig,
) -> Result<bool, SolidEdgeError> {
    let Some(key) = IdentityKey::new(full_name, name) else {
        return Ok(false);
    };
    match find_document(application, &key, config)? {
        Some((document, fields)) => {
            document.call("Activate", &[]).map_err(|e| {
                SolidEdgeError::DocumentError(format!("Activate({}) failed: {e}", fields.name))
            })?;
            log::debug!("activated {}", fields.full_name());
            Ok(true)
        }
        None => Ok(false),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
