//! Draft custom properties: locate, read, write.
//!
//! Only documents classified as Draft are touched.  Writes additionally
//! require the draft to be the host's active document, so nothing is ever
//! edited behind the user's back.
//!
//! The write loop is not transactional: if the host rejects one property,
//! the ones already written in the same call stay written.

pub mod value;

pub use value::{coerce, infer, parse_date, CustomProperty, PropertyType, PropertyValue};

use serde::Serialize;

use crate::collection::items;
use crate::config::EngineConfig;
use crate::document::{classify, DocumentFields, DocumentType};
use crate::errors::SolidEdgeError;
use crate::identity::{find_document, is_active_document, IdentityKey};
use crate::variant::{AutomationObject, Handle, Variant};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// What a write call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WriteOutcome {
    /// All named properties were written.
    Applied { written: usize },
    /// No open document matches the requested identity.
    NoMatch,
    /// The matched document is not a Draft.
    NotDraft,
    /// The matched Draft is not the active document; nothing was written.
    NotActive,
    /// The Draft has no custom property set.
    NoCustomSet,
}

impl WriteOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied { .. })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Raw property name; `None` when blank.  Case and surrounding text are
/// kept as the host reports them.
fn property_name(property: &dyn AutomationObject) -> Result<Option<String>, SolidEdgeError> {
    Ok(property
        .get("Name")?
        .into_text()
        .filter(|name| !name.trim().is_empty()))
}

/// Find the custom property set of `document`.
///
/// First scans the property sets for one whose name contains "custom"
/// (any case), then tries a direct `Item(<custom_set_name>)` lookup.
pub fn locate_custom_set(document: &dyn AutomationObject, config: &EngineConfig) -> Option<Handle> {
    let sets = match document.get_object("Properties") {
        Ok(Some(sets)) => sets,
        Ok(None) => return None,
        Err(e) => {
            log::debug!("Properties unavailable: {e}");
            return None;
        }
    };

    for set in items(Some(sets.as_ref())) {
        match set.get_text("Name") {
            Ok(Some(name)) if name.to_lowercase().contains("custom") => return Some(set),
            Ok(_) => {}
            Err(e) => log::debug!("skipping unnamed property set: {e}"),
        }
    }

    match sets.get_with("Item", &[Variant::from(config.custom_set_name.as_str())]) {
        Ok(found) => found.into_object(),
        Err(e) => {
            log::debug!("no {} property set: {e}", config.custom_set_name);
            None
        }
    }
}

/// Read every named property of a set, sorted by case-insensitive name.
pub fn read_set(set: &dyn AutomationObject) -> Vec<CustomProperty> {
    let mut properties = Vec::new();
    let mut iter = items(Some(set));
    for property in iter.by_ref() {
        let name = match property_name(property.as_ref()) {
            Ok(Some(name)) => name,
            Ok(None) => continue,
            Err(e) => {
                log::debug!("skipping property with unreadable name: {e}");
                continue;
            }
        };
        let raw = match property.get("Value") {
            Ok(raw) => raw,
            Err(e) => {
                log::debug!("skipping property {name}: {e}");
                continue;
            }
        };
        match infer(raw) {
            Some((kind, value)) => properties.push(CustomProperty { name, kind, value }),
            None => log::debug!("skipping property {name}: non-scalar value"),
        }
    }
    if iter.skipped() > 0 {
        log::debug!("{} property item(s) could not be retrieved", iter.skipped());
    }

    properties.sort_by_key(|p| p.name.to_lowercase());
    properties
}

/// Update `name` in place when it exists, otherwise add it to the set.
fn apply(set: &dyn AutomationObject, name: &str, value: Variant) -> Result<(), SolidEdgeError> {
    let existing = items(Some(set)).find(|property| {
        property_name(property.as_ref())
            .ok()
            .flatten()
            .is_some_and(|n| n == name)
    });

    match existing {
        Some(property) => property
            .put("Value", value)
            .map_err(|e| SolidEdgeError::PropertyError(format!("update {name}: {e}"))),
        None => set
            .call("Add", &[Variant::from(name), value])
            .map(drop)
            .map_err(|e| SolidEdgeError::PropertyError(format!("add {name}: {e}"))),
    }
}

fn matched_draft(
    application: &dyn AutomationObject,
    full_name: Option<&str>,
    name: Option<&str>,
    config: &EngineConfig,
) -> Result<Option<(Handle, DocumentFields, bool)>, SolidEdgeError> {
    let Some(key) = IdentityKey::new(full_name, name) else {
        return Ok(None);
    };
    Ok(find_document(application, &key, config)?.map(|(document, fields)| {
        let is_draft =
            classify(document.as_ref(), fields.full_name(), &fields.name) == DocumentType::Draft;
        (document, fields, is_draft)
    }))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Read the custom properties of the matching Draft.
///
/// Empty when nothing matches, the match is not a Draft, or it has no
/// custom property set.
pub fn read_custom_properties(
    application: &dyn AutomationObject,
    full_name: Option<&str>,
    name: Option<&str>,
    config: &EngineConfig,
) -> Result<Vec<CustomProperty>, SolidEdgeError> {
    let Some((document, fields, is_draft)) = matched_draft(application, full_name, name, config)?
    else {
        return Ok(Vec::new());
    };
    if !is_draft {
        log::debug!("{} is not a draft, no custom properties read", fields.name);
        return Ok(Vec::new());
    }
    Ok(locate_custom_set(document.as_ref(), config)
        .map(|set| read_set(set.as_ref()))
        .unwrap_or_default())
}

/// Write `properties` to the matching Draft, which must be active.
pub fn write_custom_properties(
    application: &dyn AutomationObject,
    full_name: Option<&str>,
    name: Option<&str>,
    properties: &[CustomProperty],
    config: &EngineConfig,
) -> Result<WriteOutcome, SolidEdgeError> {
    let Some((document, fields, is_draft)) = matched_draft(application, full_name, name, config)?
    else {
        return Ok(WriteOutcome::NoMatch);
    };
    if !is_draft {
        return Ok(WriteOutcome::NotDraft);
    }
    if !is_active_document(application, &fields, config) {
        log::debug!("refusing to write {}: not the active document", fields.name);
        return Ok(WriteOutcome::NotActive);
    }
    let Some(set) = locate_custom_set(document.as_ref(), config) else {
        return Ok(WriteOutcome::NoCustomSet);
    };

    let mut written = 0;
    for property in properties {
        if property.name.trim().is_empty() {
            continue;
        }
        let value = coerce(property.kind, &property.value);
        apply(set.as_ref(), &property.name, value)?;
        written += 1;
    }
    log::debug!("wrote {written} custom propert(ies) to {}", fields.name);
    Ok(WriteOutcome::Applied { written })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
