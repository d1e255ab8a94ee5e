//! Background actions and their structured results.
//!
//! A caller (the `sedoc-worker` binary, or any host that owns its own
//! thread) hands an [`Action`] to [`run_action`] and gets back a
//! [`Payload`].  Nothing fails across this boundary: every error is folded
//! into `ok: false` plus a user-facing message.

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::document::DocumentInfo;
use crate::engine::Engine;
use crate::properties::{CustomProperty, WriteOutcome};
use crate::session::Runtime;

const CONNECT_FAILED: &str = "Error: Solid Edge must be open with at least one active document.";

/// One unit of background work.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Connect,
    Refresh,
    Disconnect,
    Activate {
        #[serde(default)]
        full_name: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
    DraftCustomProperties {
        #[serde(default)]
        full_name: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        selection_key: Option<String>,
    },
    SaveDraftCustomProperties {
        #[serde(default)]
        full_name: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default, rename = "custom_properties")]
        properties: Vec<CustomProperty>,
    },
    Probe,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Connect => "connect",
            Action::Refresh => "refresh",
            Action::Disconnect => "disconnect",
            Action::Activate { .. } => "activate",
            Action::DraftCustomProperties { .. } => "draft_custom_properties",
            Action::SaveDraftCustomProperties { .. } => "save_draft_custom_properties",
            Action::Probe => "probe",
        }
    }
}

/// Result of one [`Action`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload {
    pub ok: bool,
    pub message: String,
    pub documents: Vec<DocumentInfo>,
    pub active_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_properties: Option<Vec<CustomProperty>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

impl Payload {
    fn new(ok: bool, message: impl Into<String>) -> Self {
        Self {
            ok,
            message: message.into(),
            documents: Vec::new(),
            active_name: None,
            custom_properties: None,
            selection_key: None,
            diagnostics: None,
        }
    }

    fn success(message: impl Into<String>) -> Self {
        Self::new(true, message)
    }

    fn failure(message: impl Into<String>) -> Self {
        Self::new(false, message)
    }
}

/// Execute `action` against `engine`.
pub fn run_action<R: Runtime>(engine: &Engine<R>, action: Action) -> Payload {
    log::debug!("running action {}", action.name());
    match action {
        Action::Connect | Action::Refresh => connect_or_refresh(engine),
        Action::Disconnect => match engine.disconnect() {
            Ok(()) => Payload::success("Disconnected."),
            Err(e) => {
                log::warn!("disconnect failed: {e}");
                Payload::failure("Error: Failed to disconnect from Solid Edge.")
            }
        },
        Action::Activate { full_name, name } => {
            activate(engine, full_name.as_deref(), name.as_deref())
        }
        Action::DraftCustomProperties {
            full_name,
            name,
            selection_key,
        } => {
            let mut payload =
                match engine.read_custom_properties(full_name.as_deref(), name.as_deref()) {
                    Ok(properties) => {
                        let mut payload = Payload::success("Loaded draft custom properties.");
                        payload.custom_properties = Some(properties);
                        payload
                    }
                    Err(e) => {
                        log::warn!("reading draft custom properties failed: {e}");
                        let mut payload = Payload::failure("Failed to load draft custom properties.");
                        payload.custom_properties = Some(Vec::new());
                        payload
                    }
                };
            payload.selection_key = selection_key;
            payload
        }
        Action::SaveDraftCustomProperties {
            full_name,
            name,
            properties,
        } => match engine.write_custom_properties(
            full_name.as_deref(),
            name.as_deref(),
            &properties,
        ) {
            Ok(outcome) => Payload::new(outcome.applied(), save_message(outcome)),
            Err(e) => {
                log::warn!("saving draft custom properties failed: {e}");
                Payload::failure("Failed to save draft custom properties.")
            }
        },
        Action::Probe => match engine.probe() {
            Ok(diagnostics) => {
                let mut payload = Payload::success("Diagnostics collected.");
                payload.active_name = diagnostics.active_document_name.clone();
                payload.diagnostics = Some(diagnostics);
                payload
            }
            Err(e) => Payload::failure(format!("Error: {e}")),
        },
    }
}

fn connect_or_refresh<R: Runtime>(engine: &Engine<R>) -> Payload {
    match engine.enumerate() {
        Ok(enumeration) => {
            let message = if enumeration.documents.is_empty() {
                "Connected, but no open documents were found.".to_owned()
            } else {
                format!("Loaded {} open document(s).", enumeration.documents.len())
            };
            let mut payload = Payload::success(message);
            payload.documents = enumeration.documents;
            payload.active_name = enumeration.active_name;
            payload
        }
        Err(e) => {
            log::warn!("enumeration failed: {e}");
            match engine.probe() {
                Ok(diagnostics) => {
                    let mut payload =
                        Payload::failure(format!("{CONNECT_FAILED}{}", diagnostics.summary()));
                    payload.diagnostics = Some(diagnostics);
                    payload
                }
                Err(_) => Payload::failure(CONNECT_FAILED),
            }
        }
    }
}

fn activate<R: Runtime>(engine: &Engine<R>, full_name: Option<&str>, name: Option<&str>) -> Payload {
    match engine.activate(full_name, name) {
        Ok(false) => Payload::failure("Error: Could not activate the selected document."),
        Ok(true) => match engine.enumerate() {
            Ok(enumeration) => {
                let mut payload = Payload::success("Selected document activated in Solid Edge.");
                payload.documents = enumeration.documents;
                payload.active_name = enumeration.active_name;
                payload
            }
            Err(e) => {
                log::warn!("re-enumeration after activate failed: {e}");
                Payload::failure("Error: Failed to activate document.")
            }
        },
        Err(e) => {
            log::warn!("activate failed: {e}");
            Payload::failure("Error: Failed to activate document.")
        }
    }
}

fn save_message(outcome: WriteOutcome) -> &'static str {
    match outcome {
        WriteOutcome::Applied { .. } => "Draft custom properties saved.",
        WriteOutcome::NotActive => "Draft must be active to save custom properties.",
        WriteOutcome::NoMatch => "Error: Could not find the selected draft.",
        WriteOutcome::NotDraft => "Selected document is not a draft.",
        WriteOutcome::NoCustomSet => "Draft has no custom property set.",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
