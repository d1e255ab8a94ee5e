//! Engine façade: one public entry point per host operation.
//!
//! Every method opens its own [`Session`], attaches to the running
//! application, does its work and tears everything down before returning.
//! No handle outlives the call that obtained it.

use crate::config::EngineConfig;
use crate::diagnostics::{self, Diagnostics};
use crate::document::{self, active_document, Enumeration};
use crate::errors::SolidEdgeError;
use crate::identity;
use crate::properties::{self, CustomProperty, WriteOutcome};
use crate::session::{Runtime, Session};

pub struct Engine<R: Runtime> {
    runtime: R,
    config: EngineConfig,
}

impl<R: Runtime> Engine<R> {
    pub fn new(runtime: R) -> Self {
        Self::with_config(runtime, EngineConfig::default())
    }

    pub fn with_config(runtime: R, config: EngineConfig) -> Self {
        Self { runtime, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// List every open document, active first.
    pub fn enumerate(&self) -> Result<Enumeration, SolidEdgeError> {
        Session::open(&self.runtime)?.run(|app| document::enumerate(app, &self.config))
    }

    /// Bring the identified document to the foreground.  `Ok(false)` when no
    /// open document matches.
    pub fn activate(
        &self,
        full_name: Option<&str>,
        name: Option<&str>,
    ) -> Result<bool, SolidEdgeError> {
        Session::open(&self.runtime)?
            .run(|app| identity::activate(app, full_name, name, &self.config))
    }

    pub fn read_custom_properties(
        &self,
        full_name: Option<&str>,
        name: Option<&str>,
    ) -> Result<Vec<CustomProperty>, SolidEdgeError> {
        Session::open(&self.runtime)?.run(|app| {
            properties::read_custom_properties(app, full_name, name, &self.config)
        })
    }

    pub fn write_custom_properties(
        &self,
        full_name: Option<&str>,
        name: Option<&str>,
        properties: &[CustomProperty],
    ) -> Result<WriteOutcome, SolidEdgeError> {
        Session::open(&self.runtime)?.run(|app| {
            properties::write_custom_properties(app, full_name, name, properties, &self.config)
        })
    }

    pub fn probe(&self) -> Result<Diagnostics, SolidEdgeError> {
        Session::open(&self.runtime)?.run(|app| Ok(diagnostics::probe(app)))
    }

    /// Open and immediately tear down a session, forcing the runtime to
    /// release anything it still holds for this thread.
    pub fn disconnect(&self) -> Result<(), SolidEdgeError> {
        drop(Session::open(&self.runtime)?);
        Ok(())
    }

    /// Name of the active document.
    pub fn active_document_name(&self) -> Result<String, SolidEdgeError> {
        Session::open(&self.runtime)?.run(|app| {
            active_document(app)
                .and_then(|doc| doc.get_text("Name").ok().flatten())
                .ok_or_else(|| SolidEdgeError::HostUnavailable("no active document".into()))
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
