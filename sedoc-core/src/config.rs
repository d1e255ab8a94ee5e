//! Engine configuration.
//!
//! Nothing here is persisted; callers build an [`EngineConfig`] from their
//! own flags (see `sedoc-cli`) or take the defaults.

use serde::Deserialize;

/// ProgID the running Solid Edge instance registers in the Running Object
/// Table.
pub const DEFAULT_PROG_ID: &str = "SolidEdge.Application";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// ProgID used to look up the running application.
    pub prog_id: String,
    /// Display name for documents whose `Name` is blank.
    pub untitled_name: String,
    /// Key for the direct property-set lookup when no set name contains
    /// "custom".
    pub custom_set_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prog_id: DEFAULT_PROG_ID.to_owned(),
            untitled_name: "Untitled".to_owned(),
            custom_set_name: "Custom".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"prog_id": "SolidEdge.Application.226"}"#).unwrap();
        assert_eq!(config.prog_id, "SolidEdge.Application.226");
        assert_eq!(config.untitled_name, "Untitled");
        assert_eq!(config.custom_set_name, "Custom");
    }
}
