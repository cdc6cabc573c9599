//! State documents: `{"type": "...", "state": {...}}` files.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{CliError, Result};

/// A resource type paired with one state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub state: Value,
}

impl StateDocument {
    pub fn new(type_name: impl Into<String>, state: Value) -> Self {
        Self {
            type_name: type_name.into(),
            state,
        }
    }

    /// Reads and decodes a document file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| CliError::file("read", path, e))?;
        let document: Self =
            serde_json::from_str(&raw).map_err(|e| CliError::invalid_document(path, e.to_string()))?;
        if !document.state.is_object() {
            return Err(CliError::invalid_document(path, "`state` must be an object"));
        }
        Ok(document)
    }

    /// The `id` recorded in the state, empty when untracked.
    pub fn id(&self) -> &str {
        self.state.get("id").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_load_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("team.json");
        std::fs::write(
            &path,
            r#"{"type": "signalform_team", "state": {"id": "T1", "name": "SRE"}}"#,
        )
        .unwrap();

        let document = StateDocument::load(&path).unwrap();
        assert_eq!(document.type_name, "signalform_team");
        assert_eq!(document.id(), "T1");
        assert_eq!(
            document.to_value().unwrap(),
            json!({"type": "signalform_team", "state": {"id": "T1", "name": "SRE"}})
        );
    }

    #[test]
    fn test_state_must_be_an_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"type": "signalform_team", "state": [1, 2]}"#).unwrap();

        let err = StateDocument::load(&path).unwrap_err();
        assert!(matches!(err, CliError::InvalidDocument { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = StateDocument::load(Path::new("/nonexistent/signalform.json")).unwrap_err();
        assert!(matches!(err, CliError::FileError { operation: "read", .. }));
    }
}
