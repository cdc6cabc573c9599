use std::path::Path;

use serde::Deserialize;
use serde_json::{Value, json};
use signalform_provider::{Rule, rule_hash};

use crate::errors::{CliError, Result};

#[derive(Debug, Deserialize)]
struct DetectorRules {
    #[serde(default)]
    rule: Vec<Rule>,
}

#[derive(Debug, Deserialize)]
struct DetectorDocument {
    state: DetectorRules,
}

/// Accepts either a bare list of rules or a detector state document.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RulesFile {
    Rules(Vec<Rule>),
    Document(DetectorDocument),
}

/// Hash of every rule in `path`, in file order.
pub fn execute(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path).map_err(|e| CliError::file("read", path, e))?;
    let rules = match serde_json::from_str(&raw) {
        Ok(RulesFile::Rules(rules)) => rules,
        Ok(RulesFile::Document(document)) => document.state.rule,
        Err(e) => return Err(CliError::invalid_document(path, e.to_string())),
    };

    Ok(Value::Array(
        rules
            .iter()
            .map(|rule| {
                json!({
                    "hash": rule_hash(rule),
                    "severity": rule.severity,
                    "detect_label": rule.detect_label,
                })
            })
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_bare_rules_and_documents_agree() {
        let dir = TempDir::new().unwrap();
        let rules = r#"[{"severity": "Critical", "detect_label": "cpu high", "notifications": ["Team,T1"]}]"#;
        let bare = dir.path().join("rules.json");
        std::fs::write(&bare, rules).unwrap();
        let document = dir.path().join("detector.json");
        std::fs::write(
            &document,
            format!(r#"{{"type": "signalform_detector", "state": {{"name": "CPU", "rule": {rules}}}}}"#),
        )
        .unwrap();

        let from_bare = execute(&bare).unwrap();
        assert_eq!(from_bare, execute(&document).unwrap());
        assert_eq!(from_bare[0]["severity"], "Critical");
        assert!(from_bare[0]["hash"].is_u64());
    }

    #[test]
    fn test_unknown_severity_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"[{"severity": "Urgent", "detect_label": "x"}]"#).unwrap();
        assert!(matches!(
            execute(&path).unwrap_err(),
            CliError::InvalidDocument { .. }
        ));
    }
}
