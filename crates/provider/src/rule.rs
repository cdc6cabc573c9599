//! Detector rules and their content hash.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::notification::{Notification, validate_notification_strings};
use crate::resources::{non_empty, null_as_default};
use crate::validation::{Severity, require};

/// One alerting rule of a detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Human readable description
    #[serde(default)]
    pub description: String,
    /// Alert severity
    pub severity: Severity,
    /// Label of the `detect()` block in the program this rule fires on
    pub detect_label: String,
    /// Whether the rule is muted
    #[serde(default)]
    pub disabled: bool,
    /// Compact notification strings
    #[serde(default)]
    pub notifications: Vec<String>,
    /// Custom message body template
    #[serde(default)]
    pub parameterized_body: String,
    /// Custom message subject template
    #[serde(default)]
    pub parameterized_subject: String,
    /// Runbook link
    #[serde(default)]
    pub runbook_url: String,
    /// Plain text suggestion for responders
    #[serde(default)]
    pub tip: String,
}

impl Rule {
    /// Creates a rule with only the required fields set.
    pub fn new(severity: Severity, detect_label: impl Into<String>) -> Self {
        Self {
            description: String::new(),
            severity,
            detect_label: detect_label.into(),
            disabled: false,
            notifications: Vec::new(),
            parameterized_body: String::new(),
            parameterized_subject: String::new(),
            runbook_url: String::new(),
            tip: String::new(),
        }
    }

    /// Checks the detect label and every notification.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn validate(&self) -> Result<()> {
        require("rule.detect_label", &self.detect_label)?;
        validate_notification_strings(&self.notifications)?;
        Ok(())
    }

    /// Content hash used as the rule's set identity.
    #[must_use]
    pub fn hash(&self) -> u32 {
        rule_hash(self)
    }

    /// API form of the rule.
    ///
    /// # Errors
    ///
    /// Returns an error if a notification string is invalid.
    pub fn to_api(&self) -> Result<ApiRule> {
        Ok(ApiRule {
            severity: self.severity,
            detect_label: self.detect_label.clone(),
            description: non_empty(&self.description),
            disabled: self.disabled,
            notifications: validate_notification_strings(&self.notifications)?,
            parameterized_body: non_empty(&self.parameterized_body),
            parameterized_subject: non_empty(&self.parameterized_subject),
            runbook_url: non_empty(&self.runbook_url),
            tip: non_empty(&self.tip),
        })
    }

    /// Builds a rule from its API form.
    #[must_use]
    pub fn from_api(api: &ApiRule) -> Self {
        Self {
            description: api.description.clone().unwrap_or_default(),
            severity: api.severity,
            detect_label: api.detect_label.clone(),
            disabled: api.disabled,
            notifications: api.notifications.iter().map(ToString::to_string).collect(),
            parameterized_body: api.parameterized_body.clone().unwrap_or_default(),
            parameterized_subject: api.parameterized_subject.clone().unwrap_or_default(),
            runbook_url: api.runbook_url.clone().unwrap_or_default(),
            tip: api.tip.clone().unwrap_or_default(),
        }
    }
}

/// CRC-32 of the rule's canonical string.
///
/// Every scalar field is followed by `-`, then the notifications in sorted
/// order, each also followed by `-`. Notification order therefore does not
/// affect the hash.
#[must_use]
pub fn rule_hash(rule: &Rule) -> u32 {
    let mut canonical = format!(
        "{}-{}-{}-{}-{}-{}-{}-{}-",
        rule.description,
        rule.severity,
        rule.detect_label,
        rule.disabled,
        rule.parameterized_body,
        rule.parameterized_subject,
        rule.runbook_url,
        rule.tip,
    );
    let mut notifications: Vec<&str> = rule.notifications.iter().map(String::as_str).collect();
    notifications.sort_unstable();
    for notification in notifications {
        let _ = write!(canonical, "{notification}-");
    }
    crc32fast::hash(canonical.as_bytes())
}

/// Rule as sent to and returned by the detector API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRule {
    /// Alert severity
    pub severity: Severity,
    /// Detect block label
    pub detect_label: String,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Muted flag
    #[serde(default, deserialize_with = "null_as_default")]
    pub disabled: bool,
    /// Notification targets
    #[serde(default, deserialize_with = "null_as_default")]
    pub notifications: Vec<Notification>,
    /// Body template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameterized_body: Option<String>,
    /// Subject template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameterized_subject: Option<String>,
    /// Runbook link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runbook_url: Option<String>,
    /// Responder tip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
}

/// Rules keyed by content hash.
///
/// Serialized as a list in ascending hash order. Equality compares hash
/// sets only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Rule>", into = "Vec<Rule>")]
pub struct RuleSet {
    rules: BTreeMap<u32, Rule>,
}

impl RuleSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule, replacing any rule with the same hash.
    pub fn insert(&mut self, rule: Rule) -> Option<Rule> {
        self.rules.insert(rule.hash(), rule)
    }

    /// Number of distinct rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in ascending hash order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// Hashes in ascending order.
    pub fn hashes(&self) -> impl Iterator<Item = u32> + '_ {
        self.rules.keys().copied()
    }

    /// Whether a rule with this hash is present.
    #[must_use]
    pub fn contains(&self, hash: u32) -> bool {
        self.rules.contains_key(&hash)
    }

    /// Validates every rule.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule's error.
    pub fn validate(&self) -> Result<()> {
        self.iter().try_for_each(Rule::validate)
    }

    /// API forms in hash order.
    ///
    /// # Errors
    ///
    /// Returns an error if any notification string is invalid.
    pub fn to_api(&self) -> Result<Vec<ApiRule>> {
        self.iter().map(Rule::to_api).collect()
    }

    /// Builds a set from API rules.
    #[must_use]
    pub fn from_api(rules: &[ApiRule]) -> Self {
        rules.iter().map(Rule::from_api).collect()
    }
}

impl PartialEq for RuleSet {
    fn eq(&self, other: &Self) -> bool {
        self.rules.keys().eq(other.rules.keys())
    }
}

impl Eq for RuleSet {}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        let mut set = Self::new();
        for rule in iter {
            set.insert(rule);
        }
        set
    }
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        rules.into_iter().collect()
    }
}

impl From<RuleSet> for Vec<Rule> {
    fn from(set: RuleSet) -> Self {
        set.rules.into_values().collect()
    }
}
