//! Policy documents.
//!
//! Policies are server-held rulesets. The client moves them to and from the
//! server verbatim: a `Policy` is the JSON object itself, so a document read
//! from the server and written back is unchanged, nulls and unknown fields
//! included. `PolicyRule` is a typed view for reading rules and building new
//! documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Whether a matching rule gates the action or only records it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    /// Block until the required checks are satisfied.
    Enforce,
    /// Log only.
    Observe,
}

/// The condition under which a rule applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single rule inside a policy document.
///
/// ```json
/// { "when": { "action": "send_email" }, "require": ["reviewer_approval"], "mode": "enforce" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Absent means the rule applies to every action type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<RuleMatch>,
    /// Names of checks that must pass (e.g. `["reviewer_approval"]`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<PolicyMode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PolicyRule {
    /// Build a rule that gates `action_type` on the named checks.
    pub fn requiring<I, S>(action_type: impl Into<String>, checks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            when: Some(RuleMatch {
                action: Some(action_type.into()),
                ..RuleMatch::default()
            }),
            require: Some(checks.into_iter().map(Into::into).collect()),
            mode: Some(PolicyMode::Enforce),
            extra: Map::new(),
        }
    }

    pub fn with_mode(mut self, mode: PolicyMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Whether this rule names `action_type` (via `when.action` or
    /// `when.actionType`).
    pub fn names(&self, action_type: &str) -> bool {
        self.when.as_ref().is_some_and(|w| {
            w.action.as_deref() == Some(action_type) || w.action_type.as_deref() == Some(action_type)
        })
    }

    /// Whether this rule applies to `action_type`: it names it, or has no
    /// `when` at all.
    pub fn applies_to(&self, action_type: &str) -> bool {
        self.when.is_none() || self.names(action_type)
    }

    pub fn required_checks(&self) -> &[String] {
        self.require.as_deref().unwrap_or_default()
    }
}

/// A server-held ruleset, keyed server-side by action type.
///
/// The document itself is an opaque JSON object. `rules()` and `rules_for()`
/// are read-only views over its `rules` list; entries they cannot read are
/// skipped, never rejected, and never rewritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Policy(Map<String, Value>);

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A document whose `rules` list holds `rules`.
    pub fn with_rules(rules: Vec<PolicyRule>) -> Self {
        let rules = rules
            .iter()
            .filter_map(|rule| serde_json::to_value(rule).ok())
            .collect();
        let mut document = Map::new();
        document.insert("rules".to_string(), Value::Array(rules));
        Self(document)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Entries of the `rules` list as sent. Empty when `rules` is absent or
    /// not a list.
    pub fn raw_rules(&self) -> &[Value] {
        match self.0.get("rules") {
            Some(Value::Array(rules)) => rules.as_slice(),
            _ => &[],
        }
    }

    /// Every rule this client can read.
    pub fn rules(&self) -> Vec<PolicyRule> {
        self.raw_rules().iter().filter_map(read_rule).collect()
    }

    /// The rules that name `action_type`, or every readable rule when none do.
    pub fn rules_for(&self, action_type: &str) -> Vec<PolicyRule> {
        let rules = self.rules();
        if rules.iter().any(|r| r.names(action_type)) {
            rules.into_iter().filter(|r| r.names(action_type)).collect()
        } else {
            rules
        }
    }

    /// This document with its `rules` list narrowed to the entries that name
    /// `action_type`. Unchanged when no entry names it. Kept entries and all
    /// other fields are copied as sent.
    pub fn scoped_to(&self, action_type: &str) -> Policy {
        let named: Vec<Value> = self
            .raw_rules()
            .iter()
            .filter(|raw| read_rule(raw).is_some_and(|r| r.names(action_type)))
            .cloned()
            .collect();
        if named.is_empty() {
            return self.clone();
        }
        let mut document = self.0.clone();
        document.insert("rules".to_string(), Value::Array(named));
        Self(document)
    }
}

fn read_rule(raw: &Value) -> Option<PolicyRule> {
    serde_json::from_value(raw.clone()).ok()
}

impl From<Map<String, Value>> for Policy {
    fn from(document: Map<String, Value>) -> Self {
        Self(document)
    }
}
