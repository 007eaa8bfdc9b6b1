//! Action records and list filters.
//!
//! An `Action` is created once by `propose` and never mutated by the client.
//! When read back from the server it additionally carries the server-owned
//! `status` and `checks`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    actor::Actor,
    decision::{DecisionCheck, DecisionStatus},
};

/// A proposed or executed unit of agent work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: String,
    /// ISO-8601 UTC instant ending in `Z`.
    pub timestamp: String,
    /// Free-form action kind (e.g. "send_email").
    #[serde(rename = "type")]
    pub action_type: String,
    pub actor: Actor,
    /// The object of the action, e.g. `mailto:sarah@acme.com`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,

    // Server-owned fields, present only on actions read back from the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DecisionStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<DecisionCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Query filters for listing actions.
///
/// Filters are plain key/value pairs sent as query parameters. The typed
/// setters cover the keys servers commonly understand; `with` sets anything
/// else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionFilters {
    pairs: BTreeMap<String, String>,
}

impl ActionFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.pairs.insert(key.into(), value.to_string());
        self
    }

    pub fn status(self, status: DecisionStatus) -> Self {
        self.with("status", status.as_str())
    }

    pub fn action_type(self, action_type: impl Into<String>) -> Self {
        self.with("type", action_type.into())
    }

    pub fn actor(self, actor_name: impl Into<String>) -> Self {
        self.with("actor", actor_name.into())
    }

    pub fn limit(self, limit: u32) -> Self {
        self.with("limit", limit)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The filters as ordered query pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
