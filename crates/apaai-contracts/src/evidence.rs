//! Evidence submissions and receipts.
//!
//! Evidence attests to the real-world outcome of an action. An action may
//! accumulate several evidence batches over its life; how the server
//! combines them is up to the server.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::check::Check;

/// A batch of checks attached to one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub action_id: String,
    /// Checks in execution order. Never reordered or deduplicated.
    pub checks: Vec<Check>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Evidence {
    pub fn new(action_id: impl Into<String>, checks: Vec<Check>) -> Self {
        Self {
            action_id: action_id.into(),
            checks,
            timestamp: None,
        }
    }

    /// True when every check in the batch passed.
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.pass)
    }
}

/// The server's acknowledgment of an evidence submission.
///
/// Its shape is owned by the server; `verified` is the one field this client
/// knows about, everything else is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceReceipt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
