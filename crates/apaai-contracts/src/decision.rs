//! Decision types and the server-owned status state machine.
//!
//! The server issues exactly one `Decision` per proposed action. The client
//! never mutates it; it only interprets the status it reports.
//!
//! ```text
//! proposed ──▶ approved
//!          ├─▶ rejected
//!          ├─▶ observed
//!          └─▶ requires_approval ──▶ approved | rejected
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::check::Check;

/// The server's verdict on an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    /// The action may proceed.
    Approved,
    /// The action must not proceed.
    Rejected,
    /// A human must approve or reject before the action proceeds.
    RequiresApproval,
    /// The governing policy is in observe mode: the action is logged, not gated.
    Observed,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::RequiresApproval => "requires_approval",
            Self::Observed => "observed",
        }
    }

    /// True for every status except `RequiresApproval`.
    ///
    /// Evidence may still be attached in a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::RequiresApproval)
    }

    pub fn requires_approval(&self) -> bool {
        matches!(self, Self::RequiresApproval)
    }

    /// Whether the server may move an action from `self` to `next`.
    ///
    /// Only `RequiresApproval` has outgoing edges, and nothing re-enters it.
    pub fn can_transition_to(&self, next: DecisionStatus) -> bool {
        matches!(
            (self, next),
            (Self::RequiresApproval, Self::Approved) | (Self::RequiresApproval, Self::Rejected)
        )
    }
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of `Decision::checks`.
///
/// Servers report either the names of checks that gate the action, or full
/// check results. Both forms are kept as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecisionCheck {
    Name(String),
    Result(Check),
}

impl DecisionCheck {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Result(check) => &check.name,
        }
    }
}

/// The server's verdict on one proposed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// The `Action::id` this decision belongs to.
    pub action_id: String,
    pub status: DecisionStatus,
    /// Checks in evaluation order.
    #[serde(default)]
    pub checks: Vec<DecisionCheck>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
