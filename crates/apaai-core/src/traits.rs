//! The transport contract.
//!
//! `Transport` is the seam between the accountability core and whatever
//! actually talks to the remote service. Every method is one synchronous
//! request/response round trip:
//!
//! - no internal retries; retry policy belongs to the implementation's caller
//! - remote failures return `ApaaiError::Transport` with the remote status
//! - local shape problems return `ApaaiError::Validation` before any I/O
//!
//! Implementations hold no per-call state, so one instance can be shared
//! across threads behind an `Arc`.

use apaai_contracts::{
    Action, ActionFilters, ApaaiResult, Decision, Evidence, EvidenceReceipt, Policy,
};

/// The operation set the accountability core depends on.
pub trait Transport: Send + Sync {
    /// Record a new action and return the server's decision on it.
    fn create_action(&self, action: &Action) -> ApaaiResult<Decision>;

    /// Attach a batch of checks to an existing action.
    fn submit_evidence(&self, evidence: &Evidence) -> ApaaiResult<EvidenceReceipt>;

    /// Fetch the policy for `action_type`, or the default policy when `None`.
    fn get_policy(&self, action_type: Option<&str>) -> ApaaiResult<Policy>;

    /// Replace the server-held policy and return what the server stored.
    fn set_policy(&self, policy: &Policy) -> ApaaiResult<Policy>;

    /// Human approval of an action awaiting approval.
    fn approve_action(&self, action_id: &str, approver: Option<&str>) -> ApaaiResult<Decision>;

    /// Human rejection of an action awaiting approval.
    fn reject_action(&self, action_id: &str, reason: Option<&str>) -> ApaaiResult<Decision>;

    fn get_action(&self, action_id: &str) -> ApaaiResult<Action>;

    fn list_actions(&self, filters: Option<&ActionFilters>) -> ApaaiResult<Vec<Action>>;

    /// Every evidence batch recorded for `action_id`, oldest first.
    fn get_evidence(&self, action_id: &str) -> ApaaiResult<Vec<Evidence>>;
}
