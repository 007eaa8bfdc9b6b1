//! Role-scoped views over the accountability layer.
//!
//! Each manager is a thin, stateless view: it holds a handle to the layer's
//! transport and forwards to it. Nothing is cached between calls.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use apaai_contracts::{
    Action, ActionFilters, ApaaiError, ApaaiResult, CheckInput, Decision, DecisionCheck,
    DecisionStatus, Evidence, EvidenceReceipt, Policy, PolicyInput,
};

use crate::{
    layer::submit_checks,
    normalize::normalize_policy,
    traits::Transport,
};

/// The server's recorded decision for an action, as reported by
/// [`PolicyManager::evaluate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyEvaluation {
    pub status: DecisionStatus,
    pub checks: Vec<DecisionCheck>,
    /// The policy currently governing the action's type.
    #[serde(skip)]
    pub policy: Policy,
}

/// Policy lookup and maintenance.
#[derive(Clone)]
pub struct PolicyManager {
    transport: Arc<dyn Transport>,
}

impl PolicyManager {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Report the decision the server already made for `action_id`.
    ///
    /// Fetches the action, resolves the policy for its type, and returns the
    /// stored status and checks. No decision logic runs locally and no
    /// human-approval operation is invoked.
    pub fn evaluate(&self, action_id: &str) -> ApaaiResult<PolicyEvaluation> {
        let action = self.transport.get_action(action_id)?;
        let policy = self.transport.get_policy(Some(&action.action_type))?;

        let status = action.status.ok_or_else(|| {
            ApaaiError::transport(
                None,
                format!("action '{action_id}' was returned without a decision status"),
            )
        })?;

        debug!(action_id = %action_id, status = %status, "reported recorded decision");

        Ok(PolicyEvaluation {
            status,
            checks: action.checks,
            policy,
        })
    }

    /// The policy that governs `action_type`.
    pub fn enforce(&self, action_type: &str) -> ApaaiResult<Policy> {
        self.transport.get_policy(Some(action_type))
    }

    /// Replace the server-held policy.
    pub fn set(&self, policy: impl Into<PolicyInput>) -> ApaaiResult<Policy> {
        let policy = normalize_policy(&policy.into())?;
        info!(rules = policy.rules().len(), "setting policy");
        self.transport.set_policy(&policy)
    }
}

/// Human-in-the-loop approval.
///
/// Only meaningful while an action is `requires_approval`; the server
/// enforces that, not this client.
#[derive(Clone)]
pub struct HumanManager {
    transport: Arc<dyn Transport>,
}

impl HumanManager {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn approve(&self, action_id: &str, approver: Option<&str>) -> ApaaiResult<Decision> {
        info!(action_id = %action_id, approver = ?approver, "approving action");
        self.transport.approve_action(action_id, approver)
    }

    pub fn reject(&self, action_id: &str, reason: Option<&str>) -> ApaaiResult<Decision> {
        info!(action_id = %action_id, reason = ?reason, "rejecting action");
        self.transport.reject_action(action_id, reason)
    }
}

/// Evidence submission and retrieval.
#[derive(Clone)]
pub struct EvidenceManager {
    transport: Arc<dyn Transport>,
}

impl EvidenceManager {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Same as [`AccountabilityLayer::evidence`](crate::AccountabilityLayer::evidence).
    pub fn add<I>(&self, action_id: &str, checks: I) -> ApaaiResult<EvidenceReceipt>
    where
        I: IntoIterator,
        I::Item: Into<CheckInput>,
    {
        submit_checks(self.transport.as_ref(), action_id, checks)
    }

    pub fn get(&self, action_id: &str) -> ApaaiResult<Vec<Evidence>> {
        self.transport.get_evidence(action_id)
    }
}

/// Read-only action queries.
#[derive(Clone)]
pub struct ActionManager {
    transport: Arc<dyn Transport>,
}

impl ActionManager {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn get(&self, action_id: &str) -> ApaaiResult<Action> {
        self.transport.get_action(action_id)
    }

    pub fn list(&self, filters: Option<&ActionFilters>) -> ApaaiResult<Vec<Action>> {
        self.transport.list_actions(filters)
    }
}
