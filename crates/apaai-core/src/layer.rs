//! The accountability facade.
//!
//! `AccountabilityLayer` is the entry point an agent uses:
//!
//!   propose → (human approval) → act → evidence
//!
//! It normalizes caller input, forwards exactly one call to the transport
//! per operation, and returns the server's answer unchanged. It never
//! retries, caches, or fabricates a result when the transport fails.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use apaai_contracts::{
    Action, ActorInput, ApaaiError, ApaaiResult, CheckInput, Decision, DecisionStatus, Evidence,
    EvidenceReceipt, Policy,
};

use crate::{
    managers::{ActionManager, EvidenceManager, HumanManager, PolicyManager},
    normalize::{expect_object, new_action_id, normalize_actor, normalize_checks, now_iso},
    traits::Transport,
};

/// Everything needed to propose one action.
///
/// ```rust,ignore
/// let proposal = Proposal::new("send_email", json!({ "kind": "agent", "name": "mail-bot" }))
///     .target("mailto:sarah@acme.com")
///     .params(json!({ "subject": "Pricing" }));
/// ```
#[derive(Debug, Clone)]
pub struct Proposal {
    pub action_type: String,
    pub actor: ActorInput,
    pub target: Option<String>,
    pub params: Option<Value>,
    /// Used verbatim when set; a fresh UUID otherwise.
    pub id: Option<String>,
    /// Used verbatim when set; the current UTC instant otherwise.
    pub timestamp: Option<String>,
}

impl Proposal {
    pub fn new(action_type: impl Into<String>, actor: impl Into<ActorInput>) -> Self {
        Self {
            action_type: action_type.into(),
            actor: actor.into(),
            target: None,
            params: None,
            id: None,
            timestamp: None,
        }
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Action-specific arguments. Must be a JSON mapping.
    pub fn params(mut self, params: impl Into<Value>) -> Self {
        self.params = Some(params.into());
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Build the canonical action, filling in `id` and `timestamp` defaults.
    ///
    /// An empty `target` and empty `params` are left out of the action.
    pub fn into_action(self) -> ApaaiResult<Action> {
        let actor = normalize_actor(&self.actor)?;
        let params = match self.params {
            Some(value) => Some(expect_object(value, "params")?).filter(|p| !p.is_empty()),
            None => None,
        };

        Ok(Action {
            id: self.id.unwrap_or_else(new_action_id),
            timestamp: self.timestamp.unwrap_or_else(now_iso),
            action_type: self.action_type,
            actor,
            target: self.target.filter(|t| !t.is_empty()),
            params,
            status: None,
            checks: Vec::new(),
            agent_id: None,
            extra: Default::default(),
        })
    }
}

/// The orchestrating client for the accountability protocol.
///
/// The four sub-managers are built once at construction and share this
/// layer's transport; none of them holds state of its own.
#[derive(Clone)]
pub struct AccountabilityLayer {
    transport: Arc<dyn Transport>,
    policies: PolicyManager,
    human: HumanManager,
    evidences: EvidenceManager,
    actions: ActionManager,
}

/// Alternate public name for [`AccountabilityLayer`].
pub type ApaaiClient = AccountabilityLayer;

/// Legacy public name for [`AccountabilityLayer`].
pub type TraceClient = AccountabilityLayer;

impl AccountabilityLayer {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            policies: PolicyManager::new(transport.clone()),
            human: HumanManager::new(transport.clone()),
            evidences: EvidenceManager::new(transport.clone()),
            actions: ActionManager::new(transport.clone()),
            transport,
        }
    }

    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self::new(Arc::new(transport))
    }

    /// Propose an action and return the server's decision on it.
    ///
    /// Exactly one `create_action` call is made. A decision whose `actionId`
    /// does not match the proposed id is treated as a malformed response.
    ///
    /// # Errors
    ///
    /// `Validation` if the actor or params cannot be normalized (nothing is
    /// sent); any transport error unchanged.
    pub fn propose(&self, proposal: Proposal) -> ApaaiResult<Decision> {
        let action = proposal.into_action()?;

        debug!(
            action_id = %action.id,
            action_type = %action.action_type,
            actor = %action.actor.name,
            "proposing action"
        );

        let decision = self.transport.create_action(&action)?;

        if decision.action_id != action.id {
            warn!(
                action_id = %action.id,
                returned_id = %decision.action_id,
                "decision references a different action"
            );
            return Err(ApaaiError::transport(
                None,
                format!(
                    "decision references action '{}' but '{}' was proposed",
                    decision.action_id, action.id
                ),
            ));
        }

        match decision.status {
            DecisionStatus::RequiresApproval => info!(
                action_id = %decision.action_id,
                checks = decision.checks.len(),
                "action awaiting human approval"
            ),
            status => debug!(action_id = %decision.action_id, status = %status, "action decided"),
        }

        Ok(decision)
    }

    /// Attach evidence to an action.
    ///
    /// The action id is not checked locally; the server decides whether it
    /// exists.
    pub fn evidence<I>(&self, action_id: &str, checks: I) -> ApaaiResult<EvidenceReceipt>
    where
        I: IntoIterator,
        I::Item: Into<CheckInput>,
    {
        submit_checks(self.transport.as_ref(), action_id, checks)
    }

    /// Fetch the policy for `action_type`, or the default policy.
    pub fn policy(&self, action_type: Option<&str>) -> ApaaiResult<Policy> {
        self.transport.get_policy(action_type)
    }

    pub fn policies(&self) -> &PolicyManager {
        &self.policies
    }

    pub fn human(&self) -> &HumanManager {
        &self.human
    }

    pub fn evidences(&self) -> &EvidenceManager {
        &self.evidences
    }

    pub fn actions(&self) -> &ActionManager {
        &self.actions
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

/// Normalize `checks` and submit them as one evidence batch.
pub(crate) fn submit_checks<I>(
    transport: &dyn Transport,
    action_id: &str,
    checks: I,
) -> ApaaiResult<EvidenceReceipt>
where
    I: IntoIterator,
    I::Item: Into<CheckInput>,
{
    let evidence = Evidence::new(action_id, normalize_checks(checks)?);

    debug!(
        action_id = %action_id,
        checks = evidence.checks.len(),
        all_passed = evidence.all_passed(),
        "submitting evidence"
    );

    transport.submit_evidence(&evidence)
}
