//! Recording transport double shared by the unit tests in this crate.

use std::sync::{Arc, Mutex};

use apaai_contracts::{
    Action, ActionFilters, Actor, ApaaiError, ApaaiResult, Check, Decision, DecisionStatus,
    Evidence, EvidenceReceipt, Policy,
};

use crate::traits::Transport;

/// One recorded transport call with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CreateAction(Action),
    SubmitEvidence(Evidence),
    GetPolicy(Option<String>),
    SetPolicy(Policy),
    Approve(String, Option<String>),
    Reject(String, Option<String>),
    GetAction(String),
    ListActions(Option<ActionFilters>),
    GetEvidence(String),
}

/// A transport that records every call and answers from canned values.
pub(crate) struct RecordingTransport {
    pub calls: Arc<Mutex<Vec<Call>>>,
    /// Status returned by `create_action`.
    pub status: DecisionStatus,
    /// Replaces the echoed action id in `create_action` decisions.
    pub decision_id_override: Option<String>,
    pub stored_action: Option<Action>,
    /// When set, every call records itself and then fails with this error.
    pub failure: Option<ApaaiError>,
}

impl RecordingTransport {
    pub fn deciding(status: DecisionStatus) -> Self {
        Self {
            calls: Arc::new(Mutex::new(vec![])),
            status,
            decision_id_override: None,
            stored_action: None,
            failure: None,
        }
    }

    pub fn failing(error: ApaaiError) -> Self {
        Self {
            failure: Some(error),
            ..Self::deciding(DecisionStatus::Approved)
        }
    }

    pub fn with_stored_action(action: Action) -> Self {
        Self {
            stored_action: Some(action),
            ..Self::deciding(DecisionStatus::Approved)
        }
    }

    fn record(&self, call: Call) -> ApaaiResult<()> {
        self.calls.lock().unwrap().push(call);
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

pub(crate) fn stored_action(id: &str, action_type: &str) -> Action {
    Action {
        id: id.to_string(),
        timestamp: "2026-01-01T00:00:00Z".to_string(),
        action_type: action_type.to_string(),
        actor: Actor::agent("test-agent"),
        target: None,
        params: None,
        status: None,
        checks: vec![],
        agent_id: None,
        extra: Default::default(),
    }
}

fn decision(action_id: &str, status: DecisionStatus) -> Decision {
    Decision {
        action_id: action_id.to_string(),
        status,
        checks: vec![],
        extra: Default::default(),
    }
}

impl Transport for RecordingTransport {
    fn create_action(&self, action: &Action) -> ApaaiResult<Decision> {
        self.record(Call::CreateAction(action.clone()))?;
        let id = self.decision_id_override.as_deref().unwrap_or(&action.id);
        Ok(decision(id, self.status))
    }

    fn submit_evidence(&self, evidence: &Evidence) -> ApaaiResult<EvidenceReceipt> {
        self.record(Call::SubmitEvidence(evidence.clone()))?;
        Ok(EvidenceReceipt {
            verified: Some(evidence.all_passed()),
            extra: Default::default(),
        })
    }

    fn get_policy(&self, action_type: Option<&str>) -> ApaaiResult<Policy> {
        self.record(Call::GetPolicy(action_type.map(str::to_string)))?;
        Ok(Policy::default())
    }

    fn set_policy(&self, policy: &Policy) -> ApaaiResult<Policy> {
        self.record(Call::SetPolicy(policy.clone()))?;
        Ok(policy.clone())
    }

    fn approve_action(&self, action_id: &str, approver: Option<&str>) -> ApaaiResult<Decision> {
        self.record(Call::Approve(action_id.to_string(), approver.map(str::to_string)))?;
        Ok(decision(action_id, DecisionStatus::Approved))
    }

    fn reject_action(&self, action_id: &str, reason: Option<&str>) -> ApaaiResult<Decision> {
        self.record(Call::Reject(action_id.to_string(), reason.map(str::to_string)))?;
        Ok(decision(action_id, DecisionStatus::Rejected))
    }

    fn get_action(&self, action_id: &str) -> ApaaiResult<Action> {
        self.record(Call::GetAction(action_id.to_string()))?;
        Ok(self
            .stored_action
            .clone()
            .unwrap_or_else(|| stored_action(action_id, "noop")))
    }

    fn list_actions(&self, filters: Option<&ActionFilters>) -> ApaaiResult<Vec<Action>> {
        self.record(Call::ListActions(filters.cloned()))?;
        Ok(self.stored_action.iter().cloned().collect())
    }

    fn get_evidence(&self, action_id: &str) -> ApaaiResult<Vec<Evidence>> {
        self.record(Call::GetEvidence(action_id.to_string()))?;
        Ok(vec![Evidence::new(action_id, vec![Check::passed("recorded")])])
    }
}
