//! In-memory implementation of `Transport`.
//!
//! `InMemoryTransport` stands in for the remote service. It keeps actions,
//! evidence, and a single policy document behind an `Arc<Mutex<_>>`, so
//! clones share one store and can be handed to several layers or threads.
//!
//! The decision it makes for a new action is deliberately simple: the first
//! policy rule that applies to the action type decides. It enforces the
//! server-side state machine, so approving or rejecting an action that is
//! not awaiting approval fails with status 409.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use apaai_contracts::{
    Action, ActionFilters, ApaaiError, ApaaiResult, Check, Decision, DecisionCheck,
    DecisionStatus, Evidence, EvidenceReceipt, Policy, PolicyMode,
};
use apaai_core::Transport;

/// Check appended to an action's decision when a human approves it.
pub const APPROVAL_CHECK: &str = "human_approval";

/// Check appended to an action's decision when a human rejects it.
pub const REJECTION_CHECK: &str = "human_rejection";

// ── Internal mutable state ────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryState {
    /// Actions in creation order.
    actions: Vec<Action>,
    /// Action id → position in `actions`.
    index: HashMap<String, usize>,
    /// Evidence batches per action, in submission order.
    evidence: HashMap<String, Vec<Evidence>>,
    policy: Policy,
    /// Returned (once) by the next call instead of doing any work.
    pending_failure: Option<ApaaiError>,
}

impl MemoryState {
    fn take_failure(&mut self) -> ApaaiResult<()> {
        match self.pending_failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn action_mut(&mut self, action_id: &str) -> ApaaiResult<&mut Action> {
        let position = *self.index.get(action_id).ok_or_else(|| not_found(action_id))?;
        Ok(&mut self.actions[position])
    }

    fn action(&self, action_id: &str) -> ApaaiResult<&Action> {
        let position = *self.index.get(action_id).ok_or_else(|| not_found(action_id))?;
        Ok(&self.actions[position])
    }

    /// Move a pending action to `next`, appending `check` to its decision.
    fn resolve(&mut self, action_id: &str, next: DecisionStatus, check: Check) -> ApaaiResult<Decision> {
        let action = self.action_mut(action_id)?;
        let current = action.status.unwrap_or(DecisionStatus::Approved);
        if !current.can_transition_to(next) {
            return Err(ApaaiError::transport(
                Some(409),
                format!("action '{action_id}' is {current}, not awaiting approval"),
            ));
        }
        action.status = Some(next);
        action.checks.push(DecisionCheck::Result(check));
        Ok(decision_of(action))
    }
}

fn not_found(action_id: &str) -> ApaaiError {
    ApaaiError::transport(Some(404), format!("action '{action_id}' not found"))
}

fn decision_of(action: &Action) -> Decision {
    Decision {
        action_id: action.id.clone(),
        status: action.status.unwrap_or(DecisionStatus::Approved),
        checks: action.checks.clone(),
        extra: Default::default(),
    }
}

/// Decide a new action against `policy`.
///
/// The first readable rule that applies to the action type wins. A rule with required
/// checks gates the action (`requires_approval`) unless it is in observe
/// mode (`observed`); a rule with none, or no rule at all, approves.
fn decide(policy: &Policy, action_type: &str) -> (DecisionStatus, Vec<DecisionCheck>) {
    let Some(rule) = policy.rules().into_iter().find(|r| r.applies_to(action_type)) else {
        return (DecisionStatus::Approved, vec![]);
    };

    let required: Vec<DecisionCheck> = rule
        .required_checks()
        .iter()
        .cloned()
        .map(DecisionCheck::Name)
        .collect();

    if required.is_empty() {
        (DecisionStatus::Approved, required)
    } else if rule.mode == Some(PolicyMode::Observe) {
        (DecisionStatus::Observed, required)
    } else {
        (DecisionStatus::RequiresApproval, required)
    }
}

// ── Public transport ──────────────────────────────────────────────────────────

/// An in-process stand-in for the APAAI service.
///
/// Clones share the same store.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose stored policy starts as `policy`.
    pub fn with_policy(policy: Policy) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                policy,
                ..MemoryState::default()
            })),
        }
    }

    /// Make the next call, whatever it is, fail with a `Transport` error.
    pub fn fail_next(&self, status: Option<u16>, reason: impl Into<String>) -> ApaaiResult<()> {
        let mut state = self.lock()?;
        state.pending_failure = Some(ApaaiError::transport(status, reason));
        Ok(())
    }

    /// Number of actions recorded so far.
    pub fn action_count(&self) -> ApaaiResult<usize> {
        Ok(self.lock()?.actions.len())
    }

    fn lock(&self) -> ApaaiResult<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| {
            warn!("in-memory state lock poisoned");
            ApaaiError::transport(None, "in-memory state lock poisoned")
        })
    }
}

impl Transport for InMemoryTransport {
    fn create_action(&self, action: &Action) -> ApaaiResult<Decision> {
        let mut state = self.lock()?;
        state.take_failure()?;

        if state.index.contains_key(&action.id) {
            return Err(ApaaiError::transport(
                Some(409),
                format!("action '{}' already exists", action.id),
            ));
        }

        let (status, checks) = decide(&state.policy, &action.action_type);

        let mut stored = action.clone();
        stored.status = Some(status);
        stored.checks = checks;

        info!(
            action_id = %stored.id,
            action_type = %stored.action_type,
            status = %status,
            "recorded action"
        );

        let decision = decision_of(&stored);
        let position = state.actions.len();
        state.index.insert(stored.id.clone(), position);
        state.actions.push(stored);
        Ok(decision)
    }

    fn submit_evidence(&self, evidence: &Evidence) -> ApaaiResult<EvidenceReceipt> {
        let mut state = self.lock()?;
        state.take_failure()?;
        state.action(&evidence.action_id)?;

        let mut record = evidence.clone();
        if record.timestamp.is_none() {
            record.timestamp = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true));
        }
        let verified = record.all_passed();
        if !verified {
            warn!(action_id = %record.action_id, "evidence contains failing checks");
        }

        state
            .evidence
            .entry(record.action_id.clone())
            .or_default()
            .push(record);

        Ok(EvidenceReceipt {
            verified: Some(verified),
            extra: Default::default(),
        })
    }

    fn get_policy(&self, action_type: Option<&str>) -> ApaaiResult<Policy> {
        let mut state = self.lock()?;
        state.take_failure()?;

        Ok(match action_type {
            Some(action_type) => state.policy.scoped_to(action_type),
            None => state.policy.clone(),
        })
    }

    fn set_policy(&self, policy: &Policy) -> ApaaiResult<Policy> {
        let mut state = self.lock()?;
        state.take_failure()?;
        debug!(rules = policy.rules().len(), "policy replaced");
        state.policy = policy.clone();
        Ok(policy.clone())
    }

    fn approve_action(&self, action_id: &str, approver: Option<&str>) -> ApaaiResult<Decision> {
        let mut state = self.lock()?;
        state.take_failure()?;

        let mut check = Check::passed(APPROVAL_CHECK);
        check.approver = approver.map(str::to_string);
        state.resolve(action_id, DecisionStatus::Approved, check)
    }

    fn reject_action(&self, action_id: &str, reason: Option<&str>) -> ApaaiResult<Decision> {
        let mut state = self.lock()?;
        state.take_failure()?;

        let mut check = Check::failed(REJECTION_CHECK);
        check.note = reason.map(str::to_string);
        state.resolve(action_id, DecisionStatus::Rejected, check)
    }

    fn get_action(&self, action_id: &str) -> ApaaiResult<Action> {
        let mut state = self.lock()?;
        state.take_failure()?;
        state.action(action_id).cloned()
    }

    /// Honors the `status` and `type` filters; other keys are ignored.
    fn list_actions(&self, filters: Option<&ActionFilters>) -> ApaaiResult<Vec<Action>> {
        let mut state = self.lock()?;
        state.take_failure()?;

        let status = filters.and_then(|f| f.get("status"));
        let action_type = filters.and_then(|f| f.get("type"));

        Ok(state
            .actions
            .iter()
            .filter(|a| status.map_or(true, |s| a.status.is_some_and(|st| st.as_str() == s)))
            .filter(|a| action_type.map_or(true, |t| a.action_type == t))
            .cloned()
            .collect())
    }

    fn get_evidence(&self, action_id: &str) -> ApaaiResult<Vec<Evidence>> {
        let mut state = self.lock()?;
        state.take_failure()?;
        state.action(action_id)?;
        Ok(state.evidence.get(action_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poisoned_store_fails_every_call() {
        let transport = InMemoryTransport::new();
        let holder = transport.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.state.lock().unwrap();
            panic!("worker died holding the store");
        })
        .join();

        assert!(transport.fail_next(Some(500), "unused").unwrap_err().is_transport());
        assert!(transport.action_count().is_err());
        let err = transport.get_action("act_1").unwrap_err();
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("poisoned"));
    }
}
