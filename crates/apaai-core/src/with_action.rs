//! Guarded execution: propose → approval → execute → evidence.
//!
//! `with_action` wraps a side effect so that it only runs once the server
//! has let it through, and so that its outcome is always attested.
//!
//! | Decision            | Behavior                                              |
//! |---------------------|-------------------------------------------------------|
//! | `approved`/`observed` | execute                                             |
//! | `requires_approval` | run the approval hook; execute only if it approved    |
//! | `rejected`          | return `Rejected`; the side effect never runs         |

use std::fmt::Display;

use thiserror::Error;
use tracing::{debug, warn};

use apaai_contracts::{ApaaiError, ApaaiResult, Check, Decision, DecisionStatus};

use crate::layer::{AccountabilityLayer, Proposal};

/// Check recorded when execution succeeds and no success hook is supplied.
pub const DEFAULT_SUCCESS_CHECK: &str = "action_executed";

/// Check recorded when execution fails and no error hook is supplied.
pub const DEFAULT_FAILURE_CHECK: &str = "action_failed";

/// Why a guarded action did not produce a value.
#[derive(Debug, Error)]
pub enum WithActionError<E> {
    /// Proposing, approving, or submitting evidence failed.
    #[error(transparent)]
    Apaai(#[from] ApaaiError),

    /// The server rejected the action; it was not executed.
    #[error("action '{action_id}' was rejected")]
    Rejected { action_id: String },

    /// The action needs human approval and no approval hook was supplied.
    #[error("action '{action_id}' requires approval and no approval hook was supplied")]
    AwaitingApproval { action_id: String },

    /// The side effect itself failed. Failure evidence has been submitted.
    #[error("action execution failed: {0}")]
    Execute(E),
}

type ApprovalHook<'a> = Box<dyn FnMut(&Decision) -> ApaaiResult<Decision> + 'a>;
type SuccessHook<'a, T> = Box<dyn Fn(&T) -> Vec<Check> + 'a>;
type ErrorHook<'a, E> = Box<dyn Fn(&E) -> Vec<Check> + 'a>;

/// Optional callbacks for [`with_action`].
pub struct ActionHooks<'a, T, E> {
    on_approval: Option<ApprovalHook<'a>>,
    on_success: Option<SuccessHook<'a, T>>,
    on_error: Option<ErrorHook<'a, E>>,
}

impl<T, E> Default for ActionHooks<'_, T, E> {
    fn default() -> Self {
        Self {
            on_approval: None,
            on_success: None,
            on_error: None,
        }
    }
}

impl<'a, T, E> ActionHooks<'a, T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when the decision is `requires_approval`. It should block
    /// until a human has decided and return that decision, typically the
    /// result of `HumanManager::approve` or `reject`. The action runs only if
    /// the returned status is `approved`; returning an error aborts it.
    pub fn on_approval(mut self, hook: impl FnMut(&Decision) -> ApaaiResult<Decision> + 'a) -> Self {
        self.on_approval = Some(Box::new(hook));
        self
    }

    /// Builds the evidence checks for a successful execution.
    pub fn on_success(mut self, hook: impl Fn(&T) -> Vec<Check> + 'a) -> Self {
        self.on_success = Some(Box::new(hook));
        self
    }

    /// Builds the evidence checks for a failed execution.
    pub fn on_error(mut self, hook: impl Fn(&E) -> Vec<Check> + 'a) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }
}

/// Propose `proposal`, run `execute` if allowed, and attach evidence of the
/// outcome either way.
pub fn with_action<T, E, F>(
    layer: &AccountabilityLayer,
    proposal: Proposal,
    mut hooks: ActionHooks<'_, T, E>,
    execute: F,
) -> Result<T, WithActionError<E>>
where
    F: FnOnce() -> Result<T, E>,
    E: Display,
{
    let decision = layer.propose(proposal)?;
    let action_id = decision.action_id.clone();

    match decision.status {
        DecisionStatus::Rejected => {
            return Err(WithActionError::Rejected { action_id });
        }
        DecisionStatus::RequiresApproval => {
            let Some(hook) = hooks.on_approval.as_mut() else {
                return Err(WithActionError::AwaitingApproval { action_id });
            };
            let human = hook(&decision)?;
            match human.status {
                DecisionStatus::Approved => {}
                DecisionStatus::Rejected => {
                    warn!(action_id = %action_id, "action rejected during approval");
                    return Err(WithActionError::Rejected { action_id });
                }
                other => {
                    warn!(action_id = %action_id, status = %other, "approval hook returned without a verdict");
                    return Err(WithActionError::AwaitingApproval { action_id });
                }
            }
        }
        DecisionStatus::Approved | DecisionStatus::Observed => {}
    }

    debug!(action_id = %action_id, "executing guarded action");

    match execute() {
        Ok(value) => {
            let checks = match &hooks.on_success {
                Some(hook) => hook(&value),
                None => vec![Check::passed(DEFAULT_SUCCESS_CHECK)],
            };
            layer.evidence(&action_id, checks)?;
            Ok(value)
        }
        Err(err) => {
            let checks = match &hooks.on_error {
                Some(hook) => hook(&err),
                None => vec![Check::failed(DEFAULT_FAILURE_CHECK).with_note(err.to_string())],
            };
            if let Err(submit_err) = layer.evidence(&action_id, checks) {
                warn!(
                    action_id = %action_id,
                    execute_error = %err,
                    "failure evidence could not be submitted"
                );
                return Err(submit_err.into());
            }
            Err(WithActionError::Execute(err))
        }
    }
}
