//! # apaai-core
//!
//! The client-side accountability core for APAAI.
//!
//! This crate provides:
//! - The `Transport` trait: the seam where a concrete network client plugs in
//! - Normalization of loosely-typed input into canonical wire shapes
//! - `AccountabilityLayer`, the facade agents call to propose actions and
//!   attach evidence, plus its policy / human / evidence / action managers
//! - `with_action`, which wraps a side effect in the full lifecycle
//!
//! ## Usage
//!
//! ```rust,ignore
//! use apaai_core::{AccountabilityLayer, Proposal};
//!
//! let layer = AccountabilityLayer::with_transport(transport);
//! let decision = layer.propose(Proposal::new("send_email", actor))?;
//! layer.evidence(&decision.action_id, vec![json!({ "name": "email_sent", "pass": true })])?;
//! ```

pub mod layer;
pub mod managers;
pub mod normalize;
pub mod traits;
pub mod with_action;

#[cfg(test)]
pub(crate) mod testing;

pub use layer::{AccountabilityLayer, ApaaiClient, Proposal, TraceClient};
pub use managers::{ActionManager, EvidenceManager, HumanManager, PolicyEvaluation, PolicyManager};
pub use normalize::{normalize_checks, to_jsonable};
pub use traits::Transport;
pub use with_action::{with_action, ActionHooks, WithActionError};
