//! # apaai-contracts
//!
//! Shared types, wire shapes, and errors for the APAAI accountability
//! protocol.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions, their serde mapping, and error types.

pub mod action;
pub mod actor;
pub mod check;
pub mod decision;
pub mod error;
pub mod evidence;
pub mod input;
pub mod policy;

pub use action::{Action, ActionFilters};
pub use actor::{Actor, ActorKind};
pub use check::Check;
pub use decision::{Decision, DecisionCheck, DecisionStatus};
pub use error::{ApaaiError, ApaaiResult};
pub use evidence::{Evidence, EvidenceReceipt};
pub use input::{ActorInput, CheckInput, PolicyInput, Repr};
pub use policy::{Policy, PolicyMode, PolicyRule, RuleMatch};
