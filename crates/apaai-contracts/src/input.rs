//! Caller-facing input representations.
//!
//! Operations that take an actor, a check, or a policy accept either the
//! typed value or an open JSON mapping. `Repr<T>` is that choice made
//! explicit; normalization in `apaai-core` turns either form into the
//! canonical wire mapping.

use serde_json::{Map, Value};

use crate::{actor::Actor, check::Check, policy::Policy};

/// A typed domain value or an equivalent open mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Repr<T> {
    Typed(T),
    /// Loosely-typed input. Only JSON objects are valid; anything else is
    /// rejected during normalization.
    Open(Value),
}

pub type ActorInput = Repr<Actor>;
pub type CheckInput = Repr<Check>;
pub type PolicyInput = Repr<Policy>;

impl<T> From<Value> for Repr<T> {
    fn from(value: Value) -> Self {
        Self::Open(value)
    }
}

impl<T> From<Map<String, Value>> for Repr<T> {
    fn from(map: Map<String, Value>) -> Self {
        Self::Open(Value::Object(map))
    }
}

impl From<Actor> for ActorInput {
    fn from(actor: Actor) -> Self {
        Self::Typed(actor)
    }
}

impl From<Check> for CheckInput {
    fn from(check: Check) -> Self {
        Self::Typed(check)
    }
}

impl From<Policy> for PolicyInput {
    fn from(policy: Policy) -> Self {
        Self::Typed(policy)
    }
}
