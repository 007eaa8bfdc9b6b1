//! Actor identity types.
//!
//! An `Actor` names who (or what) initiated an action. It is attached to an
//! action at proposal time and never changes afterward.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The category of principal behind an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Agent,
    Human,
    System,
}

/// Who or what initiated an action.
///
/// Example: `{"kind": "agent", "name": "mail-bot", "provider": "openai"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub kind: ActorKind,
    /// Identifying name (e.g. "mail-bot").
    pub name: String,
    /// Originating platform or model identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Fields this client does not model, carried through verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Actor {
    pub fn new(kind: ActorKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            provider: None,
            extra: Map::new(),
        }
    }

    pub fn agent(name: impl Into<String>) -> Self {
        Self::new(ActorKind::Agent, name)
    }

    pub fn human(name: impl Into<String>) -> Self {
        Self::new(ActorKind::Human, name)
    }

    pub fn system(name: impl Into<String>) -> Self {
        Self::new(ActorKind::System, name)
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }
}
