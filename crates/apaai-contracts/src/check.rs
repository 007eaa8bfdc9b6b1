//! Pass/fail check types.
//!
//! A `Check` is one named assertion. Sequences of checks keep their order,
//! and duplicate names are allowed: each entry is a distinct evaluation.

use serde::{Deserialize, Serialize};

/// A single named pass/fail assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub name: String,
    pub pass: bool,
    /// Free-form explanation (e.g. a message id or failure text).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Who signed off, for checks recorded by a human approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver: Option<String>,
}

impl Check {
    pub fn passed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pass: true,
            note: None,
            approver: None,
        }
    }

    pub fn failed(name: impl Into<String>) -> Self {
        Self {
            pass: false,
            ..Self::passed(name)
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_approver(mut self, approver: impl Into<String>) -> Self {
        self.approver = Some(approver.into());
        self
    }
}
