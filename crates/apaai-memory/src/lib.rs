//! # apaai-memory
//!
//! An in-process reference transport for the APAAI accountability client.
//!
//! ## Overview
//!
//! [`InMemoryTransport`] implements [`apaai_core::Transport`] without a
//! network. It records actions, decides them from a stored policy, enforces
//! the approval state machine, and appends evidence batches. Use it in tests
//! and offline demos; it is not a decision engine of record.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use apaai_core::{AccountabilityLayer, Proposal};
//! use apaai_memory::InMemoryTransport;
//!
//! let transport = InMemoryTransport::with_policy(policy);
//! let layer = AccountabilityLayer::with_transport(transport.clone());
//! let decision = layer.propose(Proposal::new("send_email", actor))?;
//! ```

pub mod memory;

pub use memory::{InMemoryTransport, APPROVAL_CHECK, REJECTION_CHECK};

// ── Tests ─────────────────────────────────────────────────────────────────────
