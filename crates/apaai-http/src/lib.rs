//! # apaai-http
//!
//! The HTTP collaborator for the APAAI accountability client.
//!
//! [`HttpTransport`] implements [`apaai_core::Transport`] over blocking
//! JSON-over-HTTP; [`ClientConfig`] holds the endpoint, api key, and the
//! transport-level knobs (timeout, user agent, extra headers).
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use apaai_core::Proposal;
//! use apaai_http::{connect, ClientConfig};
//!
//! let layer = connect(&ClientConfig::from_env())?;
//! let decision = layer.propose(Proposal::new("send_email", actor))?;
//! ```

pub mod config;
pub mod transport;

pub use config::ClientConfig;
pub use transport::HttpTransport;

use apaai_contracts::ApaaiResult;
use apaai_core::AccountabilityLayer;

/// Build an `AccountabilityLayer` backed by an `HttpTransport`.
pub fn connect(config: &ClientConfig) -> ApaaiResult<AccountabilityLayer> {
    let transport = HttpTransport::new(config)?;
    tracing::debug!(endpoint = %transport.endpoint(), "connected accountability layer");
    Ok(AccountabilityLayer::with_transport(transport))
}

/// `connect` using `APAAI_ENDPOINT` / `APAAI_KEY` from the environment.
pub fn connect_from_env() -> ApaaiResult<AccountabilityLayer> {
    connect(&ClientConfig::from_env())
}
