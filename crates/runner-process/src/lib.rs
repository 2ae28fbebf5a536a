//! Process supervision module for the node runner.
//!
//! This module drives the supervised node executable across its full run
//! lifecycle: installation check, chain/account initialization, process
//! spawn, diagnostic-stream monitoring with one-shot readiness latching,
//! and exit reporting. Pre-spawn failures are synchronous and abort the
//! run; everything after the spawn is delivered asynchronously through
//! owner callbacks and never propagates past the supervisor boundary.

use thiserror::Error;

/// Dev-mode account provisioning over JSON-RPC.
pub mod dev_funds;
/// Opaque port-relay seam fronting the node's RPC/WS ports.
pub mod relay;
/// Command execution seam.
pub mod runner;
/// The lifecycle state machine.
pub mod supervisor;

pub use dev_funds::{AccountProvisioner, DevFunds, NoopProvisioner, ProvisionError};
pub use relay::{PortRelay, RelayHandle};
pub use runner::{CommandOutput, CommandRunner, TokioCommandRunner};
pub use supervisor::{InitOutcome, NodeState, NodeSupervisor};

/// Errors that can occur before the node process is spawned.
#[derive(Debug, Error)]
pub enum ProcessError {
	/// The backend binary is missing or broken.
	#[error("ethereum client binary not found: {0}")]
	Installation(String),
	/// Data directory, genesis or account creation failed.
	#[error("chain initialization failed: {0}")]
	Initialization(String),
	/// The port relay could not be served.
	#[error("port relay error: {0}")]
	Relay(String),
}
