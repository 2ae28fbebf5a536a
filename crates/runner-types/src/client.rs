//! Backend selection and per-backend default tables.
//!
//! Exactly one backend is bound at construction time and never changes
//! for the lifetime of a run. Each backend carries its own default
//! tables; the divergences between them (API lists, dev account, binary
//! name) are part of the supported clients' real grammar and must not be
//! unified.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The supported node backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
	/// Go-Ethereum.
	#[default]
	Geth,
	/// Parity-Ethereum.
	Parity,
}

impl fmt::Display for ClientKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ClientKind::Geth => write!(f, "geth"),
			ClientKind::Parity => write!(f, "parity"),
		}
	}
}

/// Error returned when a client name does not match a supported backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownClient(pub String);

impl fmt::Display for UnknownClient {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "unknown client \"{}\", expected one of: geth, parity", self.0)
	}
}

impl std::error::Error for UnknownClient {}

impl FromStr for ClientKind {
	type Err = UnknownClient;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"geth" => Ok(ClientKind::Geth),
			"parity" => Ok(ClientKind::Parity),
			other => Err(UnknownClient(other.to_string())),
		}
	}
}

/// Default tables for a backend.
///
/// Used when merging user overrides into a full configuration and by the
/// command builders themselves.
#[derive(Debug, Clone, Copy)]
pub struct ClientDefaults {
	/// Default binary name, overridable per run.
	pub bin: &'static str,
	/// Default network type selector.
	pub network_type: &'static str,
	/// Default network id.
	pub network_id: u64,
	/// Default RPC API allow-list.
	pub rpc_api: &'static [&'static str],
	/// Default WebSocket API allow-list.
	pub ws_api: &'static [&'static str],
	/// WebSocket API allow-list used in dev mode, which additionally
	/// exposes the account-management module.
	pub dev_ws_api: &'static [&'static str],
	/// Gas target applied when the user configures none.
	pub target_gas_limit: u64,
	/// Pre-funded account of the backend's built-in dev chain, when the
	/// backend has one.
	pub dev_account: Option<&'static str>,
}

/// Go-Ethereum defaults.
pub const GETH_DEFAULTS: ClientDefaults = ClientDefaults {
	bin: "geth",
	network_type: "custom",
	network_id: 1337,
	rpc_api: &["eth", "web3", "net", "debug"],
	ws_api: &["eth", "web3", "net", "shh", "debug", "pubsub"],
	dev_ws_api: &["eth", "web3", "net", "shh", "debug", "pubsub", "personal"],
	target_gas_limit: 8_000_000,
	dev_account: None,
};

/// Parity-Ethereum defaults.
pub const PARITY_DEFAULTS: ClientDefaults = ClientDefaults {
	bin: "parity",
	network_type: "dev",
	network_id: 17,
	rpc_api: &[
		"web3",
		"eth",
		"pubsub",
		"net",
		"parity",
		"private",
		"parity_pubsub",
		"traces",
		"rpc",
		"shh",
		"shh_pubsub",
	],
	ws_api: &[
		"web3",
		"eth",
		"pubsub",
		"net",
		"parity",
		"private",
		"parity_pubsub",
		"traces",
		"rpc",
		"shh",
		"shh_pubsub",
	],
	dev_ws_api: &[
		"web3",
		"eth",
		"pubsub",
		"net",
		"parity",
		"private",
		"parity_pubsub",
		"traces",
		"rpc",
		"shh",
		"shh_pubsub",
		"personal",
	],
	target_gas_limit: 8_000_000,
	dev_account: Some("0x00a329c0648769a73afac7f9381e08fb43dbea72"),
};

impl ClientKind {
	/// Returns the default tables for this backend.
	pub fn defaults(&self) -> &'static ClientDefaults {
		match self {
			ClientKind::Geth => &GETH_DEFAULTS,
			ClientKind::Parity => &PARITY_DEFAULTS,
		}
	}
}
