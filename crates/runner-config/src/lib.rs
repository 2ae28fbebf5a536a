//! Configuration module for the node runner.
//!
//! A [`NodeConfig`] is built exactly once per run by merging user
//! overrides ([`UserConfig`], every field optional) with the selected
//! backend's default tables. Validation failures here are fatal: a
//! configuration that cannot be resolved never reaches any process step.

use runner_types::{ClientDefaults, ClientKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default host for the RPC and WebSocket endpoints.
pub const DEFAULT_HOST: &str = "localhost";
/// Default RPC port.
pub const DEFAULT_RPC_PORT: u16 = 8545;
/// Default WebSocket port.
pub const DEFAULT_WS_PORT: u16 = 8546;
/// Default devp2p listening port.
pub const DEFAULT_P2P_PORT: u16 = 30303;
/// Default peer-count limit.
pub const DEFAULT_MAX_PEERS: u32 = 25;
/// Offset applied to the node's real RPC/WS ports when the port relay
/// fronts them, so the relay can listen on the public ports.
pub const PROXY_PORT_OFFSET: u16 = 10;

/// Errors that can occur while resolving a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// A configured path contains a space character. The supervised
	/// backends mis-parse such paths, so this aborts the run before any
	/// process step.
	#[error("the path for {field} contains spaces, please remove them")]
	PathContainsSpace {
		/// Name of the offending configuration field.
		field: &'static str,
	},
	/// Error that occurs when parsing TOML configuration.
	#[error("configuration error: {0}")]
	Parse(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Blockchain sync mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
	/// Light client sync.
	Light,
	/// Fast sync / state pruning.
	Fast,
	/// Full archive sync.
	Full,
}

impl SyncMode {
	/// The flag value spelling shared by backends that take the mode as
	/// a plain word.
	pub fn as_str(&self) -> &'static str {
		match self {
			SyncMode::Light => "light",
			SyncMode::Fast => "fast",
			SyncMode::Full => "full",
		}
	}
}

/// Account credentials used for unlocking and provisioning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountSettings {
	/// Explicitly configured account address. Takes priority over any
	/// address discovered or created during initialization.
	#[serde(default)]
	pub address: Option<String>,
	/// Path to the account password file.
	#[serde(default)]
	pub password: Option<PathBuf>,
	/// Path to the dev-mode password file.
	#[serde(default)]
	pub dev_password: Option<PathBuf>,
}

/// User-supplied configuration overrides. Every field is optional;
/// unset fields fall back to the selected backend's defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
	/// Which backend to run. Defaults to geth.
	#[serde(default)]
	pub client: Option<ClientKind>,
	/// Executable override for the selected backend.
	#[serde(default)]
	pub client_bin: Option<String>,
	#[serde(default)]
	pub network_type: Option<String>,
	#[serde(default)]
	pub network_id: Option<u64>,
	#[serde(default)]
	pub genesis_block: Option<PathBuf>,
	#[serde(default)]
	pub datadir: Option<PathBuf>,
	#[serde(default)]
	pub mine_when_needed: Option<bool>,
	#[serde(default)]
	pub mine: Option<bool>,
	#[serde(default)]
	pub rpc_host: Option<String>,
	#[serde(default)]
	pub rpc_port: Option<u16>,
	#[serde(default)]
	pub rpc_cors_domain: Option<String>,
	#[serde(default)]
	pub rpc_api: Option<Vec<String>>,
	#[serde(default)]
	pub p2p_port: Option<u16>,
	#[serde(default)]
	pub nodiscover: Option<bool>,
	#[serde(default)]
	pub vmdebug: Option<bool>,
	#[serde(default)]
	pub account: Option<AccountSettings>,
	#[serde(default)]
	pub whisper: Option<bool>,
	#[serde(default)]
	pub maxpeers: Option<u32>,
	#[serde(default)]
	pub bootnodes: Option<String>,
	#[serde(default)]
	pub ws_rpc: Option<bool>,
	#[serde(default)]
	pub ws_host: Option<String>,
	#[serde(default)]
	pub ws_port: Option<u16>,
	#[serde(default)]
	pub ws_origins: Option<String>,
	#[serde(default)]
	pub ws_api: Option<Vec<String>>,
	#[serde(default)]
	pub target_gas_limit: Option<u64>,
	#[serde(default)]
	pub sync_mode: Option<SyncMode>,
	#[serde(default)]
	pub verbosity: Option<u8>,
	#[serde(default)]
	pub dev: Option<bool>,
	#[serde(default)]
	pub proxy: Option<bool>,
}

/// Fully resolved node configuration, immutable for the run.
#[derive(Debug, Clone, Serialize)]
pub struct NodeConfig {
	/// The backend bound for this run.
	pub client: ClientKind,
	/// Executable override; the backend's default binary when `None`.
	pub client_bin: Option<String>,
	pub network_type: String,
	pub network_id: u64,
	pub genesis_block: Option<PathBuf>,
	pub datadir: Option<PathBuf>,
	pub mine_when_needed: bool,
	pub mine: bool,
	pub rpc_host: String,
	/// Port the node itself binds its RPC endpoint to. When `proxy` is
	/// enabled this is the public port shifted by [`PROXY_PORT_OFFSET`].
	pub rpc_port: u16,
	/// Port owners connect to for RPC; equals `rpc_port` without proxy.
	pub public_rpc_port: u16,
	pub rpc_cors_domain: Option<String>,
	pub rpc_api: Vec<String>,
	pub p2p_port: u16,
	pub nodiscover: bool,
	pub vmdebug: bool,
	pub account: AccountSettings,
	pub whisper: bool,
	pub maxpeers: u32,
	pub bootnodes: String,
	pub ws_rpc: bool,
	pub ws_host: String,
	/// Port the node itself binds its WebSocket endpoint to; shifted by
	/// [`PROXY_PORT_OFFSET`] when `proxy` is enabled.
	pub ws_port: u16,
	/// Port owners connect to for WebSocket; equals `ws_port` without proxy.
	pub public_ws_port: u16,
	pub ws_origins: Option<String>,
	pub ws_api: Vec<String>,
	pub target_gas_limit: Option<u64>,
	pub sync_mode: Option<SyncMode>,
	/// Log verbosity in the 0..=5 range; values outside the range are
	/// ignored by the command builders.
	pub verbosity: Option<u8>,
	/// Single-node ephemeral dev mode.
	pub dev: bool,
	/// Front the RPC/WS ports with a local relay.
	pub proxy: bool,
}

impl NodeConfig {
	/// Merges user overrides with the given backend defaults.
	///
	/// The backend is taken from `user.client` (geth when unset) and the
	/// caller supplies that backend's [`ClientDefaults`]. Path validation
	/// runs last; any offending path aborts resolution.
	pub fn resolve(user: UserConfig, defaults: &ClientDefaults) -> Result<Self, ConfigError> {
		let dev = user.dev.unwrap_or(false);
		let proxy = user.proxy.unwrap_or(true);
		let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();

		let ws_api_default = if dev {
			owned(defaults.dev_ws_api)
		} else {
			owned(defaults.ws_api)
		};

		// The relay listens on the public ports, so the node's real
		// endpoints move out of the way.
		let public_rpc_port = user.rpc_port.unwrap_or(DEFAULT_RPC_PORT);
		let public_ws_port = user.ws_port.unwrap_or(DEFAULT_WS_PORT);
		let shift = if proxy { PROXY_PORT_OFFSET } else { 0 };

		let config = Self {
			client: user.client.unwrap_or_default(),
			client_bin: user.client_bin,
			network_type: user
				.network_type
				.unwrap_or_else(|| defaults.network_type.to_string()),
			network_id: user.network_id.unwrap_or(defaults.network_id),
			genesis_block: user.genesis_block,
			datadir: user.datadir,
			mine_when_needed: user.mine_when_needed.unwrap_or(false),
			mine: user.mine.unwrap_or(false),
			rpc_host: user.rpc_host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
			rpc_port: public_rpc_port + shift,
			public_rpc_port,
			rpc_cors_domain: user.rpc_cors_domain,
			rpc_api: user.rpc_api.unwrap_or_else(|| owned(defaults.rpc_api)),
			p2p_port: user.p2p_port.unwrap_or(DEFAULT_P2P_PORT),
			nodiscover: user.nodiscover.unwrap_or(false),
			vmdebug: user.vmdebug.unwrap_or(false),
			account: user.account.unwrap_or_default(),
			whisper: user.whisper.unwrap_or(true),
			maxpeers: user.maxpeers.unwrap_or(DEFAULT_MAX_PEERS),
			bootnodes: user.bootnodes.unwrap_or_default(),
			ws_rpc: user.ws_rpc.unwrap_or(true),
			ws_host: user.ws_host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
			ws_port: public_ws_port + shift,
			public_ws_port,
			ws_origins: user.ws_origins,
			ws_api: user.ws_api.unwrap_or(ws_api_default),
			target_gas_limit: user.target_gas_limit,
			sync_mode: user.sync_mode,
			verbosity: user.verbosity,
			dev,
			proxy,
		};

		config.validate()?;
		Ok(config)
	}

	/// Rejects paths the supervised backends cannot handle.
	fn validate(&self) -> Result<(), ConfigError> {
		let space_free = |path: Option<&Path>, field: &'static str| match path {
			Some(p) if p.to_string_lossy().contains(' ') => {
				Err(ConfigError::PathContainsSpace { field })
			},
			_ => Ok(()),
		};

		space_free(self.datadir.as_deref(), "datadir")?;
		space_free(self.genesis_block.as_deref(), "genesis_block")?;
		space_free(self.account.password.as_deref(), "account.password")?;
		space_free(self.account.dev_password.as_deref(), "account.dev_password")?;
		Ok(())
	}

	/// The account password file in effect: the dev password in dev
	/// mode, the configured password otherwise.
	pub fn effective_password(&self) -> Option<&Path> {
		if self.dev {
			self.account.dev_password.as_deref()
		} else {
			self.account.password.as_deref()
		}
	}

	/// Verbosity clamped to the meaningful 0..=5 range, `None` outside it.
	pub fn bounded_verbosity(&self) -> Option<u8> {
		self.verbosity.filter(|v| *v <= 5)
	}
}
