//! Parity-Ethereum command construction.
//!
//! Parity selects networks entirely through `--chain`, so there is no
//! genesis initialization step. Its verbosity is a named logging level,
//! `localhost` spells `local` for interface flags, wildcard cors/origins
//! spell `all`, and dev mode unlocks a fixed pre-funded chain account
//! via launch flags against the dev password file.

use crate::NodeClient;
use runner_config::{NodeConfig, SyncMode};
use runner_types::{Advisory, ClientDefaults, ClientKind, CommandSpec, PARITY_DEFAULTS};

/// Substring of parity diagnostic output marking RPC/WS availability.
const READY_MARKER: &str = "Public node URL";

/// Command builder for the parity backend.
pub struct ParityClient {
	config: NodeConfig,
	bin: String,
}

impl ParityClient {
	/// Binds the builder to a resolved configuration.
	pub fn new(config: NodeConfig) -> Self {
		let bin = config
			.client_bin
			.clone()
			.unwrap_or_else(|| PARITY_DEFAULTS.bin.to_string());
		Self { config, bin }
	}

	/// Chain selector. Networks parity does not run are substituted
	/// with the closest supported one, with an advisory.
	fn chain_flag(&self, warnings: &mut Vec<Advisory>) -> String {
		if self.config.dev {
			return "--chain=dev".to_string();
		}
		let network = match self.config.network_type.as_str() {
			"rinkeby" => {
				warnings.push(Advisory::NetworkSubstituted {
					requested: "rinkeby".to_string(),
					actual: "kovan".to_string(),
				});
				"kovan"
			},
			"testnet" => {
				warnings.push(Advisory::NetworkSubstituted {
					requested: "testnet".to_string(),
					actual: "ropsten".to_string(),
				});
				"ropsten"
			},
			other => other,
		};
		format!("--chain={}", network)
	}

	/// Options shared by every parity invocation.
	fn common_options(&self, warnings: &mut Vec<Advisory>) -> Vec<String> {
		let config = &self.config;
		let mut cmd = vec![self.chain_flag(warnings)];

		cmd.push(format!("--network-id={}", config.network_id));
		if let Some(datadir) = &config.datadir {
			cmd.push(format!("--base-path={}", datadir.display()));
		}
		match config.sync_mode {
			Some(SyncMode::Light) => cmd.push("--light".to_string()),
			Some(SyncMode::Fast) => cmd.push("--pruning=fast".to_string()),
			Some(SyncMode::Full) => cmd.push("--pruning=archive".to_string()),
			None => {},
		}
		if let Some(password) = config.effective_password() {
			cmd.push(format!("--password={}", password.display()));
		}
		if let Some(level) = config.bounded_verbosity() {
			// Parity cannot be silenced entirely and tops out at debug.
			let logging = match level {
				0 | 1 => "error",
				2 => "warn",
				3 => "info",
				_ => "debug",
			};
			cmd.push(format!("--logging={}", logging));
		}
		cmd
	}

	fn rpc_options(&self, warnings: &mut Vec<Advisory>) -> Vec<String> {
		let config = &self.config;
		let mut cmd = vec![
			format!("--port={}", config.p2p_port),
			format!("--jsonrpc-port={}", config.rpc_port),
			format!("--jsonrpc-interface={}", interface(&config.rpc_host)),
		];
		match config.rpc_cors_domain.as_deref() {
			Some("*") => {
				warnings.push(Advisory::CorsWildcard);
				cmd.push("--jsonrpc-cors=all".to_string());
			},
			Some(domain) => cmd.push(format!("--jsonrpc-cors={}", domain)),
			None => warnings.push(Advisory::CorsUnset),
		}
		cmd.push("--jsonrpc-hosts=all".to_string());
		cmd
	}

	fn ws_options(&self, warnings: &mut Vec<Advisory>) -> Vec<String> {
		let config = &self.config;
		if !config.ws_rpc {
			return Vec::new();
		}
		let mut cmd = vec![
			format!("--ws-port={}", config.ws_port),
			format!("--ws-interface={}", interface(&config.ws_host)),
		];
		match config.ws_origins.as_deref() {
			Some("*") => {
				warnings.push(Advisory::WsOriginsWildcard);
				cmd.push("--ws-origins=all".to_string());
			},
			Some(origins) => cmd.push(format!("--ws-origins={}", origins)),
			None => warnings.push(Advisory::WsOriginsUnset),
		}
		cmd.push("--ws-hosts=all".to_string());
		cmd
	}
}

/// Parity spells the loopback interface `local`.
fn interface(host: &str) -> &str {
	if host == "localhost" {
		"local"
	} else {
		host
	}
}

impl NodeClient for ParityClient {
	fn kind(&self) -> ClientKind {
		ClientKind::Parity
	}

	fn name(&self) -> &'static str {
		"parity"
	}

	fn pretty_name(&self) -> &'static str {
		"Parity-Ethereum (https://www.parity.io/ethereum/)"
	}

	fn defaults(&self) -> &'static ClientDefaults {
		&PARITY_DEFAULTS
	}

	fn bin(&self) -> &str {
		&self.bin
	}

	fn version_command(&self) -> CommandSpec {
		CommandSpec::new(self.bin.as_str()).arg("--version")
	}

	fn genesis_init_command(&self) -> Option<CommandSpec> {
		// Custom networks are configured through --chain at launch.
		None
	}

	fn new_account_command(&self, warnings: &mut Vec<Advisory>) -> CommandSpec {
		if self.config.effective_password().is_none() {
			warnings.push(Advisory::MissingAccountPassword);
		}
		CommandSpec::new(self.bin.as_str())
			.args(self.common_options(&mut Vec::new()))
			.args(["account", "new"])
	}

	fn list_accounts_command(&self) -> CommandSpec {
		CommandSpec::new(self.bin.as_str())
			.args(self.common_options(&mut Vec::new()))
			.args(["account", "list"])
	}

	fn main_command(&self, address: Option<&str>, warnings: &mut Vec<Advisory>) -> CommandSpec {
		let config = &self.config;
		let mut args = self.common_options(warnings);
		args.extend(self.rpc_options(warnings));
		args.extend(self.ws_options(warnings));

		if config.nodiscover {
			args.push("--no-discovery".to_string());
		}
		if config.vmdebug {
			args.push("--tracing".to_string());
			args.push("on".to_string());
		}
		args.push(format!("--max-peers={}", config.maxpeers));
		if !config.bootnodes.is_empty() {
			args.push(format!("--bootnodes={}", config.bootnodes));
		}

		let mut rpc_api = config.rpc_api.clone();
		let mut ws_api = config.ws_api.clone();
		if config.whisper {
			for api in [&mut rpc_api, &mut ws_api] {
				for module in ["shh", "shh_pubsub"] {
					if !api.iter().any(|m| m == module) {
						api.push(module.to_string());
					}
				}
			}
			args.push("--whisper".to_string());
		}
		args.push(format!("--jsonrpc-apis={}", rpc_api.join(",")));
		args.push(format!("--ws-apis={}", ws_api.join(",")));

		// The dev chain ships a fixed pre-funded account; its unlock is
		// the one dev-mode account operation done at launch time.
		if config.dev {
			if let Some(dev_account) = PARITY_DEFAULTS.dev_account {
				args.push(format!("--unlock={}", dev_account));
			}
		} else if let Some(unlock) = config.account.address.as_deref().or(address) {
			args.push(format!("--unlock={}", unlock));
		}

		let gas = config
			.target_gas_limit
			.unwrap_or(PARITY_DEFAULTS.target_gas_limit);
		args.push(format!("--gas-floor-target={}", gas));

		CommandSpec {
			bin: self.bin.clone(),
			args,
		}
	}

	fn is_ready_signal(&self, line: &str) -> bool {
		line.contains(READY_MARKER)
	}

	fn dev_init_commands(&self) -> Vec<CommandSpec> {
		// Pre-create the dev account against the dev password file; the
		// launch command unlocks it via flags.
		vec![CommandSpec::new(self.bin.as_str())
			.args(self.common_options(&mut Vec::new()))
			.args(["account", "new"])]
	}
}
