//! Go-Ethereum command construction.
//!
//! Geth selects custom networks with `--networkid` plus a genesis `init`
//! run, takes its verbosity as a plain 0-5 number, and in dev mode
//! self-provisions a funded, unlocked account, so `--dev` replaces the
//! whole unlock flow.

use crate::NodeClient;
use runner_config::NodeConfig;
use runner_types::{Advisory, ClientDefaults, ClientKind, CommandSpec, GETH_DEFAULTS};

/// Substring of geth diagnostic output marking RPC/WS availability.
const READY_MARKER: &str = "WebSocket endpoint opened";

/// Command builder for the geth backend.
pub struct GethClient {
	config: NodeConfig,
	bin: String,
}

impl GethClient {
	/// Binds the builder to a resolved configuration.
	pub fn new(config: NodeConfig) -> Self {
		let bin = config
			.client_bin
			.clone()
			.unwrap_or_else(|| GETH_DEFAULTS.bin.to_string());
		Self { config, bin }
	}

	/// Network selector flag. Named test networks use their dedicated
	/// switch, custom networks the numeric id, and anything else runs
	/// against the main network with no flag at all.
	fn network_flag(&self) -> Option<String> {
		match self.config.network_type.as_str() {
			"testnet" => Some("--testnet".to_string()),
			"rinkeby" => Some("--rinkeby".to_string()),
			"custom" => Some(format!("--networkid={}", self.config.network_id)),
			_ => None,
		}
	}

	/// Options shared by every geth invocation.
	fn common_options(&self) -> Vec<String> {
		let config = &self.config;
		let mut cmd = Vec::new();

		if let Some(network) = self.network_flag() {
			cmd.push(network);
		}
		if let Some(datadir) = &config.datadir {
			cmd.push(format!("--datadir={}", datadir.display()));
		}
		if let Some(mode) = config.sync_mode {
			cmd.push(format!("--syncmode={}", mode.as_str()));
		}
		if let Some(password) = &config.account.password {
			cmd.push(format!("--password={}", password.display()));
		}
		if let Some(level) = config.bounded_verbosity() {
			cmd.push(format!("--verbosity={}", level));
		}
		cmd
	}

	fn rpc_options(&self, warnings: &mut Vec<Advisory>) -> Vec<String> {
		let config = &self.config;
		let mut cmd = vec![
			format!("--port={}", config.p2p_port),
			"--rpc".to_string(),
			format!("--rpcport={}", config.rpc_port),
			format!("--rpcaddr={}", config.rpc_host),
		];
		match config.rpc_cors_domain.as_deref() {
			Some("*") => {
				warnings.push(Advisory::CorsWildcard);
				cmd.push("--rpccorsdomain=*".to_string());
			},
			Some(domain) => cmd.push(format!("--rpccorsdomain={}", domain)),
			None => warnings.push(Advisory::CorsUnset),
		}
		cmd
	}

	fn ws_options(&self, warnings: &mut Vec<Advisory>) -> Vec<String> {
		let config = &self.config;
		if !config.ws_rpc {
			return Vec::new();
		}
		let mut cmd = vec![
			"--ws".to_string(),
			format!("--wsport={}", config.ws_port),
			format!("--wsaddr={}", config.ws_host),
		];
		match config.ws_origins.as_deref() {
			Some("*") => {
				warnings.push(Advisory::WsOriginsWildcard);
				cmd.push("--wsorigins=*".to_string());
			},
			Some(origins) => cmd.push(format!("--wsorigins={}", origins)),
			None => warnings.push(Advisory::WsOriginsUnset),
		}
		cmd
	}
}

impl NodeClient for GethClient {
	fn kind(&self) -> ClientKind {
		ClientKind::Geth
	}

	fn name(&self) -> &'static str {
		"geth"
	}

	fn pretty_name(&self) -> &'static str {
		"Go-Ethereum (https://github.com/ethereum/go-ethereum)"
	}

	fn defaults(&self) -> &'static ClientDefaults {
		&GETH_DEFAULTS
	}

	fn bin(&self) -> &str {
		&self.bin
	}

	fn version_command(&self) -> CommandSpec {
		CommandSpec::new(self.bin.as_str()).arg("version")
	}

	fn genesis_init_command(&self) -> Option<CommandSpec> {
		let genesis = self.config.genesis_block.as_ref()?;
		Some(
			CommandSpec::new(self.bin.as_str())
				.args(self.common_options())
				.arg("init")
				.arg(genesis.display().to_string()),
		)
	}

	fn new_account_command(&self, warnings: &mut Vec<Advisory>) -> CommandSpec {
		if self.config.account.password.is_none() {
			warnings.push(Advisory::MissingAccountPassword);
		}
		CommandSpec::new(self.bin.as_str())
			.args(self.common_options())
			.args(["account", "new"])
	}

	fn list_accounts_command(&self) -> CommandSpec {
		CommandSpec::new(self.bin.as_str())
			.args(self.common_options())
			.args(["account", "list"])
	}

	fn main_command(&self, address: Option<&str>, warnings: &mut Vec<Advisory>) -> CommandSpec {
		let config = &self.config;
		let mut args = self.common_options();
		args.extend(self.rpc_options(warnings));
		args.extend(self.ws_options(warnings));

		if config.nodiscover {
			args.push("--nodiscover".to_string());
		}
		if config.vmdebug {
			args.push("--vmdebug".to_string());
		}
		args.push(format!("--maxpeers={}", config.maxpeers));
		if config.mine_when_needed || config.mine {
			args.push("--mine".to_string());
		}
		if !config.bootnodes.is_empty() {
			args.push(format!("--bootnodes={}", config.bootnodes));
		}

		let mut rpc_api = config.rpc_api.clone();
		let mut ws_api = config.ws_api.clone();
		if config.whisper {
			for api in [&mut rpc_api, &mut ws_api] {
				if !api.iter().any(|module| module == "shh") {
					api.push("shh".to_string());
				}
			}
			args.push("--shh".to_string());
		}
		args.push(format!("--rpcapi={}", rpc_api.join(",")));
		args.push(format!("--wsapi={}", ws_api.join(",")));

		// Dev mode self-unlocks; everything else unlocks the configured
		// account or the one resolved during initialization.
		if !config.dev {
			if let Some(unlock) = config.account.address.as_deref().or(address) {
				args.push(format!("--unlock={}", unlock));
			}
		}
		if let Some(gas) = config.target_gas_limit {
			args.push(format!("--miner.gastarget={}", gas));
		}
		if config.dev {
			args.push("--dev".to_string());
		}

		CommandSpec {
			bin: self.bin.clone(),
			args,
		}
	}

	fn is_ready_signal(&self, line: &str) -> bool {
		line.contains(READY_MARKER)
	}

	fn dev_init_commands(&self) -> Vec<CommandSpec> {
		// --dev provisions the chain and a funded account on its own.
		Vec::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use runner_config::{SyncMode, UserConfig};
	use runner_types::GETH_DEFAULTS;
	use std::path::PathBuf;

	fn client(user: UserConfig) -> GethClient {
		let user = UserConfig {
			proxy: Some(false),
			..user
		};
		GethClient::new(NodeConfig::resolve(user, &GETH_DEFAULTS).unwrap())
	}

	fn main_args(client: &GethClient, address: Option<&str>) -> (Vec<String>, Vec<Advisory>) {
		let mut warnings = Vec::new();
		let command = client.main_command(address, &mut warnings);
		(command.args, warnings)
	}

	fn api_list<'a>(args: &'a [String], flag: &str) -> &'a str {
		args.iter()
			.find_map(|arg| arg.strip_prefix(flag))
			.unwrap_or_else(|| panic!("{} missing from {:?}", flag, args))
	}

	#[test]
	fn test_whisper_adds_shh_to_both_api_lists() {
		let client = client(UserConfig {
			whisper: Some(true),
			..Default::default()
		});
		let (args, _) = main_args(&client, None);

		assert!(args.contains(&"--shh".to_string()));
		assert!(api_list(&args, "--rpcapi=").split(',').any(|m| m == "shh"));
		assert!(api_list(&args, "--wsapi=").split(',').any(|m| m == "shh"));
	}

	#[test]
	fn test_whisper_disabled_omits_shh_everywhere() {
		let client = client(UserConfig {
			whisper: Some(false),
			..Default::default()
		});
		let (args, _) = main_args(&client, None);

		assert!(!args.contains(&"--shh".to_string()));
		assert!(!api_list(&args, "--rpcapi=").split(',').any(|m| m == "shh"));
		assert!(!api_list(&args, "--wsapi=").split(',').any(|m| m == "shh"));
	}

	#[test]
	fn test_whisper_does_not_duplicate_existing_shh() {
		let client = client(UserConfig {
			whisper: Some(true),
			rpc_api: Some(vec!["eth".to_string(), "shh".to_string()]),
			..Default::default()
		});
		let (args, _) = main_args(&client, None);
		let count = api_list(&args, "--rpcapi=")
			.split(',')
			.filter(|m| *m == "shh")
			.count();

		assert_eq!(count, 1);
	}

	#[test]
	fn test_configured_account_outranks_initialization_address() {
		let client = client(UserConfig {
			account: Some(runner_config::AccountSettings {
				address: Some("0xconfigured".to_string()),
				..Default::default()
			}),
			..Default::default()
		});
		let (args, _) = main_args(&client, Some("0xresolved"));

		assert!(args.contains(&"--unlock=0xconfigured".to_string()));
		assert!(!args.iter().any(|a| a.contains("0xresolved")));
	}

	#[test]
	fn test_initialization_address_used_when_none_configured() {
		let client = client(UserConfig::default());
		let (args, _) = main_args(&client, Some("0xresolved"));

		assert!(args.contains(&"--unlock=0xresolved".to_string()));
	}

	#[test]
	fn test_dev_mode_uses_dev_flag_instead_of_unlock() {
		let client = client(UserConfig {
			dev: Some(true),
			..Default::default()
		});
		let (args, _) = main_args(&client, Some("0xresolved"));

		assert!(args.contains(&"--dev".to_string()));
		assert!(!args.iter().any(|a| a.starts_with("--unlock=")));
	}

	#[test]
	fn test_cors_advisories() {
		let (_, warnings) = main_args(&client(UserConfig::default()), None);
		assert!(warnings.contains(&Advisory::CorsUnset));
		assert!(warnings.contains(&Advisory::WsOriginsUnset));

		let wildcard = client(UserConfig {
			rpc_cors_domain: Some("*".to_string()),
			ws_origins: Some("*".to_string()),
			..Default::default()
		});
		let (args, warnings) = main_args(&wildcard, None);
		assert!(warnings.contains(&Advisory::CorsWildcard));
		assert!(warnings.contains(&Advisory::WsOriginsWildcard));
		assert!(args.contains(&"--rpccorsdomain=*".to_string()));
		assert!(args.contains(&"--wsorigins=*".to_string()));
	}

	#[test]
	fn test_explicit_cors_domain_carries_no_advisory() {
		let client = client(UserConfig {
			rpc_cors_domain: Some("http://localhost:8000".to_string()),
			ws_origins: Some("http://localhost:8000".to_string()),
			..Default::default()
		});
		let (args, warnings) = main_args(&client, None);

		assert!(warnings.is_empty());
		assert!(args.contains(&"--rpccorsdomain=http://localhost:8000".to_string()));
	}

	#[test]
	fn test_verbosity_passes_through_numerically() {
		let client = client(UserConfig {
			verbosity: Some(4),
			..Default::default()
		});
		let (args, _) = main_args(&client, None);

		assert!(args.contains(&"--verbosity=4".to_string()));
	}

	#[test]
	fn test_gas_target_only_when_configured() {
		let (args, _) = main_args(&client(UserConfig::default()), None);
		assert!(!args.iter().any(|a| a.starts_with("--miner.gastarget=")));

		let client = client(UserConfig {
			target_gas_limit: Some(6_000_000),
			..Default::default()
		});
		let (args, _) = main_args(&client, None);
		assert!(args.contains(&"--miner.gastarget=6000000".to_string()));
	}

	#[test]
	fn test_sync_mode_and_datadir_in_common_options() {
		let client = client(UserConfig {
			datadir: Some(PathBuf::from("/tmp/chaindata")),
			sync_mode: Some(SyncMode::Fast),
			..Default::default()
		});
		let args = client.common_options();

		assert!(args.contains(&"--datadir=/tmp/chaindata".to_string()));
		assert!(args.contains(&"--syncmode=fast".to_string()));
	}

	#[test]
	fn test_genesis_command_requires_configured_genesis() {
		assert!(client(UserConfig::default()).genesis_init_command().is_none());

		let client = client(UserConfig {
			genesis_block: Some(PathBuf::from("/tmp/genesis.json")),
			..Default::default()
		});
		let command = client.genesis_init_command().unwrap();

		assert_eq!(command.args.last().unwrap(), "/tmp/genesis.json");
		assert!(command.args.contains(&"init".to_string()));
	}

	#[test]
	fn test_new_account_without_password_warns() {
		let client = client(UserConfig::default());
		let mut warnings = Vec::new();
		let command = client.new_account_command(&mut warnings);

		assert!(warnings.contains(&Advisory::MissingAccountPassword));
		assert!(command.args.ends_with(&["account".to_string(), "new".to_string()]));
	}

	#[test]
	fn test_ready_signal_matches_websocket_marker() {
		let client = client(UserConfig::default());

		assert!(client.is_ready_signal("INFO [08-05] WebSocket endpoint opened url=ws://..."));
		assert!(!client.is_ready_signal("INFO [08-05] HTTP endpoint opened"));
	}

	#[test]
	fn test_version_command() {
		assert_eq!(client(UserConfig::default()).version_command().to_string(), "geth version");
	}

	#[test]
	fn test_bootnodes_omitted_when_empty() {
		let (args, _) = main_args(&client(UserConfig::default()), None);
		assert!(!args.iter().any(|a| a.starts_with("--bootnodes=")));

		let client = client(UserConfig {
			bootnodes: Some("enode://aa@127.0.0.1:30301".to_string()),
			..Default::default()
		});
		let (args, _) = main_args(&client, None);
		assert!(args.contains(&"--bootnodes=enode://aa@127.0.0.1:30301".to_string()));
	}

	#[test]
	fn test_mine_flag_for_either_mining_option() {
		let client = client(UserConfig {
			mine_when_needed: Some(true),
			..Default::default()
		});
		let (args, _) = main_args(&client, None);

		assert!(args.contains(&"--mine".to_string()));
	}
}
