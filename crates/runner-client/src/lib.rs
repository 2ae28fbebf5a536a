//! Client command-construction module for the node runner.
//!
//! This module defines the interface every supported node backend
//! implements to translate a resolved [`NodeConfig`] into concrete
//! command lines: install verification, chain initialization, account
//! management and the main launch command. Implementations are pure
//! command builders; they perform no I/O and never fail. Anything worth
//! telling the operator is pushed into a caller-supplied list of
//! [`Advisory`] values instead.

use runner_config::NodeConfig;
use runner_types::{Advisory, ClientDefaults, ClientKind, CommandSpec};

/// Re-export implementations
pub mod implementations {
	pub mod geth;
	pub mod parity;
}

pub use implementations::geth::GethClient;
pub use implementations::parity::ParityClient;

/// Trait defining the interface for node backend implementations.
///
/// Exactly one implementation is bound when the supervisor is built and
/// it never changes for the lifetime of a run. Methods that can produce
/// operator-facing warnings take a `warnings` list; everything else is a
/// plain value computation.
pub trait NodeClient: Send + Sync {
	/// The backend this client drives.
	fn kind(&self) -> ClientKind;

	/// Short name used in log lines.
	fn name(&self) -> &'static str;

	/// Human-readable name including the project homepage.
	fn pretty_name(&self) -> &'static str;

	/// The backend's default tables.
	fn defaults(&self) -> &'static ClientDefaults;

	/// Resolved executable: the configured override or the backend default.
	fn bin(&self) -> &str;

	/// Command verifying the backend binary is installed and runnable.
	fn version_command(&self) -> CommandSpec;

	/// Command initializing the chain from a genesis file.
	///
	/// `None` when no genesis file is configured or the backend selects
	/// custom networks entirely via its chain flag.
	fn genesis_init_command(&self) -> Option<CommandSpec>;

	/// Command creating a new account in the backend's keystore.
	///
	/// Pushes [`Advisory::MissingAccountPassword`] when no password file
	/// is configured.
	fn new_account_command(&self, warnings: &mut Vec<Advisory>) -> CommandSpec;

	/// Command enumerating existing keystore accounts.
	fn list_accounts_command(&self) -> CommandSpec;

	/// Extracts an account address from `list_accounts_command` output.
	fn parse_account_list(&self, output: &str) -> Option<String> {
		parse_address(output)
	}

	/// Extracts the created address from `new_account_command` output.
	fn parse_new_account(&self, output: &str) -> Option<String> {
		parse_address(output)
	}

	/// The full launch command for the node process.
	///
	/// `address` is the account resolved during chain initialization; an
	/// explicitly configured account address takes priority over it.
	fn main_command(&self, address: Option<&str>, warnings: &mut Vec<Advisory>) -> CommandSpec;

	/// Whether a line of diagnostic output signals the node is ready to
	/// accept RPC/WS connections.
	fn is_ready_signal(&self, line: &str) -> bool;

	/// One-shot chain initialization commands for dev mode, replacing
	/// the list/genesis/new-account sequence. Empty when the backend
	/// self-provisions its dev chain.
	fn dev_init_commands(&self) -> Vec<CommandSpec>;
}

/// Creates the client implementation selected by the configuration.
pub fn create_client(config: &NodeConfig) -> Box<dyn NodeClient> {
	match config.client {
		ClientKind::Geth => Box::new(GethClient::new(config.clone())),
		ClientKind::Parity => Box::new(ParityClient::new(config.clone())),
	}
}

/// Extracts the first account address from command output.
///
/// The supported backends print addresses either `0x`-prefixed or
/// wrapped in braces (`Account #0: {3ec93e...}`); both shapes are
/// accepted and normalized to the `0x` form.
pub fn parse_address(output: &str) -> Option<String> {
	let mut search = output;
	while let Some(pos) = search.find("0x") {
		let digits = &search[pos + 2..];
		let hex_len = digits.bytes().take_while(|b| b.is_ascii_hexdigit()).count();
		if hex_len >= 40 {
			return Some(format!("0x{}", &digits[..40]));
		}
		search = digits;
	}

	let mut search = output;
	while let Some(start) = search.find('{') {
		let rest = &search[start + 1..];
		let Some(end) = rest.find('}') else { break };
		let inner = &rest[..end];
		if inner.len() == 40 && inner.bytes().all(|b| b.is_ascii_hexdigit()) {
			return Some(format!("0x{}", inner));
		}
		search = rest;
	}
	None
}
