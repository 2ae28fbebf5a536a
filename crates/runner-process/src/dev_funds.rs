//! Dev-mode account provisioning.
//!
//! Once a dev-mode geth node reports readiness, a developer account is
//! created, unlocked indefinitely and funded from the coinbase over
//! JSON-RPC. Parity needs none of this: its dev account is pre-created
//! during chain initialization, unlocked via launch flags and funded by
//! the dev genesis allocation. The whole step is best-effort; failures
//! surface through the owner's error callback and never stop the
//! already-running node.

use async_trait::async_trait;
use runner_config::NodeConfig;
use serde_json::{json, Value};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

/// Password used for the dev account when no password file is configured.
const FALLBACK_PASSWORD: &str = "dev_password";
/// Amount transferred from the coinbase to the dev account, in wei (1 ether).
const FUND_AMOUNT: &str = "0xde0b6b3a7640000";

/// Errors that can occur while provisioning the dev account.
#[derive(Debug, Error)]
pub enum ProvisionError {
	/// Error that occurs when the node's RPC endpoint cannot be reached.
	#[error("rpc transport error: {0}")]
	Transport(#[from] reqwest::Error),
	/// Error returned by the node for an RPC call.
	#[error("rpc error from {method}: {message}")]
	Rpc {
		method: &'static str,
		message: String,
	},
	/// The node returned a response without the expected result shape.
	#[error("unexpected {method} response")]
	UnexpectedResponse {
		method: &'static str,
	},
}

/// Post-readiness account provisioning hook.
#[async_trait]
pub trait AccountProvisioner: Send + Sync {
	/// Creates, unlocks and funds the dev account. Invoked at most
	/// once, only post-readiness, only in dev mode.
	async fn provision(&self) -> Result<(), ProvisionError>;
}

/// Provisioner for backends whose dev chain already carries a funded,
/// unlocked account.
pub struct NoopProvisioner;

#[async_trait]
impl AccountProvisioner for NoopProvisioner {
	async fn provision(&self) -> Result<(), ProvisionError> {
		Ok(())
	}
}

/// JSON-RPC provisioner for the geth dev chain.
pub struct DevFunds {
	endpoint: String,
	password_file: Option<PathBuf>,
	client: reqwest::Client,
}

impl DevFunds {
	/// Targets the node's real RPC endpoint from the run configuration.
	pub fn from_config(config: &NodeConfig) -> Self {
		Self::new(
			format!("http://{}:{}", config.rpc_host, config.rpc_port),
			config.effective_password().map(|p| p.to_path_buf()),
		)
	}

	/// Targets an explicit endpoint.
	pub fn new(endpoint: String, password_file: Option<PathBuf>) -> Self {
		Self {
			endpoint,
			password_file,
			client: reqwest::Client::new(),
		}
	}

	async fn call(&self, method: &'static str, params: Value) -> Result<Value, ProvisionError> {
		let response: Value = self
			.client
			.post(&self.endpoint)
			.json(&json!({
				"jsonrpc": "2.0",
				"method": method,
				"params": params,
				"id": 1,
			}))
			.send()
			.await?
			.json()
			.await?;

		if let Some(error) = response.get("error") {
			return Err(ProvisionError::Rpc {
				method,
				message: error.to_string(),
			});
		}
		Ok(response.get("result").cloned().unwrap_or(Value::Null))
	}

	async fn password(&self) -> String {
		match &self.password_file {
			Some(path) => match tokio::fs::read_to_string(path).await {
				Ok(contents) => contents.trim().to_string(),
				Err(err) => {
					warn!(path = %path.display(), "could not read dev password file: {err}");
					FALLBACK_PASSWORD.to_string()
				},
			},
			None => FALLBACK_PASSWORD.to_string(),
		}
	}
}

#[async_trait]
impl AccountProvisioner for DevFunds {
	async fn provision(&self) -> Result<(), ProvisionError> {
		let password = self.password().await;

		let accounts = self.call("eth_accounts", json!([])).await?;
		let coinbase = accounts
			.as_array()
			.and_then(|list| list.first())
			.and_then(Value::as_str)
			.ok_or(ProvisionError::UnexpectedResponse {
				method: "eth_accounts",
			})?
			.to_string();

		let created = self
			.call("personal_newAccount", json!([password.as_str()]))
			.await?;
		let address = created
			.as_str()
			.ok_or(ProvisionError::UnexpectedResponse {
				method: "personal_newAccount",
			})?
			.to_string();
		debug!(address = %address, "created dev account");

		// Duration 0 keeps the account unlocked until the node exits.
		self.call(
			"personal_unlockAccount",
			json!([address.as_str(), password.as_str(), 0]),
		)
		.await?;

		let balance = self
			.call("eth_getBalance", json!([coinbase.as_str(), "latest"]))
			.await?;
		let funded = balance
			.as_str()
			.map(|b| b != "0x0" && !b.is_empty())
			.unwrap_or(false);
		if !funded {
			warn!(coinbase = %coinbase, "coinbase has no balance, skipping dev account funding");
			return Ok(());
		}

		self.call(
			"eth_sendTransaction",
			json!([{
				"from": coinbase.as_str(),
				"to": address.as_str(),
				"value": FUND_AMOUNT,
			}]),
		)
		.await?;
		debug!(address = %address, "funded dev account from coinbase");

		Ok(())
	}
}
