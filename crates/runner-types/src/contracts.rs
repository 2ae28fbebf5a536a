//! Contract interface metadata consumed by the log decoder.

use alloy_json_abi::JsonAbi;
use serde::{Deserialize, Serialize};

/// A compiled contract together with its deployment state.
///
/// The decoder only ever reads statically known metadata; it never
/// queries chain state. Artifacts without a deployed address are skipped
/// when the selector table is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
	/// Display name used in rendered trace lines.
	pub name: String,
	/// Deployed address, hex encoded with 0x prefix. `None` until the
	/// contract is deployed.
	#[serde(default)]
	pub deployed_address: Option<String>,
	/// Silent contracts are suppressed from trace output until bulk
	/// deployment output has completed.
	#[serde(default)]
	pub silent: bool,
	/// The contract's JSON ABI.
	pub abi: JsonAbi,
}
