//! Inter-process log-record protocol.
//!
//! Records arrive over the IPC channel as JSON objects discriminated by a
//! `type` field. Only `contract-log` records carry structured fields; any
//! other record kind is passed through untouched and rendered as its raw
//! serialized form.

use serde::{Deserialize, Deserializer, Serialize};

/// Discriminator value of structured contract-call records.
pub const CONTRACT_LOG_TYPE: &str = "contract-log";

/// A structured contract-call record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractLog {
	/// Address of the called contract, hex encoded.
	pub address: String,
	/// Hex-encoded calldata; the first 8 hex characters after the 0x
	/// prefix are the function selector.
	pub data: String,
	/// Hash of the transaction that produced the record.
	pub transaction_hash: String,
	/// Block number, hex encoded.
	pub block_number: String,
	/// Gas used, hex encoded.
	pub gas_used: String,
	/// Execution status as reported by the node.
	pub status: String,
}

/// An inbound log record.
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
	/// A record of kind `contract-log`.
	ContractLog(ContractLog),
	/// Any other record kind, kept as raw JSON.
	Other(serde_json::Value),
}

impl LogRecord {
	/// Classifies a raw JSON value.
	///
	/// A value is a [`LogRecord::ContractLog`] only when its `type` field
	/// is `contract-log` and every structured field deserializes; all
	/// other values fall through to [`LogRecord::Other`].
	pub fn from_value(value: serde_json::Value) -> Self {
		if value.get("type").and_then(|t| t.as_str()) == Some(CONTRACT_LOG_TYPE) {
			if let Ok(log) = serde_json::from_value::<ContractLog>(value.clone()) {
				return LogRecord::ContractLog(log);
			}
		}
		LogRecord::Other(value)
	}
}

impl<'de> Deserialize<'de> for LogRecord {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let value = serde_json::Value::deserialize(deserializer)?;
		Ok(LogRecord::from_value(value))
	}
}
