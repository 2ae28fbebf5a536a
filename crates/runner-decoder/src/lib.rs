//! Log decoding module for the node runner.
//!
//! Raw event-log records arriving over the inter-process channel are
//! turned into human-readable contract-call trace lines using only
//! statically known contract interface metadata; no chain state is ever
//! queried. A selector-indexed decode table is rebuilt in full whenever
//! a deployment notification arrives. Records that race ahead of the
//! table (before any deployment, or for an address the table does not
//! know) are dropped without buffering or replay; an unknown address
//! triggers one table refresh but the dropped record is not replayed.

use alloy_dyn_abi::{DynSolValue, JsonAbiExt};
use alloy_json_abi::Function;
use runner_types::{hex_to_u64, strip_0x, ContractArtifact, LogRecord};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};

/// Prefix of every rendered contract-call trace line.
const TRACE_LABEL: &str = "Blockchain>";
/// Hex length of a `0x`-prefixed 4-byte function selector.
const SELECTOR_LEN: usize = 10;

/// Errors reported by contract metadata sources.
#[derive(Debug, Error)]
pub enum DecoderError {
	/// Error that occurs when the contract list cannot be produced.
	#[error("contract source error: {0}")]
	Source(String),
}

/// Supplies the statically known contract artifacts.
pub trait ContractSource: Send + Sync {
	fn contracts(&self) -> Result<Vec<ContractArtifact>, DecoderError>;
}

/// Notifications the decoder subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderEvent {
	/// Contracts were (re)deployed; the decode table must be rebuilt.
	ContractsDeployed,
	/// Bulk deployment output has completed; silent contracts may now
	/// be traced.
	OutputDone,
}

/// A function indexed under its 4-byte selector.
#[derive(Debug, Clone)]
pub struct FunctionEntry {
	/// Canonical signature, `name(type1,type2,...)`.
	pub signature: String,
	/// The ABI fragment used for input decoding.
	pub function: Function,
}

/// Per-contract slice of the decode table.
#[derive(Debug, Clone)]
struct ContractIndex {
	name: String,
	silent: bool,
	functions: HashMap<String, FunctionEntry>,
}

/// Decodes inbound log records into trace lines.
pub struct LogDecoder {
	source: Box<dyn ContractSource>,
	table: HashMap<String, ContractIndex>,
	contracts_deployed: bool,
	output_done: bool,
}

impl LogDecoder {
	/// Builds a decoder over the given artifact source. The table stays
	/// empty until the first deployment notification.
	pub fn new(source: Box<dyn ContractSource>) -> Self {
		Self {
			source,
			table: HashMap::new(),
			contracts_deployed: false,
			output_done: false,
		}
	}

	/// Rebuilds the decode table in full from the artifact source.
	///
	/// Every ABI function of every deployed contract is indexed under
	/// the first 4 bytes of the hash of its canonical signature. A
	/// failing source leaves the previous table in place.
	pub fn rebuild_table(&mut self) {
		let contracts = match self.source.contracts() {
			Ok(contracts) => contracts,
			Err(err) => {
				error!("no contracts found: {err}");
				return;
			},
		};

		let mut table = HashMap::new();
		for contract in contracts {
			let Some(address) = &contract.deployed_address else {
				continue;
			};
			let functions = contract
				.abi
				.functions()
				.map(|function| {
					let selector = format!("0x{}", hex::encode(function.selector()));
					let entry = FunctionEntry {
						signature: function.signature(),
						function: function.clone(),
					};
					(selector, entry)
				})
				.collect();
			table.insert(
				address.to_lowercase(),
				ContractIndex {
					name: contract.name,
					silent: contract.silent,
					functions,
				},
			);
		}
		self.table = table;
	}

	/// Marks bulk deployment output as completed.
	pub fn output_done(&mut self) {
		self.output_done = true;
	}

	/// Handles a deployment notification.
	pub fn contracts_deployed(&mut self) {
		self.contracts_deployed = true;
		self.rebuild_table();
	}

	/// Turns a record into a rendered trace line.
	///
	/// Returns `None` for every dropped record: contract logs arriving
	/// before any deployment, unknown addresses (after one table
	/// refresh), silent contracts during bulk output, and calldata that
	/// does not resolve or decode. Drops are silent by design; they are
	/// not errors.
	pub fn handle(&mut self, record: LogRecord) -> Option<String> {
		let log = match record {
			LogRecord::ContractLog(log) => log,
			LogRecord::Other(value) => return Some(value.to_string()),
		};
		if !self.contracts_deployed {
			return None;
		}

		let address = log.address.to_lowercase();
		if !self.table.contains_key(&address) {
			// One refresh for a late deployment; the record itself is
			// dropped either way.
			self.rebuild_table();
			return None;
		}
		let contract = &self.table[&address];
		if contract.silent && !self.output_done {
			return None;
		}
		if log.data.len() < SELECTOR_LEN {
			return None;
		}

		let selector = log.data[..SELECTOR_LEN].to_lowercase();
		let entry = contract.functions.get(&selector)?;
		let calldata = hex::decode(strip_0x(&log.data[SELECTOR_LEN..])).ok()?;
		let values = entry.function.abi_decode_input(&calldata, false).ok()?;

		let params = entry
			.function
			.inputs
			.iter()
			.zip(values.iter())
			.map(|(input, value)| {
				// Integer-typed parameters render bare, everything else
				// is quoted.
				if input.ty.contains("int") {
					format_value(value)
				} else {
					format!("\"{}\"", format_value(value))
				}
			})
			.collect::<Vec<_>>()
			.join(", ");

		let gas = decimal(&log.gas_used);
		let block = decimal(&log.block_number);
		Some(format!(
			"{} {}.{}({}) | {} | gas:{} | blk:{} | status:{}",
			TRACE_LABEL,
			contract.name,
			entry.function.name,
			params,
			log.transaction_hash,
			gas,
			block,
			log.status,
		))
	}

	/// Consumes deployment notifications and inbound records until both
	/// channels close, emitting rendered lines to the log.
	pub async fn run(
		mut self,
		mut events: broadcast::Receiver<DecoderEvent>,
		mut records: mpsc::Receiver<LogRecord>,
	) {
		loop {
			tokio::select! {
				event = events.recv() => match event {
					Ok(DecoderEvent::ContractsDeployed) => self.contracts_deployed(),
					Ok(DecoderEvent::OutputDone) => self.output_done(),
					Err(broadcast::error::RecvError::Lagged(skipped)) => {
						error!(skipped, "decoder lagged behind deployment notifications");
					},
					Err(broadcast::error::RecvError::Closed) => break,
				},
				record = records.recv() => match record {
					Some(record) => {
						if let Some(line) = self.handle(record) {
							info!("{line}");
						}
					},
					None => break,
				},
			}
		}
	}
}

/// Renders a decoded parameter value.
fn format_value(value: &DynSolValue) -> String {
	match value {
		DynSolValue::Bool(value) => value.to_string(),
		DynSolValue::Uint(value, _) => value.to_string(),
		DynSolValue::Int(value, _) => value.to_string(),
		DynSolValue::Address(address) => address.to_string(),
		DynSolValue::String(value) => value.clone(),
		DynSolValue::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
		DynSolValue::FixedBytes(word, size) => format!("0x{}", hex::encode(&word[..*size])),
		DynSolValue::Array(values) | DynSolValue::FixedArray(values) | DynSolValue::Tuple(values) => {
			format!(
				"[{}]",
				values.iter().map(format_value).collect::<Vec<_>>().join(",")
			)
		},
		other => format!("{other:?}"),
	}
}

/// Hex-encoded numeric fields render as decimal; anything unparseable
/// passes through untouched.
fn decimal(hex_value: &str) -> String {
	hex_to_u64(hex_value)
		.map(|value| value.to_string())
		.unwrap_or_else(|| hex_value.to_string())
}
