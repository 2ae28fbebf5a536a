//! Resolved command lines for the supervised node executable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fully resolved command line: binary path plus argument vector.
///
/// Commands are argv vectors, never shell strings; flag values that carry
/// spaces therefore never need quoting. `Display` renders the binary
/// followed by the space-joined arguments for log readability only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
	/// Path or name of the executable.
	pub bin: String,
	/// Arguments passed verbatim to the executable.
	pub args: Vec<String>,
}

impl CommandSpec {
	/// Creates a command with no arguments.
	pub fn new(bin: impl Into<String>) -> Self {
		Self {
			bin: bin.into(),
			args: Vec::new(),
		}
	}

	/// Appends a single argument.
	pub fn arg(mut self, arg: impl Into<String>) -> Self {
		self.args.push(arg.into());
		self
	}

	/// Appends a list of arguments.
	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.args.extend(args.into_iter().map(Into::into));
		self
	}
}

impl fmt::Display for CommandSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.bin)?;
		for arg in &self.args {
			write!(f, " {}", arg)?;
		}
		Ok(())
	}
}
