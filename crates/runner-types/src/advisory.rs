//! Advisory warnings produced while composing node command lines.
//!
//! Advisories are side effects only: they never abort command
//! construction. They are returned as values so callers (and tests) can
//! inspect them, and the supervisor logs each one at warn level.

use std::fmt;

/// A non-fatal warning emitted during command construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
	/// The RPC cors domain is configured as the `*` wildcard.
	CorsWildcard,
	/// No RPC cors domain is configured at all.
	CorsUnset,
	/// The WebSocket origins list is configured as the `*` wildcard.
	WsOriginsWildcard,
	/// No WebSocket origins are configured at all.
	WsOriginsUnset,
	/// Account creation was requested without a configured password file.
	MissingAccountPassword,
	/// The backend does not support the requested network and a
	/// compatible one was substituted.
	NetworkSubstituted {
		requested: String,
		actual: String,
	},
}

impl fmt::Display for Advisory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Advisory::CorsWildcard => {
				write!(f, "rpc cors domain is set to *, make sure you know what you are doing")
			},
			Advisory::CorsUnset => write!(f, "rpc cors domain is not set"),
			Advisory::WsOriginsWildcard => {
				write!(f, "ws origins is set to *, make sure you know what you are doing")
			},
			Advisory::WsOriginsUnset => write!(f, "ws origins is not set"),
			Advisory::MissingAccountPassword => write!(
				f,
				"no account password is configured, creating an account may fail"
			),
			Advisory::NetworkSubstituted { requested, actual } => {
				write!(f, "network {} is not supported, switching to {}", requested, actual)
			},
		}
	}
}
