//! Opaque port-relay seam.
//!
//! When the proxy option is enabled, the node's RPC/WS ports are fronted
//! by a local relay that listens on the public ports and forwards to the
//! node's shifted real ports. The relay implementation lives outside
//! this crate; the supervisor only ever serves and closes it.

use crate::ProcessError;
use async_trait::async_trait;

/// A served relay that can be shut down.
#[async_trait]
pub trait RelayHandle: Send {
	/// Stops the relay. Called at most once per handle.
	async fn close(&mut self);
}

/// Serves relays fronting the node's endpoints.
#[async_trait]
pub trait PortRelay: Send + Sync {
	/// Starts a relay listening on `host:port`, forwarding to the
	/// node's corresponding shifted port. `websocket` selects the WS
	/// framing variant.
	async fn serve(
		&self,
		host: &str,
		port: u16,
		websocket: bool,
	) -> Result<Box<dyn RelayHandle>, ProcessError>;
}
