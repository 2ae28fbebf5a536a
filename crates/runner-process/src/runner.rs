//! Command execution seam.
//!
//! Installation checks and chain initialization run short-lived backend
//! commands to completion. The supervisor consumes them through this
//! trait so tests can script command outcomes without spawning anything.

use async_trait::async_trait;
use runner_types::CommandSpec;
use tokio::process::Command;

/// Captured output of a completed command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
	/// Whether the command exited successfully.
	pub success: bool,
	pub stdout: String,
	pub stderr: String,
}

/// Runs a command to completion and captures both streams.
#[async_trait]
pub trait CommandRunner: Send + Sync {
	async fn run(&self, command: &CommandSpec) -> std::io::Result<CommandOutput>;
}

/// Production runner backed by [`tokio::process::Command`].
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
	async fn run(&self, command: &CommandSpec) -> std::io::Result<CommandOutput> {
		let output = Command::new(&command.bin).args(&command.args).output().await?;
		Ok(CommandOutput {
			success: output.status.success(),
			stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
			stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
		})
	}
}
