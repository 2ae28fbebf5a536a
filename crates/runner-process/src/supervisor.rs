//! The node lifecycle state machine.
//!
//! A supervisor owns one node instance. `run` drives the strictly serial
//! pre-spawn pipeline (install check, chain initialization, spawn); each
//! step depends on the previous one's success and any failure aborts the
//! run before a process exists. After the spawn, the two diagnostic
//! streams are consumed by independent reader tasks and everything is
//! reported through the owner's callbacks.

use crate::dev_funds::{AccountProvisioner, DevFunds, NoopProvisioner};
use crate::relay::{PortRelay, RelayHandle};
use crate::runner::{CommandRunner, TokioCommandRunner};
use crate::ProcessError;
use runner_client::{create_client, NodeClient};
use runner_config::NodeConfig;
use runner_types::ClientKind;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Remediation shown when a dev-mode run hits an account-unlock failure
/// left over from a pre-`--dev` data directory.
const UNLOCK_HINT: &str =
	"the development chain now runs with the --dev option; clear the configured data directory to re-provision it";

type ReadyCallback = Arc<dyn Fn() + Send + Sync>;
type ExitCallback = Arc<dyn Fn(Option<i32>) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(String) + Send + Sync>;
type SharedState = Arc<Mutex<NodeState>>;

/// Lifecycle states of the supervised node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
	NotStarted,
	Installing,
	Initializing,
	Starting,
	Running,
	/// The node reported it accepts RPC/WS connections.
	Ready,
	Exited,
	/// A pre-spawn step failed; the run never reached `Starting`.
	Failed,
}

/// Result of chain initialization.
///
/// "Already initialized" short-circuits the remaining provisioning steps
/// and is a control signal, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
	/// An account already existed; genesis and account creation were
	/// skipped.
	AlreadyInitialized(String),
	/// Fresh initialization, with the created account address when the
	/// backend produced one.
	Initialized(Option<String>),
}

impl InitOutcome {
	/// The account address resolved by initialization, if any.
	pub fn address(&self) -> Option<&str> {
		match self {
			InitOutcome::AlreadyInitialized(address) => Some(address),
			InitOutcome::Initialized(address) => address.as_deref(),
		}
	}
}

/// Supervises one node process across its run lifecycle.
pub struct NodeSupervisor {
	config: NodeConfig,
	client: Arc<dyn NodeClient>,
	runner: Arc<dyn CommandRunner>,
	relay: Option<Arc<dyn PortRelay>>,
	relays: Vec<Box<dyn RelayHandle>>,
	provisioner: Arc<dyn AccountProvisioner>,
	on_ready: ReadyCallback,
	on_exit: ExitCallback,
	on_error: ErrorCallback,
	state: SharedState,
	ready_latch: Arc<AtomicBool>,
	child_pid: Option<u32>,
}

impl NodeSupervisor {
	/// Builds a supervisor around the backend selected by the
	/// configuration. Callbacks default to no-ops.
	pub fn new(config: NodeConfig) -> Self {
		let client: Arc<dyn NodeClient> = Arc::from(create_client(&config));
		let provisioner: Arc<dyn AccountProvisioner> = match config.client {
			ClientKind::Geth => Arc::new(DevFunds::from_config(&config)),
			// Parity's dev account is pre-created and unlocked via
			// launch flags; funding comes from the dev genesis.
			ClientKind::Parity => Arc::new(NoopProvisioner),
		};
		Self {
			config,
			client,
			runner: Arc::new(TokioCommandRunner),
			relay: None,
			relays: Vec::new(),
			provisioner,
			on_ready: Arc::new(|| {}),
			on_exit: Arc::new(|_| {}),
			on_error: Arc::new(|_| {}),
			state: Arc::new(Mutex::new(NodeState::NotStarted)),
			ready_latch: Arc::new(AtomicBool::new(false)),
			child_pid: None,
		}
	}

	/// Invoked exactly once when the node first reports readiness.
	pub fn on_ready(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
		self.on_ready = Arc::new(callback);
		self
	}

	/// Invoked exactly once when the node exits, with its exit code or
	/// `None` when the process was killed without one.
	pub fn on_exit(mut self, callback: impl Fn(Option<i32>) + Send + Sync + 'static) -> Self {
		self.on_exit = Arc::new(callback);
		self
	}

	/// Invoked for post-spawn errors; these never abort the run.
	pub fn on_error(mut self, callback: impl Fn(String) + Send + Sync + 'static) -> Self {
		self.on_error = Arc::new(callback);
		self
	}

	/// Replaces the command execution seam.
	pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
		self.runner = runner;
		self
	}

	/// Installs the port-relay implementation used when `proxy` is set.
	pub fn with_relay(mut self, relay: Arc<dyn PortRelay>) -> Self {
		self.relay = Some(relay);
		self
	}

	/// Replaces the dev-mode account provisioner.
	pub fn with_provisioner(mut self, provisioner: Arc<dyn AccountProvisioner>) -> Self {
		self.provisioner = provisioner;
		self
	}

	/// Current lifecycle state.
	pub fn state(&self) -> NodeState {
		*lock(&self.state)
	}

	/// Drives the full pre-spawn pipeline and spawns the node.
	///
	/// Errors returned here are fatal to the run; once this returns
	/// `Ok`, every further event arrives through the callbacks.
	pub async fn run(&mut self) -> Result<(), ProcessError> {
		match self.run_pipeline().await {
			Ok(()) => Ok(()),
			Err(err) => {
				set_state(&self.state, NodeState::Failed);
				Err(err)
			},
		}
	}

	async fn run_pipeline(&mut self) -> Result<(), ProcessError> {
		info!(client = self.client.pretty_name(), "starting blockchain node");
		self.serve_relays().await?;

		set_state(&self.state, NodeState::Installing);
		self.check_installed().await?;

		set_state(&self.state, NodeState::Initializing);
		let outcome = self.initialize_chain().await?;

		set_state(&self.state, NodeState::Starting);
		self.start(outcome.address()).await
	}

	/// Serves the RPC/WS relays on the public ports before anything
	/// else runs, so owners can connect as soon as the node is up.
	async fn serve_relays(&mut self) -> Result<(), ProcessError> {
		if !self.config.proxy {
			return Ok(());
		}
		let Some(relay) = self.relay.clone() else {
			return Ok(());
		};
		let rpc = relay
			.serve(&self.config.rpc_host, self.config.public_rpc_port, false)
			.await?;
		self.relays.push(rpc);
		if self.config.ws_rpc {
			let ws = relay
				.serve(&self.config.ws_host, self.config.public_ws_port, true)
				.await?;
			self.relays.push(ws);
		}
		Ok(())
	}

	/// Verifies the backend binary is present and runnable.
	pub async fn check_installed(&self) -> Result<(), ProcessError> {
		let command = self.client.version_command();
		info!(client = self.client.name(), "running: {command}");
		match self.runner.run(&command).await {
			Ok(output)
				if output.success
					&& !output.stdout.is_empty()
					&& !output.stdout.contains("not found")
					&& !output.stderr.contains("not found") =>
			{
				Ok(())
			},
			_ => Err(ProcessError::Installation(self.client.bin().to_string())),
		}
	}

	/// Prepares chain data and resolves the account to unlock.
	///
	/// Non-dev runs list existing accounts first; a parseable address
	/// short-circuits genesis and account creation. A failing or
	/// `Fatal`-marked listing means "no accounts found", not an error.
	/// Dev runs delegate to the backend's one-shot initializer instead.
	pub async fn initialize_chain(&self) -> Result<InitOutcome, ProcessError> {
		if let Some(datadir) = &self.config.datadir {
			tokio::fs::create_dir_all(datadir).await.map_err(|err| {
				ProcessError::Initialization(format!(
					"could not create data directory {}: {}",
					datadir.display(),
					err
				))
			})?;
		}

		if self.config.dev {
			for command in self.client.dev_init_commands() {
				info!(client = self.client.name(), "running: {command}");
				let output = self
					.runner
					.run(&command)
					.await
					.map_err(|err| ProcessError::Initialization(err.to_string()))?;
				if !output.success {
					return Err(ProcessError::Initialization(output.stderr));
				}
			}
			return Ok(InitOutcome::Initialized(None));
		}

		let listing = self.client.list_accounts_command();
		info!(client = self.client.name(), "running: {listing}");
		match self.runner.run(&listing).await {
			Ok(output) if output.success && !output.stdout.contains("Fatal") => {
				if let Some(address) = self.client.parse_account_list(&output.stdout) {
					info!(client = self.client.name(), "already initialized");
					return Ok(InitOutcome::AlreadyInitialized(address));
				}
				info!(client = self.client.name(), "no accounts found");
			},
			_ => info!(client = self.client.name(), "no accounts found"),
		}

		if let Some(command) = self.client.genesis_init_command() {
			info!(client = self.client.name(), "initializing genesis block");
			info!(client = self.client.name(), "running: {command}");
			let output = self
				.runner
				.run(&command)
				.await
				.map_err(|err| ProcessError::Initialization(err.to_string()))?;
			if !output.success {
				return Err(ProcessError::Initialization(output.stderr));
			}
		}

		let mut warnings = Vec::new();
		let command = self.client.new_account_command(&mut warnings);
		for advisory in &warnings {
			warn!(client = self.client.name(), "{advisory}");
		}
		info!(client = self.client.name(), "running: {command}");
		let output = self
			.runner
			.run(&command)
			.await
			.map_err(|err| ProcessError::Initialization(err.to_string()))?;
		if !output.success {
			return Err(ProcessError::Initialization(output.stderr));
		}
		Ok(InitOutcome::Initialized(
			self.client.parse_new_account(&output.stdout),
		))
	}

	/// Spawns the node process and wires up the observation paths.
	pub async fn start(&mut self, address: Option<&str>) -> Result<(), ProcessError> {
		let mut warnings = Vec::new();
		let command = self.client.main_command(address, &mut warnings);
		for advisory in &warnings {
			warn!(client = self.client.name(), "{advisory}");
		}
		info!(client = self.client.name(), "running: {command}");

		let mut child = match Command::new(&command.bin)
			.args(&command.args)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.spawn()
		{
			Ok(child) => child,
			Err(err) => {
				self.report_spawn_error(err.to_string());
				return Ok(());
			},
		};
		self.child_pid = child.id();
		set_state(&self.state, NodeState::Running);

		// Both supported backends invert the conventional stream roles:
		// operational logging arrives on stderr while stdout carries
		// errors. Readiness is therefore scanned on stderr.
		if let Some(stdout) = child.stdout.take() {
			spawn_error_stream_logger(stdout, self.client.name());
		}
		if let Some(stderr) = child.stderr.take() {
			spawn_diagnostic_scanner(
				stderr,
				self.client.clone(),
				self.ready_latch.clone(),
				self.config.dev,
				self.provisioner.clone(),
				self.on_ready.clone(),
				self.on_error.clone(),
				self.state.clone(),
			);
		}
		spawn_exit_watcher(child, self.client.name(), self.on_exit.clone(), self.state.clone());
		Ok(())
	}

	/// Shuts down the relays and terminates the node process.
	///
	/// Idempotent; safe to call with no process ever started or after
	/// the process already exited.
	pub async fn kill(&mut self) {
		for mut relay in self.relays.drain(..) {
			relay.close().await;
		}
		if let Some(pid) = self.child_pid.take() {
			info!(client = self.client.name(), pid, "terminating node process");
			terminate(pid);
		}
	}

	fn report_spawn_error(&self, text: String) {
		error!(client = self.client.name(), "blockchain process error: {text}");
		let message = if self.config.dev && text.contains("Failed to unlock") {
			format!("{}\n{}", text, UNLOCK_HINT)
		} else {
			text
		};
		(self.on_error)(message);
	}
}

fn lock(state: &SharedState) -> std::sync::MutexGuard<'_, NodeState> {
	state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn set_state(state: &SharedState, next: NodeState) {
	*lock(state) = next;
}

/// Logs the stream that conventionally would be stdout. For the
/// supported backends it carries error output.
fn spawn_error_stream_logger<R>(stream: R, name: &'static str) -> JoinHandle<()>
where
	R: AsyncRead + Unpin + Send + 'static,
{
	tokio::spawn(async move {
		let mut lines = BufReader::new(stream).lines();
		while let Ok(Some(line)) = lines.next_line().await {
			error!(client = name, "{line}");
		}
	})
}

/// Scans the diagnostic stream for the readiness marker and logs every
/// line at info level.
///
/// The latch guarantees the ready callback and the dev provisioner fire
/// exactly once no matter how many further lines match. A read error
/// ends the task silently; it usually means the process disappeared
/// mid-read.
#[allow(clippy::too_many_arguments)]
fn spawn_diagnostic_scanner<R>(
	stream: R,
	client: Arc<dyn NodeClient>,
	latch: Arc<AtomicBool>,
	dev: bool,
	provisioner: Arc<dyn AccountProvisioner>,
	on_ready: ReadyCallback,
	on_error: ErrorCallback,
	state: SharedState,
) -> JoinHandle<()>
where
	R: AsyncRead + Unpin + Send + 'static,
{
	tokio::spawn(async move {
		let mut lines = BufReader::new(stream).lines();
		while let Ok(Some(line)) = lines.next_line().await {
			if client.is_ready_signal(&line) && !latch.swap(true, Ordering::SeqCst) {
				set_state(&state, NodeState::Ready);
				if dev {
					let provisioner = provisioner.clone();
					let on_error = on_error.clone();
					// Detached on purpose: dev funding is best-effort
					// and nothing awaits its completion.
					tokio::spawn(async move {
						if let Err(err) = provisioner.provision().await {
							(on_error)(format!(
								"error creating, unlocking and funding accounts: {}",
								err
							));
						}
					});
				}
				(on_ready)();
			}
			info!(client = client.name(), "{line}");
		}
	})
}

fn spawn_exit_watcher(
	mut child: Child,
	name: &'static str,
	on_exit: ExitCallback,
	state: SharedState,
) -> JoinHandle<()> {
	tokio::spawn(async move {
		let code = match child.wait().await {
			Ok(status) => status.code(),
			Err(err) => {
				warn!(client = name, "failed to await node exit: {err}");
				None
			},
		};
		set_state(&state, NodeState::Exited);
		match code {
			Some(code) => error!(client = name, code, "node exited with error code"),
			None => error!(client = name, "node exited with no error code (manually killed?)"),
		}
		(on_exit)(code);
	})
}

#[cfg(unix)]
fn terminate(pid: u32) {
	let _ = std::process::Command::new("kill").arg(pid.to_string()).output();
}

#[cfg(windows)]
fn terminate(pid: u32) {
	let _ = std::process::Command::new("taskkill")
		.args(["/PID", &pid.to_string(), "/F"])
		.output();
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dev_funds::ProvisionError;
	use crate::runner::CommandOutput;
	use async_trait::async_trait;
	use runner_config::{AccountSettings, UserConfig};
	use runner_types::{ClientKind, CommandSpec, GETH_DEFAULTS, PARITY_DEFAULTS};
	use std::collections::VecDeque;
	use std::path::PathBuf;
	use std::sync::atomic::AtomicUsize;
	use std::time::Duration;
	use tokio::io::AsyncWriteExt;

	struct FakeRunner {
		outputs: Mutex<VecDeque<std::io::Result<CommandOutput>>>,
		seen: Mutex<Vec<String>>,
	}

	impl FakeRunner {
		fn with(outputs: Vec<std::io::Result<CommandOutput>>) -> Arc<Self> {
			Arc::new(Self {
				outputs: Mutex::new(outputs.into()),
				seen: Mutex::new(Vec::new()),
			})
		}

		fn ok(stdout: &str) -> std::io::Result<CommandOutput> {
			Ok(CommandOutput {
				success: true,
				stdout: stdout.to_string(),
				stderr: String::new(),
			})
		}

		fn seen(&self) -> Vec<String> {
			self.seen.lock().unwrap().clone()
		}
	}

	#[async_trait]
	impl CommandRunner for FakeRunner {
		async fn run(&self, command: &CommandSpec) -> std::io::Result<CommandOutput> {
			self.seen.lock().unwrap().push(command.to_string());
			self.outputs
				.lock()
				.unwrap()
				.pop_front()
				.unwrap_or_else(|| Ok(CommandOutput::default()))
		}
	}

	struct CountingProvisioner(AtomicUsize);

	#[async_trait]
	impl AccountProvisioner for CountingProvisioner {
		async fn provision(&self) -> Result<(), ProvisionError> {
			self.0.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
	}

	struct CountingRelay {
		served: AtomicUsize,
		closed: Arc<AtomicUsize>,
	}

	struct CountingHandle(Arc<AtomicUsize>);

	#[async_trait]
	impl RelayHandle for CountingHandle {
		async fn close(&mut self) {
			self.0.fetch_add(1, Ordering::SeqCst);
		}
	}

	#[async_trait]
	impl PortRelay for CountingRelay {
		async fn serve(
			&self,
			_host: &str,
			_port: u16,
			_websocket: bool,
		) -> Result<Box<dyn RelayHandle>, ProcessError> {
			self.served.fetch_add(1, Ordering::SeqCst);
			Ok(Box::new(CountingHandle(self.closed.clone())))
		}
	}

	fn config(user: UserConfig) -> NodeConfig {
		let defaults = match user.client {
			Some(ClientKind::Parity) => &PARITY_DEFAULTS,
			_ => &GETH_DEFAULTS,
		};
		NodeConfig::resolve(user, defaults).unwrap()
	}

	fn no_proxy(user: UserConfig) -> UserConfig {
		UserConfig {
			proxy: Some(false),
			..user
		}
	}

	#[tokio::test]
	async fn test_not_found_version_output_aborts_before_initialization() {
		let runner = FakeRunner::with(vec![FakeRunner::ok("geth: not found")]);
		let mut supervisor = NodeSupervisor::new(config(no_proxy(UserConfig::default())))
			.with_runner(runner.clone());

		let err = supervisor.run().await.unwrap_err();

		assert!(matches!(err, ProcessError::Installation(_)));
		assert_eq!(runner.seen().len(), 1, "initialization must never run");
		assert_eq!(supervisor.state(), NodeState::Failed);
	}

	#[tokio::test]
	async fn test_empty_version_output_is_installation_error() {
		let runner = FakeRunner::with(vec![FakeRunner::ok("")]);
		let supervisor =
			NodeSupervisor::new(config(no_proxy(UserConfig::default()))).with_runner(runner);

		assert!(matches!(
			supervisor.check_installed().await,
			Err(ProcessError::Installation(_))
		));
	}

	#[tokio::test]
	async fn test_not_found_on_stderr_is_installation_error() {
		let runner = FakeRunner::with(vec![Ok(CommandOutput {
			success: true,
			stdout: "something".to_string(),
			stderr: "geth: command not found".to_string(),
		})]);
		let supervisor =
			NodeSupervisor::new(config(no_proxy(UserConfig::default()))).with_runner(runner);

		assert!(supervisor.check_installed().await.is_err());
	}

	#[tokio::test]
	async fn test_existing_account_short_circuits_initialization() {
		let runner = FakeRunner::with(vec![FakeRunner::ok(
			"Account #0: {3ec93e1ee37b8bcb47d88402d61e0e96ab7f0b21} keystore:///tmp",
		)]);
		let user = no_proxy(UserConfig {
			genesis_block: Some(PathBuf::from("/tmp/genesis.json")),
			..Default::default()
		});
		let supervisor = NodeSupervisor::new(config(user)).with_runner(runner.clone());

		let outcome = supervisor.initialize_chain().await.unwrap();

		assert_eq!(
			outcome,
			InitOutcome::AlreadyInitialized(
				"0x3ec93e1ee37b8bcb47d88402d61e0e96ab7f0b21".to_string()
			)
		);
		let seen = runner.seen();
		assert_eq!(seen.len(), 1, "genesis and account creation must be skipped");
		assert!(seen[0].contains("account list"));
	}

	#[tokio::test]
	async fn test_fatal_listing_means_no_accounts_not_an_error() {
		let runner = FakeRunner::with(vec![
			FakeRunner::ok("Fatal: could not open database"),
			FakeRunner::ok("Address: {c5afa77b79608e80e0f5e5cbd2f34d34b5e42695}"),
		]);
		let supervisor = NodeSupervisor::new(config(no_proxy(UserConfig::default())))
			.with_runner(runner.clone());

		let outcome = supervisor.initialize_chain().await.unwrap();

		assert_eq!(
			outcome,
			InitOutcome::Initialized(Some(
				"0xc5afa77b79608e80e0f5e5cbd2f34d34b5e42695".to_string()
			))
		);
		let seen = runner.seen();
		assert_eq!(seen.len(), 2);
		assert!(seen[1].contains("account new"));
	}

	#[tokio::test]
	async fn test_genesis_initialization_runs_when_configured() {
		let dir = tempfile::tempdir().unwrap();
		let runner = FakeRunner::with(vec![
			FakeRunner::ok("no accounts"),
			FakeRunner::ok(""),
			FakeRunner::ok("Address: {c5afa77b79608e80e0f5e5cbd2f34d34b5e42695}"),
		]);
		let user = no_proxy(UserConfig {
			datadir: Some(dir.path().join("chaindata")),
			genesis_block: Some(PathBuf::from("/tmp/genesis.json")),
			..Default::default()
		});
		let supervisor = NodeSupervisor::new(config(user)).with_runner(runner.clone());

		supervisor.initialize_chain().await.unwrap();

		let seen = runner.seen();
		assert_eq!(seen.len(), 3);
		assert!(seen[1].contains("init /tmp/genesis.json"));
		assert!(dir.path().join("chaindata").is_dir());
	}

	#[tokio::test]
	async fn test_parity_dev_init_runs_one_shot_initializer() {
		let runner = FakeRunner::with(vec![FakeRunner::ok("")]);
		let user = no_proxy(UserConfig {
			client: Some(ClientKind::Parity),
			dev: Some(true),
			account: Some(AccountSettings {
				dev_password: Some(PathBuf::from("/tmp/dev_password")),
				..Default::default()
			}),
			..Default::default()
		});
		let supervisor = NodeSupervisor::new(config(user)).with_runner(runner.clone());

		let outcome = supervisor.initialize_chain().await.unwrap();

		assert_eq!(outcome, InitOutcome::Initialized(None));
		let seen = runner.seen();
		assert_eq!(seen.len(), 1);
		assert!(seen[0].contains("account new"));
	}

	#[tokio::test]
	async fn test_geth_dev_init_needs_no_commands() {
		let runner = FakeRunner::with(vec![]);
		let user = no_proxy(UserConfig {
			dev: Some(true),
			..Default::default()
		});
		let supervisor = NodeSupervisor::new(config(user)).with_runner(runner.clone());

		supervisor.initialize_chain().await.unwrap();

		assert!(runner.seen().is_empty());
	}

	#[tokio::test]
	async fn test_kill_is_idempotent_with_no_process() {
		let mut supervisor = NodeSupervisor::new(config(no_proxy(UserConfig::default())));

		supervisor.kill().await;
		supervisor.kill().await;
	}

	#[tokio::test]
	async fn test_ready_marker_fires_callback_and_provisioner_once() {
		let client: Arc<dyn NodeClient> =
			Arc::from(create_client(&config(no_proxy(UserConfig {
				dev: Some(true),
				..Default::default()
			}))));
		let latch = Arc::new(AtomicBool::new(false));
		let provisioner = Arc::new(CountingProvisioner(AtomicUsize::new(0)));
		let ready_count = Arc::new(AtomicUsize::new(0));
		let ready_clone = ready_count.clone();
		let state = Arc::new(Mutex::new(NodeState::Running));

		let (mut writer, reader) = tokio::io::duplex(1024);
		let scanner = spawn_diagnostic_scanner(
			reader,
			client,
			latch,
			true,
			provisioner.clone(),
			Arc::new(move || {
				ready_clone.fetch_add(1, Ordering::SeqCst);
			}),
			Arc::new(|_| {}),
			state.clone(),
		);

		writer
			.write_all(b"INFO WebSocket endpoint opened url=ws://127.0.0.1\n")
			.await
			.unwrap();
		writer
			.write_all(b"INFO WebSocket endpoint opened url=ws://127.0.0.1\n")
			.await
			.unwrap();
		drop(writer);
		scanner.await.unwrap();

		// The provisioner runs in a detached task; give it a moment.
		for _ in 0..50 {
			if provisioner.0.load(Ordering::SeqCst) > 0 {
				break;
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}

		assert_eq!(ready_count.load(Ordering::SeqCst), 1);
		assert_eq!(provisioner.0.load(Ordering::SeqCst), 1);
		assert_eq!(*state.lock().unwrap(), NodeState::Ready);
	}

	#[tokio::test]
	async fn test_exit_watcher_reports_exit_code() {
		let child = Command::new("sh")
			.args(["-c", "exit 3"])
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.spawn()
			.unwrap();
		let (tx, rx) = tokio::sync::oneshot::channel();
		let tx = Mutex::new(Some(tx));
		let state = Arc::new(Mutex::new(NodeState::Running));

		spawn_exit_watcher(
			child,
			"geth",
			Arc::new(move |code| {
				if let Some(tx) = tx.lock().unwrap().take() {
					tx.send(code).unwrap();
				}
			}),
			state.clone(),
		);

		assert_eq!(rx.await.unwrap(), Some(3));
		assert_eq!(*state.lock().unwrap(), NodeState::Exited);
	}

	#[tokio::test]
	async fn test_spawn_failure_reports_through_error_callback() {
		let errors = Arc::new(Mutex::new(Vec::<String>::new()));
		let errors_clone = errors.clone();
		let user = no_proxy(UserConfig {
			client_bin: Some("/nonexistent/path/to/geth".to_string()),
			..Default::default()
		});
		let mut supervisor = NodeSupervisor::new(config(user)).on_error(move |message| {
			errors_clone.lock().unwrap().push(message);
		});

		supervisor.start(None).await.unwrap();

		assert_eq!(errors.lock().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_relays_served_before_pipeline_and_closed_on_kill() {
		let closed = Arc::new(AtomicUsize::new(0));
		let relay = Arc::new(CountingRelay {
			served: AtomicUsize::new(0),
			closed: closed.clone(),
		});
		let runner = FakeRunner::with(vec![FakeRunner::ok("not found")]);
		let mut supervisor = NodeSupervisor::new(config(UserConfig::default()))
			.with_runner(runner)
			.with_relay(relay.clone());

		// Install check fails, but the relays were already served.
		assert!(supervisor.run().await.is_err());
		assert_eq!(relay.served.load(Ordering::SeqCst), 2);

		supervisor.kill().await;
		assert_eq!(closed.load(Ordering::SeqCst), 2);
		supervisor.kill().await;
		assert_eq!(closed.load(Ordering::SeqCst), 2);
	}
}
