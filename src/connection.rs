// Copyright 2025 Chisomo Makombo Sakala
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Remote and local command execution.
//!
//! Remote commands go through the OpenSSH client binaries. With
//! ControlPersist enabled, the first command to a host opens a control
//! master and later commands multiplex over it, so a [`ConnectionPool`] only
//! needs to remember the per-host argument set.

use crate::colorfy::Color;
use crate::colorfy::colorfy;
use crate::command::CommandResult;
use crate::command::log_results;
use crate::config::Settings;
use crate::error::ConnectionError;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use tokio::process::Child;
use tokio::process::Command;
use tokio::task::JoinSet;
use tracing::Instrument;

/// Control socket template; `%r`, `%h` and `%p` are expanded by ssh.
pub const CONTROL_PATH: &str = "~/.ssh/glusto-ssh-%r@%h:%p";

/// How long an idle control master stays up.
pub const CONTROL_PERSIST: &str = "4h";

/// SSH behaviour shared by every connection in a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshOptions {
  pub default_user: String,
  pub port: u16,
  pub connect_timeout: u32,
  pub keyfile: Option<PathBuf>,
  pub use_controlpersist: bool,
  pub ssh_program: PathBuf,
  pub scp_program: PathBuf,
  pub log_color: bool,
}

impl From<&Settings> for SshOptions {
  fn from(settings: &Settings) -> Self {
    SshOptions {
      default_user: settings.user.clone(),
      port: settings.ssh_port,
      connect_timeout: settings.connect_timeout,
      keyfile: settings.ssh_keyfile.clone(),
      use_controlpersist: settings.use_controlpersist,
      ssh_program: settings.ssh_program.clone(),
      scp_program: settings.scp_program.clone(),
      log_color: settings.log_color,
    }
  }
}

impl Default for SshOptions {
  fn default() -> Self {
    SshOptions::from(&Settings::default())
  }
}

impl SshOptions {
  /// `-o` options common to ssh and scp.
  fn common_options(&self) -> Vec<String> {
    let mut opts = vec![
      "-oPasswordAuthentication=no".to_string(),
      "-oStrictHostKeyChecking=no".to_string(),
      format!("-oConnectTimeout={}", self.connect_timeout),
    ];
    if let Some(keyfile) = &self.keyfile {
      opts.push(format!("-oIdentityFile={}", keyfile.display()));
    }
    if self.use_controlpersist {
      opts.push("-oControlMaster=auto".to_string());
      opts.push(format!("-oControlPersist={}", CONTROL_PERSIST));
      opts.push(format!("-oControlPath={}", CONTROL_PATH));
    }
    opts
  }

  pub fn ssh_args(&self) -> Vec<String> {
    let mut opts = vec!["-T".to_string(), format!("-oPort={}", self.port)];
    opts.extend(self.common_options());
    opts
  }

  pub fn scp_args(&self) -> Vec<String> {
    let mut opts = vec!["-P".to_string(), self.port.to_string()];
    opts.extend(self.common_options());
    opts
  }
}

/// A cached SSH destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshConnection {
  pub user: String,
  pub host: String,
  args: Vec<String>,
  ssh_program: PathBuf,
}

impl SshConnection {
  pub fn new(host: &str, user: &str, options: &SshOptions) -> Self {
    SshConnection {
      user: user.to_string(),
      host: host.to_string(),
      args: options.ssh_args(),
      ssh_program: options.ssh_program.clone(),
    }
  }

  /// `user@host`, also the cache key.
  pub fn name(&self) -> String {
    format!("{}@{}", self.user, self.host)
  }

  /// Full argument list for running `command` remotely.
  pub fn command_args(&self, command: &str) -> Vec<String> {
    let mut args = self.args.clone();
    args.push(self.name());
    args.push(command.to_string());
    args
  }

  fn command(&self, command: &str) -> Command {
    let mut cmd = Command::new(&self.ssh_program);
    cmd
      .args(self.command_args(command))
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);
    cmd
  }
}

/// A command started by [`ConnectionPool::run_async`].
#[derive(Debug)]
pub struct PendingCommand {
  identifier: String,
  child: Child,
  log_color: bool,
}

impl PendingCommand {
  pub fn identifier(&self) -> &str {
    &self.identifier
  }

  /// Waits for the command and collects its output.
  pub async fn communicate(self) -> Result<CommandResult, ConnectionError> {
    let output = self
      .child
      .wait_with_output()
      .await
      .map_err(|source| ConnectionError::Wait {
        identifier: self.identifier.clone(),
        source,
      })?;
    let result = CommandResult::from(output);
    log_results(&self.identifier, &result, self.log_color);
    Ok(result)
  }

  pub async fn kill(&mut self) -> Result<(), ConnectionError> {
    self
      .child
      .kill()
      .await
      .map_err(|source| ConnectionError::Kill {
        identifier: self.identifier.clone(),
        source,
      })
  }
}

#[derive(Debug)]
struct PoolInner {
  options: SshOptions,
  connections: Mutex<HashMap<String, Arc<SshConnection>>>,
}

/// Explicit connection cache, shared by cloning.
#[derive(Debug, Clone)]
pub struct ConnectionPool {
  inner: Arc<PoolInner>,
}

impl ConnectionPool {
  pub fn new(options: SshOptions) -> Self {
    ConnectionPool {
      inner: Arc::new(PoolInner {
        options,
        connections: Mutex::new(HashMap::new()),
      }),
    }
  }

  pub fn from_settings(settings: &Settings) -> Self {
    Self::new(SshOptions::from(settings))
  }

  pub fn options(&self) -> &SshOptions {
    &self.inner.options
  }

  fn user<'a>(&'a self, user: Option<&'a str>) -> &'a str {
    user.unwrap_or(&self.inner.options.default_user)
  }

  /// Returns the cached connection for `user@host`, creating it if needed.
  pub fn connection(&self, host: &str, user: Option<&str>) -> Arc<SshConnection> {
    let user = self.user(user);
    let name = format!("{}@{}", user, host);
    let mut connections = self
      .inner
      .connections
      .lock()
      .unwrap_or_else(PoisonError::into_inner);

    if let Some(connection) = connections.get(&name) {
      tracing::debug!("Retrieved connection from cache: {}", name);
      return Arc::clone(connection);
    }

    tracing::debug!("Creating connection: {}", name);
    let connection = Arc::new(SshConnection::new(host, user, &self.inner.options));
    connections.insert(name, Arc::clone(&connection));
    connection
  }

  /// Names of the cached connections, sorted.
  pub fn connections(&self) -> Vec<String> {
    let connections = self
      .inner
      .connections
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    let mut names: Vec<String> = connections.keys().cloned().collect();
    names.sort();
    names
  }

  fn log_command(&self, identifier: &str, command: &str) {
    let persist = if self.inner.options.use_controlpersist {
      " (cp)"
    } else {
      ""
    };
    tracing::info!(
      "{}",
      colorfy(
        Color::COLOR_COMMAND,
        &format!("{}{}: {}", identifier, persist, command),
        self.inner.options.log_color
      )
    );
  }

  async fn execute(
    &self,
    mut cmd: Command,
    identifier: &str,
    program: &Path,
  ) -> Result<CommandResult, ConnectionError> {
    let output = cmd
      .output()
      .await
      .map_err(|source| ConnectionError::Spawn {
        program: program.display().to_string(),
        identifier: identifier.to_string(),
        source,
      })?;
    let result = CommandResult::from(output);
    log_results(identifier, &result, self.inner.options.log_color);
    Ok(result)
  }

  /// Runs `command` on `host` and waits for it.
  pub async fn run(
    &self,
    host: &str,
    command: &str,
    user: Option<&str>,
  ) -> Result<CommandResult, ConnectionError> {
    let connection = self.connection(host, user);
    let identifier = connection.name();
    self.log_command(&identifier, command);

    self
      .execute(
        connection.command(command),
        &identifier,
        &connection.ssh_program,
      )
      .await
  }

  /// Runs `command` through the local shell.
  pub async fn run_local(&self, command: &str) -> Result<CommandResult, ConnectionError> {
    tracing::info!("local: {}", command);
    let mut cmd = Command::new("sh");
    cmd
      .arg("-c")
      .arg(command)
      .stdin(Stdio::null())
      .kill_on_drop(true);
    self.execute(cmd, "local", Path::new("sh")).await
  }

  /// Runs locally when `host` is `None`, remotely otherwise.
  pub async fn run_on(
    &self,
    host: Option<&str>,
    command: &str,
    user: Option<&str>,
  ) -> Result<CommandResult, ConnectionError> {
    match host {
      Some(host) => self.run(host, command, user).await,
      None => self.run_local(command).await,
    }
  }

  /// Runs `command` on each host in turn.
  pub async fn run_serial(
    &self,
    hosts: &[String],
    command: &str,
    user: Option<&str>,
  ) -> Result<BTreeMap<String, CommandResult>, ConnectionError> {
    let mut results = BTreeMap::new();
    for host in hosts {
      let result = self.run(host, command, user).await?;
      results.insert(host.clone(), result);
    }
    Ok(results)
  }

  /// Runs `command` on every host concurrently.
  pub async fn run_parallel(
    &self,
    hosts: &[String],
    command: &str,
    user: Option<&str>,
  ) -> Result<BTreeMap<String, CommandResult>, ConnectionError> {
    let mut tasks = JoinSet::new();
    for host in hosts {
      let pool = self.clone();
      let host = host.clone();
      let command = command.to_string();
      let user = user.map(str::to_string);
      let span = tracing::info_span!("run_parallel", host = %host);
      tasks.spawn(
        async move {
          let result = pool.run(&host, &command, user.as_deref()).await;
          (host, result)
        }
        .instrument(span),
      );
    }

    let mut results = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
      let (host, result) = joined?;
      results.insert(host, result?);
    }
    Ok(results)
  }

  /// Starts `command` on `host` without waiting for it.
  pub async fn run_async(
    &self,
    host: &str,
    command: &str,
    user: Option<&str>,
  ) -> Result<PendingCommand, ConnectionError> {
    let connection = self.connection(host, user);
    let identifier = connection.name();
    self.log_command(&identifier, command);

    let child = connection
      .command(command)
      .spawn()
      .map_err(|source| ConnectionError::Spawn {
        program: connection.ssh_program.display().to_string(),
        identifier: identifier.clone(),
        source,
      })?;

    Ok(PendingCommand {
      identifier,
      child,
      log_color: self.inner.options.log_color,
    })
  }

  async fn scp(&self, from: String, to: String) -> Result<(), ConnectionError> {
    let options = &self.inner.options;
    let mut cmd = Command::new(&options.scp_program);
    cmd
      .args(options.scp_args())
      .arg(&from)
      .arg(&to)
      .stdin(Stdio::null())
      .kill_on_drop(true);

    tracing::info!("scp {} {}", from, to);
    let identifier = format!("scp {}", to);
    let result = self.execute(cmd, &identifier, &options.scp_program).await?;
    if !result.success() {
      return Err(ConnectionError::Transfer {
        from,
        to,
        retcode: result.retcode,
        stderr: result.stderr,
      });
    }
    Ok(())
  }

  /// Copies a local file to `host`.
  pub async fn upload(
    &self,
    host: &str,
    local_path: &Path,
    remote_path: &str,
    user: Option<&str>,
  ) -> Result<(), ConnectionError> {
    let destination = format!("{}:{}", self.connection(host, user).name(), remote_path);
    self
      .scp(local_path.display().to_string(), destination)
      .await
  }

  /// Copies a file from `host` to the local machine.
  pub async fn download(
    &self,
    host: &str,
    remote_path: &str,
    local_path: &Path,
    user: Option<&str>,
  ) -> Result<(), ConnectionError> {
    let source = format!("{}:{}", self.connection(host, user).name(), remote_path);
    self
      .scp(source, local_path.display().to_string())
      .await
  }

  /// Copies a file between two remote hosts by running scp on the source.
  /// Keys must already be set up between the two hosts.
  pub async fn transfer(
    &self,
    source_host: &str,
    source_file: &str,
    target_host: &str,
    target_file: &str,
    user: Option<&str>,
  ) -> Result<CommandResult, ConnectionError> {
    let user = self.user(user);
    let command = format!("scp {} {}@{}:{}", source_file, user, target_host, target_file);
    self.run(source_host, &command, Some(user)).await
  }

  /// Shuts down control masters and forgets every cached connection.
  ///
  /// Failures are logged and otherwise ignored; the master may already be gone.
  pub async fn close_all(&self) {
    let closed: Vec<Arc<SshConnection>> = {
      let mut connections = self
        .inner
        .connections
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
      connections.drain().map(|(_, connection)| connection).collect()
    };

    if !self.inner.options.use_controlpersist {
      return;
    }

    for connection in closed {
      let mut args = connection.args.clone();
      args.extend(["-O".to_string(), "exit".to_string(), connection.name()]);
      let status = Command::new(&connection.ssh_program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
      match status {
        Ok(status) if status.success() => {
          tracing::debug!("Closed control master for {}", connection.name())
        }
        Ok(status) => tracing::debug!(
          code = ?status.code(),
          "No control master to close for {}",
          connection.name()
        ),
        Err(e) => tracing::warn!(error = %e, "Failed to close {}", connection.name()),
      }
    }
  }
}
