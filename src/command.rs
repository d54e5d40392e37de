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
use crate::colorfy::Color;
use crate::colorfy::colorfy;
use serde::Deserialize;
use serde::Serialize;
use std::process::ExitStatus;
use std::process::Output;

/// The outcome of a command, local or remote.
///
/// This struct is the "contract" between the connection layer and test
/// scripts: a non-zero `retcode` is data, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
  /// Exit code of the command. Negative values carry the signal number
  /// that terminated the process.
  pub retcode: i32,

  pub stdout: String,

  pub stderr: String,
}

impl CommandResult {
  pub fn success(&self) -> bool {
    self.retcode == 0
  }

  pub fn into_parts(self) -> (i32, String, String) {
    (self.retcode, self.stdout, self.stderr)
  }
}

impl From<Output> for CommandResult {
  fn from(output: Output) -> Self {
    CommandResult {
      retcode: exit_code(output.status),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
  }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
  use std::os::unix::process::ExitStatusExt;
  status
    .code()
    .unwrap_or_else(|| -status.signal().unwrap_or(1))
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
  status.code().unwrap_or(-1)
}

/// Logs a command's results at debug level, colorized when `color` is set.
pub fn log_results(identifier: &str, result: &CommandResult, color: bool) {
  tracing::debug!(
    "{}",
    colorfy(
      Color::COLOR_RCODE,
      &format!("RETCODE ({}): {}", identifier, result.retcode),
      color
    )
  );
  if !result.stdout.is_empty() {
    tracing::debug!(
      "{}",
      colorfy(
        Color::COLOR_STDOUT,
        &format!("STDOUT ({})...\n{}", identifier, result.stdout),
        color
      )
    );
  }
  if !result.stderr.is_empty() {
    tracing::debug!(
      "{}",
      colorfy(
        Color::COLOR_STDERR,
        &format!("STDERR ({})...\n{}", identifier, result.stderr),
        color
      )
    );
  }
}
