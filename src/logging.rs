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
use crate::config::Settings;
use crate::error::LoggingError;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Env var naming a log file. Takes precedence over the `log_filename` setting.
pub const LOG_FILE_ENV: &str = "GLUSTO_LOG_FILE";

/// Maps a log level name to a filter.
///
/// Accepts the names used in glusto config files: DEBUG, INFO, WARNING,
/// ERROR and CRITICAL (case-insensitive). CRITICAL maps to ERROR.
pub fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
  match level.to_ascii_uppercase().as_str() {
    "DEBUG" => Ok(LevelFilter::DEBUG),
    "INFO" => Ok(LevelFilter::INFO),
    "WARNING" | "WARN" => Ok(LevelFilter::WARN),
    "ERROR" | "CRITICAL" => Ok(LevelFilter::ERROR),
    _ => Err(LoggingError::UnknownLevel(level.to_string())),
  }
}

/// Picks the log file: `GLUSTO_LOG_FILE` first, then the settings.
fn log_file(settings: &Settings) -> Option<PathBuf> {
  match env::var(LOG_FILE_ENV) {
    Ok(log_file) if !log_file.is_empty() => Some(PathBuf::from(log_file)),
    _ => settings.log_filename.clone(),
  }
}

/// Sets up the global tracing subscriber.
///
/// - If a log file is configured, logs to that file (creating its directory).
/// - If not, logs to stderr.
///
/// The level comes from `settings.log_level` unless `RUST_LOG` is set.
/// The returned guard must be held for the life of the program so buffered
/// file output is flushed.
pub fn setup_tracing(settings: &Settings) -> Result<Option<WorkerGuard>, LoggingError> {
  let level = parse_level(&settings.log_level)?;
  let env_filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));

  match log_file(settings) {
    Some(path) => {
      let (dir, file_name) = split_log_path(&path);
      fs::create_dir_all(&dir).map_err(|source| LoggingError::CreateDir {
        path: dir.clone(),
        source,
      })?;

      let file_appender = tracing_appender::rolling::never(&dir, file_name);
      let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

      tracing_subscriber::registry()
        .with(env_filter)
        .with(
          fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false),
        )
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

      tracing::info!(
        log_name = %settings.log_name,
        path = %path.display(),
        level = %settings.log_level,
        "Logfile created"
      );
      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;
      Ok(None)
    }
  }
}

fn split_log_path(path: &Path) -> (PathBuf, PathBuf) {
  let dir = match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
    _ => PathBuf::from("."),
  };
  let file_name = path
    .file_name()
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from("glusto.log"));
  (dir, file_name)
}
