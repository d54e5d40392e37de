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
use crate::error::ConfigError;
use figment::Figment;
use figment::providers::Env;
use figment::providers::Format;
use figment::providers::Json;
use figment::providers::Serialized;
use figment::providers::Yaml;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// System-wide defaults, merged when present.
pub const DEFAULT_YAML_PATH: &str = "/etc/glusto/defaults.yml";
pub const DEFAULT_JSON_PATH: &str = "/etc/glusto/defaults.json";

/// Prefix for environment variable overrides, e.g. `GLUSTO_USER=admin`.
pub const ENV_PREFIX: &str = "GLUSTO_";

// --- Default Values ---
fn default_user() -> String {
  "root".to_string()
}

fn default_ssh_program() -> PathBuf {
  PathBuf::from("ssh")
}

fn default_scp_program() -> PathBuf {
  PathBuf::from("scp")
}

/// Fully resolved toolkit settings.
///
/// These are the knobs the toolkit itself reads (SSH behaviour, logging).
/// Everything else in a loaded config (node lists, test data) stays in the
/// raw config value and is left to the test scripts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Remote user when a call does not name one.
  pub user: String,

  /// Reuse SSH connections through an OpenSSH control master.
  pub use_controlpersist: bool,

  pub ssh_keyfile: Option<PathBuf>,

  pub ssh_port: u16,

  /// SSH connect timeout in seconds.
  pub connect_timeout: u32,

  /// The `ssh` client binary.
  pub ssh_program: PathBuf,

  /// The `scp` client binary.
  pub scp_program: PathBuf,

  /// Colorize command output in logs.
  pub log_color: bool,

  pub log_name: String,

  pub log_filename: Option<PathBuf>,

  pub log_level: String,
}

impl Default for Settings {
  fn default() -> Self {
    Settings {
      user: default_user(),
      use_controlpersist: true,
      ssh_keyfile: None,
      ssh_port: 22,
      connect_timeout: 10,
      ssh_program: default_ssh_program(),
      scp_program: default_scp_program(),
      log_color: true,
      log_name: "glustomain".to_string(),
      log_filename: None,
      log_level: "INFO".to_string(),
    }
  }
}

impl Settings {
  /// Builds the layered figment: defaults, system files, `config`, environment.
  pub fn figment(config: &Value) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(Settings::default()))
      .merge(Yaml::file(DEFAULT_YAML_PATH))
      .merge(Json::file(DEFAULT_JSON_PATH));

    // Only mappings can carry settings; a CSV table or an empty file cannot.
    if config.is_object() {
      figment = figment.merge(Serialized::globals(config));
    }

    figment.merge(Env::prefixed(ENV_PREFIX))
  }

  /// Resolves settings from a loaded config value.
  pub fn resolve(config: &Value) -> Result<Self, ConfigError> {
    Self::from_figment(Self::figment(config))
  }

  pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
    let settings: Settings = figment.extract().map_err(Box::new)?;
    tracing::debug!(?settings, "Resolved settings");
    Ok(settings)
  }
}
