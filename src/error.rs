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
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error enum for the glusto library.
#[derive(Error, Debug)]
pub enum GlustoError {
  #[error("Carteplex expansion failed")]
  Carteplex(#[from] CarteplexError),

  #[error("Test discovery failed")]
  Discovery(#[from] DiscoveryError),

  #[error("Config file error")]
  ConfigFile(#[from] ConfigFileError),

  #[error("Configuration error")]
  Config(#[from] ConfigError),

  #[error("Remote command failed")]
  Connection(#[from] ConnectionError),

  #[error("REST request failed")]
  Rest(#[from] RestError),

  #[error("Template rendering failed")]
  Template(#[from] TemplateError),

  #[error("Logging setup failed")]
  Logging(#[from] LoggingError),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

/// Errors related to cartesian test expansion (src/carteplex.rs).
#[derive(Error, Debug)]
pub enum CarteplexError {
  #[error("Definition shape mismatch: {axes} axis names but {field} has {len} entries")]
  ShapeMismatch {
    axes: usize,
    field: &'static str,
    len: usize,
  },

  #[error("Axis name '{0}' is declared more than once")]
  DuplicateAxis(String),

  #[error("Unknown selection keyword '{0}'. Expected 'ALL' or a list of values")]
  UnknownKeyword(String),

  #[error("Generated test class name '{0}' is not unique")]
  DuplicateName(String),

  #[error("Invalid carteplex override for '{key}'")]
  InvalidOverride {
    key: &'static str,
    #[source]
    source: serde_json::Error,
  },

  #[error(transparent)]
  Discovery(#[from] DiscoveryError),
}

/// Errors related to the test registry (src/discovery.rs).
#[derive(Error, Debug)]
pub enum DiscoveryError {
  #[error("Test class '{class}' is already registered in module '{module}'")]
  DuplicateClass { module: String, class: String },

  #[error("Ordered test '{0}' was not found in the module")]
  UnknownTest(String),
}

/// Errors related to reading and writing config files (src/configfile.rs).
#[derive(Error, Debug)]
pub enum ConfigFileError {
  #[error("Failed to read config file: {path}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to write config file: {path}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to parse YAML")]
  Yaml(#[from] serde_yaml::Error),

  #[error("Failed to parse JSON")]
  Json(#[from] serde_json::Error),

  #[error("Failed to parse TOML: {0}")]
  TomlParse(#[from] toml::de::Error),

  #[error("Failed to serialize TOML: {0}")]
  TomlSerialize(#[from] toml::ser::Error),

  #[error("Failed to parse INI: {0}")]
  Ini(String),

  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("Bad INI interpolation in [{section}] {key}: {reason}")]
  Interpolation {
    section: String,
    key: String,
    reason: String,
  },

  #[error("Cannot store {found} as {format}: {expected}")]
  Shape {
    format: &'static str,
    found: &'static str,
    expected: &'static str,
  },

  #[error("Config file {path} does not contain a mapping at the top level")]
  NotAMapping { path: PathBuf },
}

/// Errors related to toolkit settings resolution (src/config.rs).
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Failed to resolve settings: {0}")]
  Extract(#[from] Box<figment::Error>),
}

/// Errors related to remote and local command execution (src/connection.rs).
#[derive(Error, Debug)]
pub enum ConnectionError {
  #[error("Failed to spawn {program} for {identifier}")]
  Spawn {
    program: String,
    identifier: String,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to wait for command on {identifier}")]
  Wait {
    identifier: String,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to kill command on {identifier}")]
  Kill {
    identifier: String,
    #[source]
    source: std::io::Error,
  },

  #[error("Parallel run task failed")]
  Task(#[from] tokio::task::JoinError),

  #[error("File transfer {from} -> {to} failed with code {retcode}: {stderr}")]
  Transfer {
    from: String,
    to: String,
    retcode: i32,
    stderr: String,
  },
}

/// Errors related to REST calls (src/rest.rs).
#[derive(Error, Debug)]
pub enum RestError {
  #[error("Failed to build HTTP client")]
  Client(#[source] reqwest::Error),

  #[error("Request to {url} failed")]
  Request {
    url: String,
    #[source]
    source: reqwest::Error,
  },
}

/// Errors related to template rendering (src/template.rs).
#[derive(Error, Debug)]
pub enum TemplateError {
  #[error("Failed to render template '{name}'")]
  Render {
    name: String,
    #[source]
    source: minijinja::Error,
  },

  #[error("Failed to write rendered output: {path}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Errors related to logging setup (src/logging.rs).
#[derive(Error, Debug)]
pub enum LoggingError {
  #[error("Unknown log level '{0}'. Expected DEBUG, INFO, WARNING, ERROR or CRITICAL")]
  UnknownLevel(String),

  #[error("Failed to create log directory: {path}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to install the global subscriber: {0}")]
  Init(String),
}
