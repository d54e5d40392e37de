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

//! # Glusto
//!
//! `glusto` is a toolkit for writing test scripts that drive remote and
//! distributed systems. It runs commands over SSH, loads and stores config
//! files in several formats, and expands families of tests over the
//! cartesian product of their option axes.
//!
//! The `glusto` binary wraps the most common operations, but every module
//! can be used on its own from a test harness.
//!
//! ## Core Modules
//!
//! * [`carteplex`]: Expands a test template into one generated class per
//!   combination of selected axis values, and hides the template from
//!   discovery.
//! * [`discovery`]: The explicit test registry (`TestModule`), the loader
//!   and its `load_tests` hook, and suites.
//! * [`configfile`]: Loads, merges and stores YAML, JSON, TOML, INI and CSV
//!   config files.
//! * [`config`]: Resolves the toolkit `Settings` with `figment`.
//! * [`connection`]: The `ConnectionPool` for SSH and local commands and scp
//!   transfers.
//! * [`command`]: `CommandResult` and result logging.
//! * [`colorfy`]: ANSI color flags for log output.
//! * [`rest`]: Form-encoded REST calls.
//! * [`template`]: Renders minijinja templates to files.
//! * [`cli`]: Defines the `clap`-based command-line interface.
//! * [`error`]: Defines the custom error types for the library.
//! * [`logging`]: Provides the `setup_tracing` utility.

pub mod carteplex;
pub mod cli;
pub mod colorfy;
pub mod command;
pub mod config;
pub mod configfile;
pub mod connection;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod rest;
pub mod template;
