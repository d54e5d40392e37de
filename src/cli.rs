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
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

/// Glusto: a toolkit for test scripts against remote systems.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
  /// Config file to load. Repeat to merge several; later files win.
  #[arg(short = 'c', long = "config", global = true, env = "GLUSTO_CONFIG_FILES", value_delimiter = ',')]
  pub configs: Vec<PathBuf>,

  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Print the merged configuration as YAML.
  Config,

  /// Run a command on a host over SSH, or locally.
  Run {
    /// Target host. Omit or pass "local" to run on this machine.
    #[arg(long)]
    host: Option<String>,

    /// Remote user. Defaults to the configured user.
    #[arg(short, long)]
    user: Option<String>,

    /// The command line to run.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
  },

  /// Expand a carteplex definition and list the generated classes as JSON lines.
  Carteplex {
    /// Definition file (YAML, JSON, TOML) with `axis_names`,
    /// `available_options`, `selections` and optional `name_tag` and `limits`.
    definition: PathBuf,

    /// Template class name the generated names start with.
    #[arg(short, long, default_value = "Test")]
    template: String,
  },

  /// Render a template file.
  Render {
    /// Template name, relative to the search path.
    template: String,

    /// Variables file (YAML, JSON, TOML). The merged config is used if absent.
    #[arg(long)]
    vars: Option<PathBuf>,

    /// Where to write the rendered text.
    #[arg(short, long)]
    output: PathBuf,

    #[arg(long, default_value = ".")]
    search_path: PathBuf,
  },
}
