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
use Commands::Carteplex as CarteplexCmd;
use Commands::Config;
use Commands::Render;
use Commands::Run;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use glusto::carteplex::Carteplex;
use glusto::carteplex::CarteplexDefinition;
use glusto::carteplex::Limit;
use glusto::carteplex::Selection;
use glusto::carteplex::limits_from_config;
use glusto::cli::Cli;
use glusto::cli::Commands;
use glusto::config::Settings;
use glusto::configfile::ConfigOptions;
use glusto::configfile::load_config;
use glusto::configfile::load_configs;
use glusto::configfile::show_config;
use glusto::connection::ConnectionPool;
use glusto::discovery::TestTemplate;
use glusto::logging::setup_tracing;
use glusto::template::render_template;
use serde_json::Value;
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tracing::Instrument;

#[tokio::main]
async fn main() -> Result<ExitCode> {
  let Cli { configs, command } = Cli::parse();

  let config =
    load_configs(&configs, &ConfigOptions::default()).context("Failed to load config files")?;
  let settings = Settings::resolve(&config)?;
  let _guard = setup_tracing(&settings)?;

  let main_span = tracing::info_span!("glusto", log_name = %settings.log_name);
  dispatch(command, config, settings)
    .instrument(main_span)
    .await
}

async fn dispatch(command: Commands, config: Value, settings: Settings) -> Result<ExitCode> {
  match command {
    Config => {
      show_config(&config)?;
    }
    Run {
      host,
      user,
      command,
    } => {
      let command = command.join(" ");
      let host = host.filter(|host| host != "local");
      let pool = ConnectionPool::from_settings(&settings);

      let result = pool
        .run_on(host.as_deref(), &command, user.as_deref())
        .await?;
      pool.close_all().await;

      print!("{}", result.stdout);
      eprint!("{}", result.stderr);
      return Ok(ExitCode::from(u8::try_from(result.retcode).unwrap_or(1)));
    }
    CarteplexCmd {
      definition,
      template,
    } => {
      expand_definition(&definition, &template, &config)?;
    }
    Render {
      template,
      vars,
      output,
      search_path,
    } => {
      let vars = match vars {
        Some(path) => load_config(&path, &ConfigOptions::default())?,
        None => config,
      };
      render_template(&template, &vars, &output, &search_path)?;
      tracing::info!(output = %output.display(), "Template rendered");
    }
  }

  Ok(ExitCode::SUCCESS)
}

/// Prints one JSON line per generated class.
///
/// Keys in the merged config override the definition file. Without a
/// `limits` key in either, every axis is limited to `ALL`.
fn expand_definition(path: &Path, template: &str, config: &Value) -> Result<()> {
  let raw = load_config(path, &ConfigOptions::default())?;
  let definition: CarteplexDefinition = serde_json::from_value(raw.clone())
    .with_context(|| format!("Invalid carteplex definition in {}", path.display()))?;
  let definition = definition.with_overrides(config)?;

  let all: Vec<Limit> = vec![Some(Selection::All); definition.axis_names.len()];
  let limits = limits_from_config(config, limits_from_config(&raw, all)?)?;

  let carteplex = Carteplex::new(definition)?;
  let classes = carteplex.expand(&TestTemplate::new(template), &limits, "glusto")?;

  let mut stdout = std::io::stdout().lock();
  for class in classes {
    let line = json!({
      "name": class.name,
      "attributes": &*class.attributes,
    });
    writeln!(stdout, "{}", line)?;
  }
  Ok(())
}
