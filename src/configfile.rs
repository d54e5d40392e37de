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

//! Loading and storing config files.
//!
//! Every format is read into (and written from) a [`serde_json::Value`], so
//! test scripts work with one in-memory shape regardless of where the data
//! came from:
//!
//! * YAML, JSON and TOML map directly onto the value tree.
//! * INI files become a mapping of sections to string values. Keys without a
//!   value load as `""`, and `%(name)s` references are interpolated.
//! * CSV files become a list of rows: mappings keyed by the header, or plain
//!   lists when the file has no header.

use crate::error::ConfigFileError;
use configparser::ini::Ini;
use serde_json::Map;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Section holding keys that appear before any `[section]` header.
const INI_DEFAULT_SECTION: &str = "default";

/// Nesting limit for `%(name)s` references.
const MAX_INTERPOLATION_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigType {
  Yaml,
  Json,
  Ini,
  Csv,
  Toml,
}

impl ConfigType {
  /// Detects the type from a file extension. Unknown or missing
  /// extensions are treated as YAML.
  pub fn from_path(path: &Path) -> Self {
    let extension = path
      .extension()
      .and_then(|ext| ext.to_str())
      .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
      Some("json") => ConfigType::Json,
      Some("ini") | Some("cfg") | Some("conf") => ConfigType::Ini,
      Some("csv") => ConfigType::Csv,
      Some("toml") => ConfigType::Toml,
      _ => ConfigType::Yaml,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      ConfigType::Yaml => "YAML",
      ConfigType::Json => "JSON",
      ConfigType::Ini => "INI",
      ConfigType::Csv => "CSV",
      ConfigType::Toml => "TOML",
    }
  }
}

impl FromStr for ConfigType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "yaml" | "yml" => Ok(ConfigType::Yaml),
      "json" => Ok(ConfigType::Json),
      "ini" => Ok(ConfigType::Ini),
      "csv" => Ok(ConfigType::Csv),
      "toml" => Ok(ConfigType::Toml),
      other => Err(format!("unknown config type '{}'", other)),
    }
  }
}

/// Format options for loading and storing.
#[derive(Debug, Clone)]
pub struct ConfigOptions {
  /// Forces a format instead of detecting it from the extension.
  pub config_type: Option<ConfigType>,

  /// INI only. When false, section and key names are lowercased.
  pub allow_mixed_case: bool,

  /// CSV only.
  pub delimiter: u8,

  /// CSV only. Whether the first row holds field names.
  pub header: bool,

  /// CSV only. Column order when storing rows of mappings.
  pub fieldnames: Option<Vec<String>>,
}

impl Default for ConfigOptions {
  fn default() -> Self {
    ConfigOptions {
      config_type: None,
      allow_mixed_case: true,
      delimiter: b',',
      header: true,
      fieldnames: None,
    }
  }
}

impl ConfigOptions {
  pub fn with_type(mut self, config_type: ConfigType) -> Self {
    self.config_type = Some(config_type);
    self
  }

  pub fn lowercase(mut self) -> Self {
    self.allow_mixed_case = false;
    self
  }

  pub fn delimiter(mut self, delimiter: u8) -> Self {
    self.delimiter = delimiter;
    self
  }

  pub fn header(mut self, header: bool) -> Self {
    self.header = header;
    self
  }

  pub fn fieldnames<I, S>(mut self, fieldnames: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.fieldnames = Some(fieldnames.into_iter().map(Into::into).collect());
    self
  }

  fn resolve_type(&self, path: &Path) -> ConfigType {
    self
      .config_type
      .unwrap_or_else(|| ConfigType::from_path(path))
  }
}

/// Reads a single config file.
pub fn load_config(path: &Path, options: &ConfigOptions) -> Result<Value, ConfigFileError> {
  let content = fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
    path: path.to_path_buf(),
    source,
  })?;
  let config_type = options.resolve_type(path);
  tracing::debug!(path = %path.display(), format = config_type.name(), "Loading config file");

  parse_config(&content, config_type, options)
}

/// Reads several config files and merges their top-level mappings in order.
/// Later files win on key conflicts. Empty files are skipped.
pub fn load_configs<P: AsRef<Path>>(
  paths: &[P],
  options: &ConfigOptions,
) -> Result<Value, ConfigFileError> {
  let mut merged = Map::new();
  for path in paths {
    let path = path.as_ref();
    match load_config(path, options)? {
      Value::Object(part) => merged.extend(part),
      Value::Null => tracing::warn!(path = %path.display(), "Config file is empty. Skipping."),
      _ => {
        return Err(ConfigFileError::NotAMapping {
          path: path.to_path_buf(),
        });
      }
    }
  }
  Ok(Value::Object(merged))
}

/// Writes a config value to `path` in the detected or requested format.
pub fn store_config(
  value: &Value,
  path: &Path,
  options: &ConfigOptions,
) -> Result<(), ConfigFileError> {
  let config_type = options.resolve_type(path);
  let text = render_config(value, config_type, options)?;
  fs::write(path, text).map_err(|source| ConfigFileError::Write {
    path: path.to_path_buf(),
    source,
  })?;
  tracing::debug!(path = %path.display(), format = config_type.name(), "Stored config file");
  Ok(())
}

/// Parses config text in the given format.
pub fn parse_config(
  content: &str,
  config_type: ConfigType,
  options: &ConfigOptions,
) -> Result<Value, ConfigFileError> {
  match config_type {
    ConfigType::Yaml => {
      if content.trim().is_empty() {
        return Ok(Value::Null);
      }
      Ok(serde_yaml::from_str(content)?)
    }
    ConfigType::Json => Ok(serde_json::from_str(content)?),
    ConfigType::Toml => Ok(toml::from_str(content)?),
    ConfigType::Ini => parse_ini(content, options),
    ConfigType::Csv => parse_csv(content, options),
  }
}

/// Renders a config value as text in the given format.
pub fn render_config(
  value: &Value,
  config_type: ConfigType,
  options: &ConfigOptions,
) -> Result<String, ConfigFileError> {
  match config_type {
    ConfigType::Yaml => Ok(serde_yaml::to_string(value)?),
    ConfigType::Json => {
      let mut text = serde_json::to_string_pretty(value)?;
      text.push('\n');
      Ok(text)
    }
    ConfigType::Toml => Ok(toml::to_string_pretty(value)?),
    ConfigType::Ini => render_ini(value, options),
    ConfigType::Csv => render_csv(value, options),
  }
}

/// Shallow-merges `overlay` into `base`, like a dict update.
pub fn update_config(base: &mut Value, overlay: Value) {
  let Value::Object(overlay) = overlay else {
    tracing::warn!("Ignoring config update that is not a mapping");
    return;
  };
  match base {
    Value::Object(base) => base.extend(overlay),
    _ => *base = Value::Object(overlay),
  }
}

/// Returns the YAML rendering of a config value.
pub fn get_config(value: &Value) -> Result<String, ConfigFileError> {
  Ok(serde_yaml::to_string(value)?)
}

/// Prints the YAML rendering of a config value to stdout.
pub fn show_config(value: &Value) -> Result<(), ConfigFileError> {
  print!("{}", get_config(value)?);
  Ok(())
}

// --- INI ---

fn new_ini(options: &ConfigOptions) -> Ini {
  if options.allow_mixed_case {
    Ini::new_cs()
  } else {
    Ini::new()
  }
}

fn parse_ini(content: &str, options: &ConfigOptions) -> Result<Value, ConfigFileError> {
  let mut ini = new_ini(options);
  let sections = ini
    .read(content.to_string())
    .map_err(ConfigFileError::Ini)?;
  // Case-sensitive parsing keeps `[DEFAULT]` as written.
  let defaults = sections.get(INI_DEFAULT_SECTION).or_else(|| {
    sections
      .iter()
      .find(|(name, _)| name.eq_ignore_ascii_case(INI_DEFAULT_SECTION))
      .map(|(_, entries)| entries)
  });

  let mut config = Map::new();
  for (section, entries) in &sections {
    let lookup = |name: &str| -> Option<String> {
      let name = if options.allow_mixed_case {
        name.to_string()
      } else {
        name.to_lowercase()
      };
      entries
        .get(&name)
        .or_else(|| defaults.and_then(|defaults| defaults.get(&name)))
        .map(|value| value.clone().unwrap_or_default())
    };

    let mut section_map = Map::new();
    for (key, value) in entries {
      let raw = value.clone().unwrap_or_default();
      let resolved = interpolate(section, key, &raw, &lookup, 0)?;
      section_map.insert(key.clone(), Value::String(resolved));
    }
    config.insert(section.clone(), Value::Object(section_map));
  }
  Ok(Value::Object(config))
}

/// Expands `%(name)s` references and `%%` escapes in an INI value.
fn interpolate(
  section: &str,
  key: &str,
  raw: &str,
  lookup: &dyn Fn(&str) -> Option<String>,
  depth: usize,
) -> Result<String, ConfigFileError> {
  let error = |reason: String| ConfigFileError::Interpolation {
    section: section.to_string(),
    key: key.to_string(),
    reason,
  };

  if depth > MAX_INTERPOLATION_DEPTH {
    return Err(error(format!(
      "references nested deeper than {}",
      MAX_INTERPOLATION_DEPTH
    )));
  }

  let mut out = String::with_capacity(raw.len());
  let mut rest = raw;
  while let Some(pos) = rest.find('%') {
    out.push_str(&rest[..pos]);
    let after = &rest[pos + 1..];

    if let Some(stripped) = after.strip_prefix('%') {
      out.push('%');
      rest = stripped;
    } else if let Some(body) = after.strip_prefix('(') {
      let Some(end) = body.find(")s") else {
        return Err(error(format!("bad interpolation syntax in '{}'", raw)));
      };
      let name = &body[..end];
      let value = lookup(name).ok_or_else(|| error(format!("no option named '{}'", name)))?;
      let value = if value.contains('%') {
        interpolate(section, key, &value, lookup, depth + 1)?
      } else {
        value
      };
      out.push_str(&value);
      rest = &body[end + 2..];
    } else {
      return Err(error(format!(
        "'%' must be followed by '%' or '(' in '{}'",
        raw
      )));
    }
  }
  out.push_str(rest);
  Ok(out)
}

fn render_ini(value: &Value, options: &ConfigOptions) -> Result<String, ConfigFileError> {
  let Value::Object(sections) = value else {
    return Err(ConfigFileError::Shape {
      format: "INI",
      found: value_kind(value),
      expected: "expected a mapping of sections",
    });
  };

  let mut ini = new_ini(options);
  for (section, entries) in sections {
    match entries {
      Value::Object(entries) => {
        for (key, entry) in entries {
          let entry = match entry {
            Value::Null => None,
            other => Some(scalar_string("INI", other)?),
          };
          ini.set(section, key, entry);
        }
      }
      // A list of names becomes keys without values.
      Value::Array(keys) => {
        for key in keys {
          ini.set(section, &scalar_string("INI", key)?, None);
        }
      }
      other => {
        return Err(ConfigFileError::Shape {
          format: "INI",
          found: value_kind(other),
          expected: "sections must be mappings or lists of keys",
        });
      }
    }
  }
  Ok(ini.writes())
}

// --- CSV ---

fn parse_csv(content: &str, options: &ConfigOptions) -> Result<Value, ConfigFileError> {
  let mut reader = csv::ReaderBuilder::new()
    .delimiter(options.delimiter)
    .has_headers(options.header)
    .flexible(true)
    .from_reader(content.as_bytes());

  let mut rows = Vec::new();
  if options.header {
    let headers = reader.headers()?.clone();
    for record in reader.records() {
      let record = record?;
      let row: Map<String, Value> = headers
        .iter()
        .zip(record.iter())
        .map(|(name, field)| (name.to_string(), Value::String(field.to_string())))
        .collect();
      rows.push(Value::Object(row));
    }
  } else {
    for record in reader.records() {
      let record = record?;
      rows.push(Value::Array(
        record
          .iter()
          .map(|field| Value::String(field.to_string()))
          .collect(),
      ));
    }
  }
  Ok(Value::Array(rows))
}

fn render_csv(value: &Value, options: &ConfigOptions) -> Result<String, ConfigFileError> {
  let Value::Array(rows) = value else {
    return Err(ConfigFileError::Shape {
      format: "CSV",
      found: value_kind(value),
      expected: "expected a list of rows",
    });
  };

  let fieldnames: Vec<String> = match (&options.fieldnames, rows.first()) {
    (Some(names), _) => names.clone(),
    (None, Some(Value::Object(first))) => first.keys().cloned().collect(),
    _ => Vec::new(),
  };

  let mut writer = csv::WriterBuilder::new()
    .delimiter(options.delimiter)
    .flexible(true)
    .from_writer(Vec::new());

  if options.header && !fieldnames.is_empty() {
    writer.write_record(&fieldnames)?;
  }

  for row in rows {
    let record: Vec<String> = match row {
      Value::Object(map) => fieldnames
        .iter()
        .map(|name| match map.get(name) {
          Some(field) => scalar_string("CSV", field),
          None => Ok(String::new()),
        })
        .collect::<Result<_, _>>()?,
      Value::Array(items) => items
        .iter()
        .map(|field| scalar_string("CSV", field))
        .collect::<Result<_, _>>()?,
      other => {
        return Err(ConfigFileError::Shape {
          format: "CSV",
          found: value_kind(other),
          expected: "rows must be mappings or lists",
        });
      }
    };
    writer.write_record(&record)?;
  }

  let bytes = writer
    .into_inner()
    .map_err(|e| csv::Error::from(e.into_error()))?;
  Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// --- Helpers ---

fn scalar_string(format: &'static str, value: &Value) -> Result<String, ConfigFileError> {
  match value {
    Value::String(s) => Ok(s.clone()),
    Value::Number(n) => Ok(n.to_string()),
    Value::Bool(b) => Ok(b.to_string()),
    Value::Null => Ok(String::new()),
    other => Err(ConfigFileError::Shape {
      format,
      found: value_kind(other),
      expected: "values must be scalars",
    }),
  }
}

fn value_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "a list",
    Value::Object(_) => "a mapping",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn no_refs(_: &str) -> Option<String> {
    None
  }

  #[test]
  fn detects_type_from_extension() {
    assert_eq!(ConfigType::from_path(Path::new("a.yml")), ConfigType::Yaml);
    assert_eq!(ConfigType::from_path(Path::new("a.JSON")), ConfigType::Json);
    assert_eq!(ConfigType::from_path(Path::new("a.ini")), ConfigType::Ini);
    assert_eq!(ConfigType::from_path(Path::new("a.csv")), ConfigType::Csv);
    assert_eq!(ConfigType::from_path(Path::new("a.toml")), ConfigType::Toml);
    assert_eq!(ConfigType::from_path(Path::new("noext")), ConfigType::Yaml);
  }

  #[test]
  fn interpolation_handles_escapes_and_errors() {
    assert_eq!(
      interpolate("s", "k", "100%% sure", &no_refs, 0).unwrap(),
      "100% sure"
    );
    assert!(interpolate("s", "k", "%(missing)s", &no_refs, 0).is_err());
    assert!(interpolate("s", "k", "50% off", &no_refs, 0).is_err());
  }

  #[test]
  fn interpolation_rejects_self_reference() {
    let lookup = |_: &str| Some("%(loop)s".to_string());
    let err = interpolate("s", "loop", "%(loop)s", &lookup, 0).unwrap_err();
    assert!(err.to_string().contains("nested deeper"));
  }
}
