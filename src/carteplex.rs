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

//! Cartesian test multiplexing ("carteplex").
//!
//! A [`CarteplexDefinition`] names the axes of variation for a family of
//! tests (camera, lens, filter, ...), the values each axis can take, and the
//! subset each test family selects. Decorating a template class with a set of
//! per-invocation [`Limit`]s expands it into one generated class per
//! combination, each carrying the combination's values as attributes:
//!
//! 1. [`resolve`] turns `ALL` selections and limits into the full value list.
//! 2. [`intersect`] narrows each selection by its limit. An axis without a
//!    limit contributes nothing and is dropped from the generated attributes.
//! 3. [`product`] enumerates the cartesian product of the surviving axes.
//! 4. [`synthesize`] clones the template once per combination.
//! 5. [`install_test_discovery_hook`] makes discovery yield only the
//!    generated classes.

use crate::discovery::Attributes;
use crate::discovery::LoadTestsHook;
use crate::discovery::TestClass;
use crate::discovery::TestLoader;
use crate::discovery::TestModule;
use crate::discovery::TestSuite;
use crate::discovery::TestTemplate;
use crate::error::CarteplexError;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Sentinel meaning "every available value".
pub const ALL: &str = "ALL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawSelection {
  Keyword(String),
  Values(Vec<String>),
}

/// The values an axis may take: everything available, or an explicit list.
///
/// Deserializes from the string `"ALL"` or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSelection", into = "RawSelection")]
pub enum Selection {
  All,
  Values(Vec<String>),
}

impl Selection {
  pub fn values<I, S>(values: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Selection::Values(values.into_iter().map(Into::into).collect())
  }
}

impl TryFrom<RawSelection> for Selection {
  type Error = CarteplexError;

  fn try_from(raw: RawSelection) -> Result<Self, Self::Error> {
    match raw {
      RawSelection::Keyword(keyword) if keyword == ALL => Ok(Selection::All),
      RawSelection::Keyword(keyword) => Err(CarteplexError::UnknownKeyword(keyword)),
      RawSelection::Values(values) => Ok(Selection::Values(values)),
    }
  }
}

impl From<Selection> for RawSelection {
  fn from(selection: Selection) -> Self {
    match selection {
      Selection::All => RawSelection::Keyword(ALL.to_string()),
      Selection::Values(values) => RawSelection::Values(values),
    }
  }
}

/// A per-invocation restriction for one axis.
///
/// `None` and an empty list both mean "no limit given", which drops the
/// axis from the expansion entirely.
pub type Limit = Option<Selection>;

/// Declares the axes a family of tests varies over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarteplexDefinition {
  pub axis_names: Vec<String>,

  /// Permissible values per axis, in axis order.
  pub available_options: Vec<Vec<String>>,

  /// Values each axis selects, in axis order.
  pub selections: Vec<Selection>,

  /// Inserted between the template name and the values in generated names.
  #[serde(default)]
  pub name_tag: Option<String>,
}

impl CarteplexDefinition {
  /// Fails fast when an axis name repeats or the per-axis lists disagree
  /// in length.
  pub fn validate(&self) -> Result<(), CarteplexError> {
    let mut seen = HashSet::new();
    if let Some(name) = self.axis_names.iter().find(|name| !seen.insert(name.as_str())) {
      return Err(CarteplexError::DuplicateAxis(name.clone()));
    }

    let axes = self.axis_names.len();
    check_len(axes, "available_options", self.available_options.len())?;
    check_len(axes, "selections", self.selections.len())
  }

  /// Replaces fields with values found in a loaded config.
  ///
  /// Recognised keys: `axis_names`, `available_options`, `selections` and
  /// `name_tag`. Missing keys keep the static definition.
  pub fn with_overrides(mut self, config: &Value) -> Result<Self, CarteplexError> {
    if let Some(axis_names) = config_override(config, "axis_names")? {
      self.axis_names = axis_names;
    }
    if let Some(available_options) = config_override(config, "available_options")? {
      self.available_options = available_options;
    }
    if let Some(selections) = config_override(config, "selections")? {
      self.selections = selections;
    }
    if let Some(name_tag) = config_override(config, "name_tag")? {
      self.name_tag = Some(name_tag);
    }
    Ok(self)
  }
}

/// Reads per-invocation limits from a config's `limits` key, falling back to
/// `default` when the key is absent.
pub fn limits_from_config(config: &Value, default: Vec<Limit>) -> Result<Vec<Limit>, CarteplexError> {
  Ok(config_override(config, "limits")?.unwrap_or(default))
}

fn config_override<T: DeserializeOwned>(
  config: &Value,
  key: &'static str,
) -> Result<Option<T>, CarteplexError> {
  match config.get(key) {
    None | Some(Value::Null) => Ok(None),
    Some(value) => serde_json::from_value(value.clone())
      .map(Some)
      .map_err(|source| CarteplexError::InvalidOverride { key, source }),
  }
}

fn check_len(axes: usize, field: &'static str, len: usize) -> Result<(), CarteplexError> {
  if len != axes {
    return Err(CarteplexError::ShapeMismatch { axes, field, len });
  }
  Ok(())
}

/// One element of the cartesian product: `(axis, value)` pairs in axis order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combination {
  pub values: Vec<(String, String)>,
}

impl Combination {
  pub fn get(&self, axis: &str) -> Option<&str> {
    self
      .values
      .iter()
      .find(|(name, _)| name == axis)
      .map(|(_, value)| value.as_str())
  }

  pub fn axes(&self) -> impl Iterator<Item = &str> {
    self.values.iter().map(|(name, _)| name.as_str())
  }

  /// The values joined with `_`.
  pub fn suffix(&self) -> String {
    self
      .values
      .iter()
      .map(|(_, value)| value.as_str())
      .collect::<Vec<_>>()
      .join("_")
  }
}

/// How generated classes are named.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingRule {
  pub tag: Option<String>,
}

impl NamingRule {
  /// `<template>[_<tag>]_<value>_<value>...`
  pub fn class_name(&self, template: &str, combination: &Combination) -> String {
    let mut parts = vec![template];
    if let Some(tag) = &self.tag {
      parts.push(tag);
    }
    parts.extend(combination.values.iter().map(|(_, value)| value.as_str()));
    parts.join("_")
  }
}

/// Replaces `ALL` with the full `available` list.
pub fn resolve(selection: &Selection, available: &[String]) -> Vec<String> {
  match selection {
    Selection::All => available.to_vec(),
    Selection::Values(values) => values.clone(),
  }
}

/// Narrows a selection by a limit.
///
/// Returns the values of `selection` that also appear in `limit`, in
/// selection order and without duplicates. Unknown values are simply not
/// matched. A missing or empty limit yields `None`: the axis is dropped.
pub fn intersect(selection: &[String], limit: Option<&[String]>) -> Option<Vec<String>> {
  let limit = limit.filter(|limit| !limit.is_empty())?;
  let wanted: HashSet<&str> = limit.iter().map(String::as_str).collect();
  let mut seen = HashSet::new();
  Some(
    selection
      .iter()
      .filter(|value| wanted.contains(value.as_str()) && seen.insert(value.as_str()))
      .cloned()
      .collect(),
  )
}

/// Cartesian product; the first axis varies slowest.
///
/// Any empty axis empties the product. No axes at all yield a single
/// empty combination.
pub fn product(axes: &[Vec<String>]) -> Vec<Vec<String>> {
  axes.iter().fold(vec![Vec::new()], |acc, axis| {
    acc
      .iter()
      .flat_map(|prefix| {
        axis.iter().map(move |value| {
          let mut next = prefix.clone();
          next.push(value.clone());
          next
        })
      })
      .collect()
  })
}

/// Builds the class for one combination: the template's tests and default
/// attributes, with one attribute per axis bound to the combination's value.
pub fn synthesize(
  template: &TestTemplate,
  combination: &Combination,
  naming_rule: &NamingRule,
  module: &str,
) -> TestClass {
  let mut attributes: Attributes = template.attributes.clone();
  for (axis, value) in &combination.values {
    attributes.insert(axis.clone(), value.clone());
  }

  TestClass {
    name: naming_rule.class_name(&template.name, combination),
    module: module.to_string(),
    attributes: Arc::new(attributes),
    tests: template.tests.clone(),
  }
}

/// Attaches a `load_tests` hook that hides the given template classes.
///
/// Hooks already installed on the module keep running first, so a module
/// decorated several times hides every one of its templates.
pub fn install_test_discovery_hook(module: &mut TestModule, templates: &[String]) {
  let hidden: HashSet<String> = templates.iter().cloned().collect();
  let previous: Option<LoadTestsHook> = module.take_load_tests();

  let hook: LoadTestsHook = Arc::new(
    move |loader: &TestLoader, standard_tests: TestSuite, pattern: Option<&str>| {
      let mut suite = match &previous {
        Some(previous) => previous(loader, standard_tests, pattern),
        None => standard_tests,
      };
      suite.retain(|test| !hidden.contains(&test.class_name));
      suite
    },
  );
  module.set_load_tests(hook);
}

/// The cartesian expansion engine for one definition.
#[derive(Debug, Clone)]
pub struct Carteplex {
  definition: CarteplexDefinition,
}

impl Carteplex {
  pub fn new(definition: CarteplexDefinition) -> Result<Self, CarteplexError> {
    definition.validate()?;
    Ok(Carteplex { definition })
  }

  pub fn definition(&self) -> &CarteplexDefinition {
    &self.definition
  }

  pub fn naming_rule(&self) -> NamingRule {
    NamingRule {
      tag: self.definition.name_tag.clone(),
    }
  }

  /// Computes every combination allowed by the selections and `limits`.
  pub fn combinations(&self, limits: &[Limit]) -> Result<Vec<Combination>, CarteplexError> {
    let definition = &self.definition;
    check_len(definition.axis_names.len(), "limits", limits.len())?;

    let mut surviving_axes = Vec::new();
    let mut axes = Vec::new();
    for (((name, available), selection), limit) in definition
      .axis_names
      .iter()
      .zip(&definition.available_options)
      .zip(&definition.selections)
      .zip(limits)
    {
      let selected = resolve(selection, available);
      let limit = limit.as_ref().map(|limit| resolve(limit, available));

      match intersect(&selected, limit.as_deref()) {
        Some(values) => {
          tracing::debug!(axis = %name, ?values, "Axis values");
          surviving_axes.push(name.clone());
          axes.push(values);
        }
        None => tracing::debug!(axis = %name, "No limit given. Dropping axis."),
      }
    }

    Ok(
      product(&axes)
        .into_iter()
        .map(|values| Combination {
          values: surviving_axes.iter().cloned().zip(values).collect(),
        })
        .collect(),
    )
  }

  /// Expands `template` into classes without registering them.
  ///
  /// Errors if two combinations map to the same class name.
  pub fn expand(
    &self,
    template: &TestTemplate,
    limits: &[Limit],
    module: &str,
  ) -> Result<Vec<TestClass>, CarteplexError> {
    let naming_rule = self.naming_rule();
    let mut names = HashSet::new();
    let mut classes = Vec::new();

    for combination in self.combinations(limits)? {
      let class = synthesize(template, &combination, &naming_rule, module);
      if !names.insert(class.name.clone()) {
        return Err(CarteplexError::DuplicateName(class.name));
      }
      classes.push(class);
    }
    Ok(classes)
  }

  /// Decorates `template` into `module`.
  ///
  /// Registers one generated class per combination, removes the template
  /// from the module if it was registered, and installs the discovery hook.
  /// Returns the generated class names in generation order.
  ///
  /// When every axis is dropped the single generated class carries the
  /// template's own name, so it replaces the template and is not hidden.
  pub fn decorate(
    &self,
    module: &mut TestModule,
    template: &TestTemplate,
    limits: &[Limit],
  ) -> Result<Vec<String>, CarteplexError> {
    let span = tracing::info_span!("carteplex", template = %template.name);
    let _enter = span.enter();

    let classes = self.expand(template, limits, module.name())?;

    // Check the whole batch before touching the module.
    for class in &classes {
      if class.name != template.name && module.contains(&class.name) {
        return Err(CarteplexError::DuplicateName(class.name.clone()));
      }
    }

    if module.remove_class(&template.name).is_some() {
      tracing::debug!("Removed template class from module");
    }

    let mut names = Vec::with_capacity(classes.len());
    for class in classes {
      tracing::debug!(class = %class.name, attributes = ?class.attributes, "Generated class");
      names.push(class.name.clone());
      module.add_class(class)?;
    }

    let hidden: Vec<String> = if names.contains(&template.name) {
      Vec::new()
    } else {
      vec![template.name.clone()]
    };
    install_test_discovery_hook(module, &hidden);

    tracing::info!(count = names.len(), "Generated test classes");
    Ok(names)
  }
}
