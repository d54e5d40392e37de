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

//! An explicit test registry.
//!
//! Test modules hold an ordered list of named test classes. A class carries
//! string attributes (the axis values a carteplex expansion binds) and a list
//! of named test functions. A [`TestLoader`] flattens a module into a
//! [`TestSuite`] of cases with ids of the form `module.Class.test`, passing
//! them through the module's `load_tests` hook when one is installed.

use crate::error::DiscoveryError;
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Class-level attributes, keyed by name.
pub type Attributes = BTreeMap<String, String>;

/// A test function. It receives the context of the class it runs in.
pub type TestFn = Arc<dyn Fn(&TestContext) -> anyhow::Result<()> + Send + Sync>;

/// The `load_tests(loader, standard_tests, pattern)` hook.
pub type LoadTestsHook =
  Arc<dyn Fn(&TestLoader, TestSuite, Option<&str>) -> TestSuite + Send + Sync>;

/// What a running test sees of its class.
#[derive(Debug, Clone)]
pub struct TestContext {
  pub class_name: String,
  pub test_name: String,
  pub attributes: Arc<Attributes>,
}

impl TestContext {
  pub fn attr(&self, name: &str) -> Option<&str> {
    self.attributes.get(name).map(String::as_str)
  }
}

/// A blueprint class. Carteplex clones it once per combination.
#[derive(Clone)]
pub struct TestTemplate {
  pub name: String,
  pub attributes: Attributes,
  pub tests: Vec<(String, TestFn)>,
}

impl TestTemplate {
  pub fn new(name: impl Into<String>) -> Self {
    TestTemplate {
      name: name.into(),
      attributes: Attributes::new(),
      tests: Vec::new(),
    }
  }

  /// Sets a default attribute value.
  pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.attributes.insert(name.into(), value.into());
    self
  }

  pub fn test<F>(mut self, name: impl Into<String>, test: F) -> Self
  where
    F: Fn(&TestContext) -> anyhow::Result<()> + Send + Sync + 'static,
  {
    self.tests.push((name.into(), Arc::new(test)));
    self
  }

  /// Turns the template into a plain, undecorated class.
  pub fn into_class(self, module: &str) -> TestClass {
    TestClass {
      name: self.name,
      module: module.to_string(),
      attributes: Arc::new(self.attributes),
      tests: self.tests,
    }
  }
}

impl fmt::Debug for TestTemplate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TestTemplate")
      .field("name", &self.name)
      .field("attributes", &self.attributes)
      .field("tests", &test_names(&self.tests))
      .finish()
  }
}

/// A registered, runnable class.
#[derive(Clone)]
pub struct TestClass {
  pub name: String,
  pub module: String,
  pub attributes: Arc<Attributes>,
  pub tests: Vec<(String, TestFn)>,
}

impl TestClass {
  pub fn attr(&self, name: &str) -> Option<&str> {
    self.attributes.get(name).map(String::as_str)
  }
}

impl fmt::Debug for TestClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TestClass")
      .field("name", &self.name)
      .field("module", &self.module)
      .field("attributes", &self.attributes)
      .field("tests", &test_names(&self.tests))
      .finish()
  }
}

fn test_names(tests: &[(String, TestFn)]) -> Vec<&str> {
  tests.iter().map(|(name, _)| name.as_str()).collect()
}

/// A module's symbol table of test classes.
pub struct TestModule {
  name: String,
  classes: Vec<TestClass>,
  load_tests: Option<LoadTestsHook>,
}

impl TestModule {
  pub fn new(name: impl Into<String>) -> Self {
    TestModule {
      name: name.into(),
      classes: Vec::new(),
      load_tests: None,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn classes(&self) -> &[TestClass] {
    &self.classes
  }

  pub fn class(&self, name: &str) -> Option<&TestClass> {
    self.classes.iter().find(|class| class.name == name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.class(name).is_some()
  }

  /// Registers a class. Names are unique within a module.
  pub fn add_class(&mut self, mut class: TestClass) -> Result<(), DiscoveryError> {
    if self.contains(&class.name) {
      return Err(DiscoveryError::DuplicateClass {
        module: self.name.clone(),
        class: class.name,
      });
    }
    class.module = self.name.clone();
    self.classes.push(class);
    Ok(())
  }

  /// Removes a class, returning it if it was registered.
  pub fn remove_class(&mut self, name: &str) -> Option<TestClass> {
    let index = self.classes.iter().position(|class| class.name == name)?;
    Some(self.classes.remove(index))
  }

  pub fn set_load_tests(&mut self, hook: LoadTestsHook) {
    self.load_tests = Some(hook);
  }

  pub fn take_load_tests(&mut self) -> Option<LoadTestsHook> {
    self.load_tests.take()
  }

  pub fn has_load_tests(&self) -> bool {
    self.load_tests.is_some()
  }
}

impl fmt::Debug for TestModule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TestModule")
      .field("name", &self.name)
      .field("classes", &self.classes)
      .field("load_tests", &self.load_tests.is_some())
      .finish()
  }
}

/// One runnable test: a test function bound to its class.
#[derive(Clone)]
pub struct TestCase {
  pub id: String,
  pub class_name: String,
  pub test_name: String,
  pub attributes: Arc<Attributes>,
  test: TestFn,
}

impl TestCase {
  fn context(&self) -> TestContext {
    TestContext {
      class_name: self.class_name.clone(),
      test_name: self.test_name.clone(),
      attributes: Arc::clone(&self.attributes),
    }
  }

  pub fn run(&self) -> anyhow::Result<()> {
    (self.test)(&self.context())
  }
}

impl fmt::Debug for TestCase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TestCase")
      .field("id", &self.id)
      .field("attributes", &self.attributes)
      .finish()
  }
}

/// An ordered collection of test cases.
#[derive(Debug, Clone, Default)]
pub struct TestSuite {
  tests: Vec<TestCase>,
}

/// Outcome of running a suite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteReport {
  pub passed: Vec<String>,
  pub failed: Vec<(String, String)>,
}

impl SuiteReport {
  pub fn was_successful(&self) -> bool {
    self.failed.is_empty()
  }
}

impl TestSuite {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_test(&mut self, test: TestCase) {
    self.tests.push(test);
  }

  pub fn add_tests(&mut self, tests: impl IntoIterator<Item = TestCase>) {
    self.tests.extend(tests);
  }

  /// Keeps only the cases for which `keep` returns true.
  pub fn retain(&mut self, keep: impl FnMut(&TestCase) -> bool) {
    self.tests.retain(keep);
  }

  pub fn tests(&self) -> &[TestCase] {
    &self.tests
  }

  pub fn ids(&self) -> Vec<&str> {
    self.tests.iter().map(|test| test.id.as_str()).collect()
  }

  pub fn len(&self) -> usize {
    self.tests.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tests.is_empty()
  }

  /// Runs every case in order.
  pub fn run(&self) -> SuiteReport {
    let mut report = SuiteReport::default();
    for test in &self.tests {
      let span = tracing::info_span!("test", id = %test.id);
      let _enter = span.enter();
      match test.run() {
        Ok(()) => {
          tracing::info!("ok");
          report.passed.push(test.id.clone());
        }
        Err(e) => {
          tracing::error!(error = %e, "FAIL");
          report.failed.push((test.id.clone(), format!("{:#}", e)));
        }
      }
    }
    tracing::info!(
      passed = report.passed.len(),
      failed = report.failed.len(),
      "Suite complete"
    );
    report
  }
}

impl IntoIterator for TestSuite {
  type Item = TestCase;
  type IntoIter = std::vec::IntoIter<TestCase>;

  fn into_iter(self) -> Self::IntoIter {
    self.tests.into_iter()
  }
}

/// Builds suites from modules.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestLoader;

impl TestLoader {
  pub fn new() -> Self {
    TestLoader
  }

  /// Every test of every class in registration order.
  pub fn standard_tests(&self, module: &TestModule) -> TestSuite {
    let mut suite = TestSuite::new();
    for class in &module.classes {
      for (test_name, test) in &class.tests {
        suite.add_test(TestCase {
          id: format!("{}.{}.{}", module.name, class.name, test_name),
          class_name: class.name.clone(),
          test_name: test_name.clone(),
          attributes: Arc::clone(&class.attributes),
          test: Arc::clone(test),
        });
      }
    }
    suite
  }

  /// Discovers a module's tests.
  ///
  /// `pattern` keeps only cases whose id contains it. When the module has a
  /// `load_tests` hook, the standard suite is handed to it and its result
  /// is what gets discovered.
  pub fn load_tests_from_module(&self, module: &TestModule, pattern: Option<&str>) -> TestSuite {
    let mut standard_tests = self.standard_tests(module);
    if let Some(pattern) = pattern {
      standard_tests.retain(|test| test.id.contains(pattern));
    }

    match &module.load_tests {
      Some(hook) => hook(self, standard_tests, pattern),
      None => standard_tests,
    }
  }

  /// Builds a suite with the `ordered` ids first, in the given order,
  /// followed by every remaining test of the module.
  pub fn load_tests_ordered(
    &self,
    module: &TestModule,
    ordered: &[&str],
  ) -> Result<TestSuite, DiscoveryError> {
    let all = self.load_tests_from_module(module, None);
    let mut suite = TestSuite::new();

    for id in ordered {
      let test = all
        .tests
        .iter()
        .find(|test| test.id == *id)
        .ok_or_else(|| DiscoveryError::UnknownTest(id.to_string()))?;
      suite.add_test(test.clone());
    }

    let ordered: HashSet<&str> = ordered.iter().copied().collect();
    suite.add_tests(
      all
        .into_iter()
        .filter(|test| !ordered.contains(test.id.as_str())),
    );
    Ok(suite)
  }
}
