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
use assert_cmd::cargo;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

fn glusto() -> Command {
  let mut cmd = Command::new(cargo::cargo_bin!("glusto"));
  cmd
    .env_remove("GLUSTO_LOG_FILE")
    .env_remove("GLUSTO_CONFIG_FILES")
    .env_remove("RUST_LOG")
    .env("CLICOLOR", "0");
  cmd
}

#[test]
fn test_config_merges_files_in_order() {
  let temp = tempdir().unwrap();
  let base = temp.path().join("base.yml");
  let overlay = temp.path().join("overlay.json");
  fs::write(&base, "nodes:\n- server1\n- server2\nvolume: testvol\n").unwrap();
  fs::write(&overlay, r#"{"volume": "othervol"}"#).unwrap();

  glusto()
    .arg("-c")
    .arg(&base)
    .arg("--config")
    .arg(&overlay)
    .arg("config")
    .assert()
    .success()
    .stdout(predicate::str::contains("- server1"))
    .stdout(predicate::str::contains("volume: othervol"))
    .stdout(predicate::str::contains("testvol").not());
}

#[test]
fn test_missing_config_file_fails() {
  glusto()
    .args(["-c", "does_not_exist.yml", "config"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load config files"));
}

#[test]
fn test_carteplex_lists_generated_classes() {
  let temp = tempdir().unwrap();
  let definition = temp.path().join("definition.yml");
  fs::write(
    &definition,
    "axis_names: [color, size]\n\
     available_options: [[red, blue], [S, M]]\n\
     selections: [ALL, ALL]\n",
  )
  .unwrap();

  let assert = glusto()
    .arg("carteplex")
    .arg(&definition)
    .args(["--template", "T"])
    .assert()
    .success();

  let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
  let lines: Vec<&str> = stdout.lines().collect();
  assert_eq!(
    lines,
    [
      r#"{"name":"T_red_S","attributes":{"color":"red","size":"S"}}"#,
      r#"{"name":"T_red_M","attributes":{"color":"red","size":"M"}}"#,
      r#"{"name":"T_blue_S","attributes":{"color":"blue","size":"S"}}"#,
      r#"{"name":"T_blue_M","attributes":{"color":"blue","size":"M"}}"#,
    ]
  );
}

#[test]
fn test_carteplex_limits_from_config_drop_axes() {
  let temp = tempdir().unwrap();
  let definition = temp.path().join("definition.yml");
  let config = temp.path().join("limits.yml");
  fs::write(
    &definition,
    "axis_names: [color, size]\n\
     available_options: [[red, blue], [S, M]]\n\
     selections: [ALL, ALL]\n",
  )
  .unwrap();
  fs::write(&config, "limits:\n- [red]\n- null\n").unwrap();

  glusto()
    .arg("-c")
    .arg(&config)
    .arg("carteplex")
    .arg(&definition)
    .assert()
    .success()
    .stdout(concat!(r#"{"name":"Test_red","attributes":{"color":"red"}}"#, "\n"));
}

#[test]
fn test_run_local_command() {
  glusto()
    .args(["run", "echo", "hello", "world"])
    .assert()
    .success()
    .stdout("hello world\n")
    .stderr(predicate::str::contains("local: echo hello world"));
}

#[test]
fn test_run_propagates_exit_code() {
  glusto()
    .args(["run", "--host", "local", "echo failing >&2; exit 3"])
    .assert()
    .code(3)
    .stderr(predicate::str::contains("failing"));
}

#[test]
fn test_render_template_from_config_vars() {
  let temp = tempdir().unwrap();
  let template = temp.path().join("hosts.jinja");
  let config = temp.path().join("vars.yml");
  let output = temp.path().join("hosts.txt");
  fs::write(&template, "{% for n in nodes %}{{ n }} {% endfor %}").unwrap();
  fs::write(&config, "nodes: [server1, server2]\n").unwrap();

  glusto()
    .arg("-c")
    .arg(&config)
    .args(["render", "hosts.jinja", "--search-path"])
    .arg(temp.path())
    .arg("--output")
    .arg(&output)
    .assert()
    .success();

  assert_eq!(fs::read_to_string(&output).unwrap(), "server1 server2 ");
}
