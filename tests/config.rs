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
use glusto::config::Settings;
use glusto::connection::SshOptions;
use serde_json::json;
use std::path::PathBuf;

#[test]
fn test_defaults_without_config() {
  let settings = Settings::resolve(&json!({})).unwrap();
  assert_eq!(settings.user, "root");
  assert_eq!(settings.ssh_port, 22);
  assert!(settings.use_controlpersist);
  assert_eq!(settings.log_level, "INFO");
}

#[test]
fn test_config_values_override_defaults() {
  let config = json!({
    "user": "admin",
    "ssh_port": 2222,
    "use_controlpersist": false,
    "ssh_keyfile": "/root/.ssh/test_key",
    "nodes": ["server1"],
  });
  let settings = Settings::resolve(&config).unwrap();
  assert_eq!(settings.user, "admin");
  assert_eq!(settings.ssh_keyfile, Some(PathBuf::from("/root/.ssh/test_key")));

  let options = SshOptions::from(&settings);
  assert_eq!(options.default_user, "admin");
  assert!(options.ssh_args().contains(&"-oPort=2222".to_string()));
  assert!(options.ssh_args().contains(&"-oIdentityFile=/root/.ssh/test_key".to_string()));
}

#[test]
fn test_non_mapping_config_is_ignored() {
  let settings = Settings::resolve(&json!([["a", "b"]])).unwrap();
  assert_eq!(settings, Settings::default());
}

#[test]
fn test_bad_setting_type_is_an_error() {
  assert!(Settings::resolve(&json!({ "ssh_port": "not a port" })).is_err());
}
