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
use fs_extra::dir::CopyOptions;
use fs_extra::dir::copy;
use glusto::error::TemplateError;
use glusto::template::render_template;
use serde_json::json;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_render_with_include_and_loop() {
  // Copy our ./tests/fixtures/templates dir into a temp dir
  let temp = tempdir().unwrap();
  copy("tests/fixtures/templates", temp.path(), &CopyOptions::new()).unwrap();
  let search_path = temp.path().join("templates");
  let output_file = temp.path().join("volume.txt");

  let vars = json!({ "title": "testvol", "nodes": ["server1", "server2"] });
  let rendered = render_template("volume.jinja", &vars, &output_file, &search_path).unwrap();

  assert_eq!(rendered, "# testvol\nnode: server1\nnode: server2\n");
  assert_eq!(fs::read_to_string(&output_file).unwrap(), rendered);
}

#[test]
fn test_missing_template_is_an_error() {
  let temp = tempdir().unwrap();
  let err = render_template(
    "absent.jinja",
    &json!({}),
    &temp.path().join("out.txt"),
    temp.path(),
  )
  .unwrap_err();

  assert!(matches!(err, TemplateError::Render { ref name, .. } if name == "absent.jinja"));
  assert!(!temp.path().join("out.txt").exists());
}
