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
use crate::error::TemplateError;
use minijinja::Environment;
use minijinja::path_loader;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Renders `template_name` from `search_path` into `output_file`.
///
/// Templates are resolved relative to `search_path`, so `{% include %}` and
/// `{% extends %}` work between files there. Returns the rendered text.
pub fn render_template<T: Serialize + ?Sized>(
  template_name: &str,
  vars: &T,
  output_file: &Path,
  search_path: &Path,
) -> Result<String, TemplateError> {
  let render_error = |source| TemplateError::Render {
    name: template_name.to_string(),
    source,
  };

  let mut env = Environment::new();
  env.set_loader(path_loader(search_path));

  let template = env.get_template(template_name).map_err(render_error)?;
  let output = template.render(vars).map_err(render_error)?;

  fs::write(output_file, &output).map_err(|source| TemplateError::Write {
    path: output_file.to_path_buf(),
    source,
  })?;

  tracing::debug!(
    template = template_name,
    output = %output_file.display(),
    "Rendered template"
  );
  Ok(output)
}
