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

//! Thin REST helpers.
//!
//! Request bodies are form-urlencoded. HTTP error statuses are returned as
//! data in a [`RestResponse`]; only transport failures are errors.

use crate::error::RestError;
use reqwest::Client;
use reqwest::Method;
use serde::Serialize;
use std::time::Duration;

/// Result of a REST call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestResponse {
  /// Zero on success, the HTTP status code otherwise.
  pub retcode: u16,
  pub output: Option<String>,
  pub error: Option<String>,
}

impl RestResponse {
  pub fn success(&self) -> bool {
    self.retcode == 0
  }
}

#[derive(Debug, Clone)]
pub struct RestClient {
  client: Client,
}

impl RestClient {
  pub fn new() -> Result<Self, RestError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(60))
      .build()
      .map_err(RestError::Client)?;
    Ok(RestClient { client })
  }

  pub async fn get(&self, url: &str) -> Result<RestResponse, RestError> {
    self.send(Method::GET, url, None::<&()>).await
  }

  pub async fn post<T: Serialize + ?Sized>(
    &self,
    url: &str,
    data: &T,
  ) -> Result<RestResponse, RestError> {
    self.send(Method::POST, url, Some(data)).await
  }

  pub async fn put<T: Serialize + ?Sized>(
    &self,
    url: &str,
    data: &T,
  ) -> Result<RestResponse, RestError> {
    self.send(Method::PUT, url, Some(data)).await
  }

  pub async fn delete<T: Serialize + ?Sized>(
    &self,
    url: &str,
    data: &T,
  ) -> Result<RestResponse, RestError> {
    self.send(Method::DELETE, url, Some(data)).await
  }

  async fn send<T: Serialize + ?Sized>(
    &self,
    method: Method,
    url: &str,
    data: Option<&T>,
  ) -> Result<RestResponse, RestError> {
    tracing::debug!(%method, url, "REST request");
    let request_error = |source| RestError::Request {
      url: url.to_string(),
      source,
    };

    let mut request = self.client.request(method, url);
    if let Some(data) = data {
      request = request.form(data);
    }

    let response = request.send().await.map_err(request_error)?;
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
      let reason = status
        .canonical_reason()
        .unwrap_or("Unknown Error")
        .to_string();
      tracing::debug!(code = status.as_u16(), %reason, "REST request failed");
      return Ok(RestResponse {
        retcode: status.as_u16(),
        output: None,
        error: Some(reason),
      });
    }

    let output = response.text().await.map_err(request_error)?;
    Ok(RestResponse {
      retcode: 0,
      output: Some(output),
      error: None,
    })
  }
}
