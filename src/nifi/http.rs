//! Thin JSON-over-HTTP helper shared by the canvas and registry clients.
//!
//! All remote calls are synchronous and unretried; any transport or decode
//! failure surfaces as an [`ApiError`] naming the method and path.

use crate::error::ApiError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use ureq::Agent;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) struct JsonEndpoint {
    agent: Agent,
    base_url: String,
}

impl JsonEndpoint {
    pub(crate) fn new(base_url: &str) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Probe the endpoint; any successful HTTP exchange counts as up.
    pub(crate) fn is_up(&self, probe_path: &str) -> bool {
        self.agent.get(&self.url(probe_path)).call().is_ok()
    }

    pub(crate) fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut response = self
            .agent
            .get(&url)
            .call()
            .map_err(|err| ApiError::transport(format!("GET {url}"), err))?;
        response
            .body_mut()
            .read_json::<T>()
            .map_err(|err| ApiError::transport(format!("decode GET {url}"), err))
    }

    pub(crate) fn get_json_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut request = self.agent.get(&url);
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        let mut response = request
            .call()
            .map_err(|err| ApiError::transport(format!("GET {url}"), err))?;
        response
            .body_mut()
            .read_json::<T>()
            .map_err(|err| ApiError::transport(format!("decode GET {url}"), err))
    }

    pub(crate) fn get_text(&self, path: &str) -> Result<String, ApiError> {
        let url = self.url(path);
        let mut response = self
            .agent
            .get(&url)
            .call()
            .map_err(|err| ApiError::transport(format!("GET {url}"), err))?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|err| ApiError::transport(format!("read GET {url}"), err))
    }

    pub(crate) fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut response = self
            .agent
            .post(&url)
            .send_json(body)
            .map_err(|err| ApiError::transport(format!("POST {url}"), err))?;
        response
            .body_mut()
            .read_json::<T>()
            .map_err(|err| ApiError::transport(format!("decode POST {url}"), err))
    }

    pub(crate) fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        self.agent
            .delete(&url)
            .call()
            .map_err(|err| ApiError::transport(format!("DELETE {url}"), err))?;
        Ok(())
    }
}
