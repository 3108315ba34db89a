//! HTTP client for the orchestrator API.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::settings::SettingsStore;

/// Maximum object size accepted from the content store (256 MB).
const MAX_BODY_SIZE: u64 = 256 * 1024 * 1024;

const USER_AGENT: &str = concat!("converge/", env!("CARGO_PKG_VERSION"));

/// Blocking orchestrator client.
///
/// # Example
///
/// ```no_run
/// use orchestrator::{Client, SettingsStore};
/// use std::time::Duration;
///
/// let client = Client::new("http://orchestrator:8888", Duration::from_secs(30));
/// let value = client.get("dev", "autostart_agent_map").unwrap();
/// println!("{value:?}");
/// ```
pub struct Client {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// API base URL, without trailing slash.
    base_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SettingBody {
    value: Value,
}

impl Client {
    /// Create a client with a global per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get the API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn setting_url(&self, environment: &str, key: &str) -> String {
        format!(
            "{}/api/v1/environments/{}/settings/{}",
            self.base_url, environment, key
        )
    }

    fn file_url(&self, hash: &str) -> String {
        format!("{}/api/v1/file/{}", self.base_url, hash)
    }
}

impl SettingsStore for Client {
    fn get(&self, environment: &str, key: &str) -> Result<Option<Value>> {
        let url = self.setting_url(environment, key);
        log::debug!("GET {url}");
        let result = self
            .agent
            .get(&url)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .call();
        match result {
            Ok(mut response) => {
                let body: SettingBody = response.body_mut().read_json()?;
                Ok(Some(body.value))
            }
            Err(ureq::Error::StatusCode(404)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, environment: &str, key: &str, value: Value) -> Result<()> {
        let url = self.setting_url(environment, key);
        log::debug!("POST {url}");
        self.agent
            .post(&url)
            .header("User-Agent", USER_AGENT)
            .send_json(&SettingBody { value })?;
        Ok(())
    }
}

impl blobstore::ContentStore for Client {
    fn exists(&self, hash: &str) -> blobstore::Result<bool> {
        blobstore::validate_hash(hash)?;
        let url = self.file_url(hash);
        match self.agent.head(&url).header("User-Agent", USER_AGENT).call() {
            Ok(_) => Ok(true),
            Err(ureq::Error::StatusCode(404)) => Ok(false),
            Err(e) => Err(remote(e)),
        }
    }

    fn upload(&self, content: &[u8]) -> blobstore::Result<String> {
        let hash = blobstore::hash_content(content);
        let url = self.file_url(&hash);
        log::debug!("PUT {url} ({} bytes)", content.len());
        self.agent
            .put(&url)
            .header("Content-Type", "application/octet-stream")
            .header("User-Agent", USER_AGENT)
            .send(content)
            .map_err(remote)?;
        Ok(hash)
    }

    fn download(&self, hash: &str) -> blobstore::Result<Vec<u8>> {
        blobstore::validate_hash(hash)?;
        let url = self.file_url(hash);
        log::debug!("GET {url}");
        let mut response = match self
            .agent
            .get(&url)
            .header("Accept", "application/octet-stream")
            .header("User-Agent", USER_AGENT)
            .call()
        {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(blobstore::Error::NotFound(hash.to_string()));
            }
            Err(e) => return Err(remote(e)),
        };
        response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_SIZE)
            .read_to_vec()
            .map_err(remote)
    }
}

fn remote(err: ureq::Error) -> blobstore::Error {
    blobstore::Error::Remote(Error::from(err).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let client = Client::new("http://localhost:8888/", Duration::from_secs(1));
        assert_eq!(client.base_url(), "http://localhost:8888");
        assert_eq!(
            client.setting_url("dev", "autostart_agent_map"),
            "http://localhost:8888/api/v1/environments/dev/settings/autostart_agent_map"
        );
        assert_eq!(
            client.file_url("da39a3ee5e6b4b0d3255bfef95601890afd80709"),
            "http://localhost:8888/api/v1/file/da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }

    #[test]
    fn test_setting_body_shape() {
        let body = SettingBody {
            value: serde_json::json!({"worker1": "local:"}),
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"value":{"worker1":"local:"}}"#
        );
    }
}
