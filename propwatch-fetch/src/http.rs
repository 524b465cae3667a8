//! HTTP helpers for source adapters
//!
//! Builds the shared client and reads bodies with a hard size limit, so a
//! misbehaving provider cannot balloon memory.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::FetchError;

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent sent to every provider
    pub user_agent: String,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("propwatch/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout_secs: 10,
        }
    }
}

/// Create the HTTP client shared by all adapters.
///
/// Overall request deadlines are enforced per attempt by the pipeline, not
/// by the client.
pub fn create_client(config: &HttpConfig) -> Result<Client, FetchError> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(2)
        .build()
        .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {}", e)))
}

/// GET `url` and return the body as text, rejecting bodies over `max_bytes`
pub async fn get_text(client: &Client, url: &str, max_bytes: u64) -> Result<String, FetchError> {
    debug!("GET {}", url);

    let mut response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(FetchError::TooLarge {
                size: len,
                limit: max_bytes,
            });
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        body.extend_from_slice(&chunk);
        check_size(body.len() as u64, max_bytes)?;
    }

    String::from_utf8(body).map_err(|e| FetchError::validation(format!("body is not UTF-8: {}", e)))
}

/// GET `url` and deserialize a JSON body
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    max_bytes: u64,
) -> Result<T, FetchError> {
    let text = get_text(client, url, max_bytes).await?;
    Ok(serde_json::from_str(&text)?)
}

fn check_size(size: u64, limit: u64) -> Result<(), FetchError> {
    if size > limit {
        return Err(FetchError::TooLarge { size, limit });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpConfig::default();
        assert!(config.user_agent.starts_with("propwatch/"));
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn test_create_client() {
        assert!(create_client(&HttpConfig::default()).is_ok());
    }

    #[test]
    fn test_check_size() {
        assert!(check_size(10, 10).is_ok());
        assert!(matches!(
            check_size(11, 10),
            Err(FetchError::TooLarge { size: 11, limit: 10 })
        ));
    }
}
