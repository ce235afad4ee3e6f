//! NZBGet client implementation for download management.
//!
//! Talks to NZBGet's JSON-RPC endpoint (`/jsonrpc`), authenticated with HTTP
//! basic auth. Covers the four operations the `Downloader` trait needs:
//! appending an NZB, listing the active queue, reading history, and deleting
//! a history entry.

use std::time::Duration;

use base64::Engine;
use momenarr_core::{
    circuit_breaker::{CircuitBreaker, CircuitBreakerConfig},
    AppendRequest, Downloader, HistoryItem, MomenarrError, QueueGroup, Result,
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

/// Configuration for the NZBGet client.
#[derive(Debug, Clone)]
pub struct NzbgetConfig {
    /// Base URL of the NZBGet web UI (e.g. "http://localhost:6789")
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout: u64,
}

impl Default for NzbgetConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:6789".to_string(),
            username: "nzbget".to_string(),
            password: String::new(),
            timeout: 30,
        }
    }
}

/// NZBGet client for managing downloads via JSON-RPC.
pub struct NzbgetClient {
    config: NzbgetConfig,
    client: Client,
    rpc_url: Url,
    circuit_breaker: CircuitBreaker,
}

#[derive(Serialize)]
struct RpcRequest {
    method: String,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcGroup {
    #[serde(rename = "NZBID")]
    nzb_id: i64,
    #[serde(rename = "NZBName")]
    nzb_name: String,
}

#[derive(Debug, Deserialize)]
struct RpcHistoryItem {
    #[serde(rename = "NZBID")]
    nzb_id: i64,
}

impl NzbgetClient {
    pub fn new(config: NzbgetConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| MomenarrError::ExternalService {
            service: "nzbget".to_string(),
            message: format!("invalid base URL: {e}"),
        })?;
        let rpc_url = base_url.join("jsonrpc").map_err(|e| MomenarrError::ExternalService {
            service: "nzbget".to_string(),
            message: format!("failed to construct RPC URL: {e}"),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| MomenarrError::ExternalService {
                service: "nzbget".to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;

        let circuit_breaker_config = CircuitBreakerConfig::new("nzbget")
            .with_failure_threshold(3)
            .with_timeout(Duration::from_secs(30))
            .with_request_timeout(Duration::from_secs(config.timeout))
            .with_success_threshold(1);

        Ok(Self {
            config,
            client,
            rpc_url,
            circuit_breaker: CircuitBreaker::new(circuit_breaker_config),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let request = RpcRequest {
            method: method.to_string(),
            params,
        };
        let username = self.config.username.clone();
        let password = self.config.password.clone();
        let url = self.rpc_url.clone();
        let client = self.client.clone();

        let response = self
            .circuit_breaker
            .call(async move {
                let response = client
                    .post(url)
                    .basic_auth(&username, Some(&password))
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| MomenarrError::Transient {
                        service: "nzbget".to_string(),
                        message: e.to_string(),
                    })?;

                if !response.status().is_success() {
                    let status = response.status();
                    return Err(MomenarrError::ExternalService {
                        service: "nzbget".to_string(),
                        message: format!("HTTP {status}"),
                    });
                }

                response
                    .json::<RpcResponse<T>>()
                    .await
                    .map_err(|e| MomenarrError::ExternalService {
                        service: "nzbget".to_string(),
                        message: format!("invalid JSON-RPC response: {e}"),
                    })
            })
            .await?;

        if let Some(error) = response.error {
            warn!(code = error.code, message = %error.message, "nzbget RPC error");
            return Err(MomenarrError::ExternalService {
                service: "nzbget".to_string(),
                message: format!("RPC error {}: {}", error.code, error.message),
            });
        }

        response.result.ok_or_else(|| MomenarrError::ExternalService {
            service: "nzbget".to_string(),
            message: "RPC response missing result".to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Downloader for NzbgetClient {
    async fn append(&self, req: AppendRequest) -> Result<i64> {
        let content_b64 = base64::engine::general_purpose::STANDARD.encode(&req.content);
        debug!(filename = %req.filename, category = %req.category, "submitting NZB to nzbget");

        let params = json!([
            req.filename,
            content_b64,
            req.category,
            0,
            false,
            false,
            "",
            0,
            req.dupe_mode,
            [["Trakt", req.trakt_id.to_string()]],
        ]);

        let nzb_id: i64 = self.call("append", params).await?;
        if nzb_id <= 0 {
            return Err(MomenarrError::ExternalService {
                service: "nzbget".to_string(),
                message: format!("append rejected, trakt_id={}", req.trakt_id),
            });
        }
        Ok(nzb_id)
    }

    async fn list_groups(&self) -> Result<Vec<QueueGroup>> {
        let groups: Vec<RpcGroup> = self.call("listgroups", json!([0])).await?;
        Ok(groups
            .into_iter()
            .map(|g| QueueGroup {
                nzb_id: g.nzb_id,
                nzb_name: g.nzb_name,
            })
            .collect())
    }

    async fn history(&self, include_hidden: bool) -> Result<Vec<HistoryItem>> {
        let items: Vec<RpcHistoryItem> = self.call("history", json!([include_hidden])).await?;
        Ok(items.into_iter().map(|i| HistoryItem { nzb_id: i.nzb_id }).collect())
    }

    async fn delete_from_history(&self, download_id: i64) -> Result<()> {
        let _: bool = self
            .call(
                "editqueue",
                json!(["HistoryDelete", "", [download_id]]),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_points_at_localhost() {
        let config = NzbgetConfig::default();
        assert_eq!(config.base_url, "http://localhost:6789");
        assert_eq!(config.username, "nzbget");
    }

    #[test]
    fn client_creation_rejects_invalid_url() {
        let config = NzbgetConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(NzbgetClient::new(config).is_err());
    }

    #[test]
    fn client_creation_builds_rpc_url() {
        let config = NzbgetConfig {
            base_url: "http://localhost:6789".to_string(),
            ..Default::default()
        };
        let client = NzbgetClient::new(config).unwrap();
        assert_eq!(client.rpc_url.as_str(), "http://localhost:6789/jsonrpc");
    }
}
