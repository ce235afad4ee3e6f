//! Trakt OAuth: device-code bootstrap, client-secret refresh, and the
//! on-disk token file (§6: `token.json` under `DataDir`).

use chrono::{DateTime, Utc};
use momenarr_core::{MomenarrError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

/// A device-code challenge the user must complete in a browser.
#[derive(Debug, Clone)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    pub expires_in: i64,
    pub interval: i64,
}

/// Persisted OAuth token, stored as `token.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl OAuthToken {
    /// True once within five minutes of expiry, so refresh happens ahead of use.
    pub fn needs_refresh(&self) -> bool {
        self.expires_at - Utc::now() < chrono::Duration::minutes(5)
    }
}

/// Loads/saves the single token file. Permissions are tightened to
/// owner-read/write on save (§6 recommends 0600).
pub struct TokenStore {
    path: String,
}

impl TokenStore {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub async fn load(&self) -> Result<Option<OAuthToken>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let token = serde_json::from_slice(&bytes).map_err(|e| MomenarrError::Configuration {
                    field: "token.json".to_string(),
                    message: format!("malformed token file: {e}"),
                })?;
                Ok(Some(token))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, token: &OAuthToken) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(token).map_err(|e| MomenarrError::Configuration {
            field: "token.json".to_string(),
            message: format!("failed to serialize token: {e}"),
        })?;
        tokio::fs::write(&self.path, bytes).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, permissions)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TraktOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Trakt device-flow/refresh OAuth client.
pub struct TraktOAuth {
    client: Client,
    config: TraktOAuthConfig,
    base_url: String,
}

impl TraktOAuth {
    pub fn new(config: TraktOAuthConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            base_url: "https://api.trakt.tv".to_string(),
        }
    }

    pub async fn initiate_device_flow(&self) -> Result<DeviceCode> {
        let url = format!("{}/oauth/device/code", self.base_url);
        info!("initiating Trakt device flow authentication");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "client_id": self.config.client_id }))
            .send()
            .await
            .map_err(|e| MomenarrError::Transient {
                service: "trakt".to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(MomenarrError::ExternalService {
                service: "trakt".to_string(),
                message: format!("device code request failed: HTTP {status}"),
            });
        }

        let body: DeviceCodeResponse = response.json().await.map_err(|e| MomenarrError::ExternalService {
            service: "trakt".to_string(),
            message: e.to_string(),
        })?;

        info!(user_code = %body.user_code, url = %body.verification_url, "device code issued");

        Ok(DeviceCode {
            device_code: body.device_code,
            user_code: body.user_code,
            verification_url: body.verification_url,
            expires_in: body.expires_in,
            interval: body.interval,
        })
    }

    async fn poll_once(&self, device_code: &str) -> Result<Option<OAuthToken>> {
        let url = format!("{}/oauth/device/token", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "code": device_code,
                "client_id": self.config.client_id,
                "client_secret": self.config.client_secret,
            }))
            .send()
            .await
            .map_err(|e| MomenarrError::Transient {
                service: "trakt".to_string(),
                message: e.to_string(),
            })?;

        match response.status().as_u16() {
            200 => {
                let body: TokenResponse = response.json().await.map_err(|e| MomenarrError::ExternalService {
                    service: "trakt".to_string(),
                    message: e.to_string(),
                })?;
                Ok(Some(token_response_to_oauth(body)))
            }
            400 => {
                debug!("trakt device flow: authorization pending");
                Ok(None)
            }
            404 => Err(MomenarrError::ExternalService {
                service: "trakt".to_string(),
                message: "invalid or expired device code".to_string(),
            }),
            409 => Err(MomenarrError::ExternalService {
                service: "trakt".to_string(),
                message: "device code already used".to_string(),
            }),
            410 => Err(MomenarrError::ExternalService {
                service: "trakt".to_string(),
                message: "device code expired".to_string(),
            }),
            418 => Err(MomenarrError::ExternalService {
                service: "trakt".to_string(),
                message: "user denied authorization".to_string(),
            }),
            429 => {
                warn!("trakt device flow: rate limited, slowing down");
                Ok(None)
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(MomenarrError::ExternalService {
                    service: "trakt".to_string(),
                    message: format!("unexpected status {status}: {text}"),
                })
            }
        }
    }

    /// Poll until the user authorizes, the code expires, or a fatal status arrives.
    pub async fn poll_for_token(&self, device: &DeviceCode) -> Result<OAuthToken> {
        let deadline = Utc::now() + chrono::Duration::seconds(device.expires_in);
        let interval = Duration::from_secs(device.interval.max(1) as u64);

        info!(interval_secs = device.interval, "polling Trakt for device authorization");

        while Utc::now() < deadline {
            if let Some(token) = self.poll_once(&device.device_code).await? {
                info!("obtained Trakt access token via device flow");
                return Ok(token);
            }
            sleep(interval).await;
        }

        Err(MomenarrError::ExternalService {
            service: "trakt".to_string(),
            message: "device code expired before user authorization".to_string(),
        })
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> Result<OAuthToken> {
        let url = format!("{}/oauth/token", self.base_url);
        info!("refreshing Trakt access token");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "refresh_token": refresh_token,
                "client_id": self.config.client_id,
                "client_secret": self.config.client_secret,
                "redirect_uri": "urn:ietf:wg:oauth:2.0:oob",
                "grant_type": "refresh_token",
            }))
            .send()
            .await
            .map_err(|e| MomenarrError::Transient {
                service: "trakt".to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            error!(%status, "trakt token refresh failed");
            return Err(MomenarrError::ExternalService {
                service: "trakt".to_string(),
                message: format!("token refresh failed: HTTP {status}"),
            });
        }

        let body: TokenResponse = response.json().await.map_err(|e| MomenarrError::ExternalService {
            service: "trakt".to_string(),
            message: e.to_string(),
        })?;
        Ok(token_response_to_oauth(body))
    }
}

fn token_response_to_oauth(body: TokenResponse) -> OAuthToken {
    let issued_at = DateTime::<Utc>::from_timestamp(body.created_at, 0).unwrap_or_else(Utc::now);
    OAuthToken {
        access_token: body.access_token,
        refresh_token: body.refresh_token,
        token_type: body.token_type,
        expires_at: issued_at + chrono::Duration::seconds(body.expires_in),
    }
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_url: String,
    expires_in: i64,
    interval: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: i64,
    refresh_token: String,
    created_at: i64,
}
