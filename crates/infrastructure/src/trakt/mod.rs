//! Trakt `TrackingSource` adapter (§6).

pub mod client;
pub mod oauth;

pub use client::TraktClient;
pub use oauth::{DeviceCode, OAuthToken, TokenStore, TraktOAuth, TraktOAuthConfig};
