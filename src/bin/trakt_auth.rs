//! Interactive bootstrap for Trakt's device-code OAuth flow (§6). Run once
//! before starting `momenarr`; writes `token.json` into `DataDir` so the
//! main binary can load it at startup instead of failing with
//! `AuthenticationRequired`.

use clap::Parser;
use momenarr_infrastructure::trakt::oauth::{TokenStore, TraktOAuth, TraktOAuthConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Trakt Client ID (or set TRAKT_API_KEY env var)
    #[arg(long, env = "TRAKT_API_KEY")]
    client_id: String,

    /// Trakt Client Secret (or set TRAKT_CLIENT_SECRET env var)
    #[arg(long, env = "TRAKT_CLIENT_SECRET")]
    client_secret: String,

    /// Directory the token file is written into (or set DATA_DIR env var)
    #[arg(long, env = "DATA_DIR", default_value = ".")]
    data_dir: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("initiating Trakt device authorization flow");
    let oauth = TraktOAuth::new(TraktOAuthConfig {
        client_id: args.client_id,
        client_secret: args.client_secret,
    });

    let device_code = oauth.initiate_device_flow().await?;

    println!("\n===========================================");
    println!("TRAKT AUTHORIZATION REQUIRED");
    println!("===========================================");
    println!(
        "\n1. Visit this URL in your browser:\n   {}",
        device_code.verification_url
    );
    println!("\n2. Enter this code: {}", device_code.user_code);
    println!("\n3. Authorize the application");
    println!(
        "\nWaiting for authorization (expires in {} seconds)...\n",
        device_code.expires_in
    );

    match oauth.poll_for_token(&device_code).await {
        Ok(token) => {
            let token_path = format!("{}/token.json", args.data_dir.trim_end_matches('/'));
            TokenStore::new(&token_path).save(&token).await?;
            println!("\nAuthorization successful, token saved to {token_path}");
            println!("You can now start the momenarr binary.");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Trakt authorization failed");
            println!("\nAuthorization failed: {e}");
            Err(e.into())
        }
    }
}
