//! Configuration module for handling environment variables and .env files

use crate::client::{Client, RuqqusClientError};
use crate::token::Token;
use dotenv::dotenv;
use log::{info, warn};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Application configuration derived from environment variables and .env file
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    // Ruqqus application credentials
    pub client_id: Option<String>,
    pub client_secret: Option<String>,

    // One-time authorization code for the first token grant
    pub auth_code: Option<String>,

    // Where the token is persisted between runs
    pub token_file: Option<PathBuf>,

    // Port for the localhost OAuth redirect listener
    pub oauth_port: Option<u16>,

    // Imgur client ID for proxied image uploads
    pub imgur_client_id: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn load() -> Self {
        // Try to load .env file, but continue even if it doesn't exist
        match dotenv() {
            Ok(_) => info!("Loaded environment from .env file"),
            Err(_) => info!("No .env file found, using system environment variables only"),
        }

        let mut config = Self::default();

        if let Ok(client_id) = env::var("RUQQUS_CLIENT_ID") {
            config.client_id = Some(client_id);
        }

        if let Ok(client_secret) = env::var("RUQQUS_CLIENT_SECRET") {
            config.client_secret = Some(client_secret);
        }

        if let Ok(auth_code) = env::var("RUQQUS_AUTH_CODE") {
            config.auth_code = Some(auth_code);
        }

        if let Ok(token_file) = env::var("RUQQUS_TOKEN_FILE") {
            config.token_file = Some(PathBuf::from(token_file));
        }

        // OAuth port - parse as u16 if provided
        if let Ok(port_str) = env::var("RUQQUS_OAUTH_PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                config.oauth_port = Some(port);
            }
        }

        if let Ok(imgur_client_id) = env::var("IMGUR_CLIENT_ID") {
            config.imgur_client_id = Some(imgur_client_id);
        }

        config
    }

    /// Get client ID, panicking if not set
    pub fn require_client_id(&self) -> String {
        self.client_id
            .clone()
            .expect("RUQQUS_CLIENT_ID environment variable must be set")
    }

    /// Get client secret, panicking if not set
    pub fn require_client_secret(&self) -> String {
        self.client_secret
            .clone()
            .expect("RUQQUS_CLIENT_SECRET environment variable must be set")
    }

    /// The file the token is persisted to, defaulting to
    /// `~/.ruqrust/token.json`. The parent directory is created if missing.
    pub fn token_path(&self) -> PathBuf {
        if let Some(path) = &self.token_file {
            return path.clone();
        }
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".ruqrust");
        if !path.exists() {
            fs::create_dir_all(&path).ok();
        }
        path.push("token.json");
        path
    }

    /// Builds an authenticated client from this configuration.
    ///
    /// Loads the persisted token when one exists, otherwise exchanges
    /// `RUQQUS_AUTH_CODE` for a fresh one. Either way the token re-persists
    /// itself after every refresh.
    pub async fn create_client(&self) -> Result<Client, RuqqusClientError> {
        let path = self.token_path();

        let mut token = if path.exists() {
            info!("Loading token from {}", path.display());
            Token::load(&path)?
        } else if let Some(code) = &self.auth_code {
            info!("Exchanging authorization code for a new token");
            let token = Token::acquire(
                &self.require_client_id(),
                &self.require_client_secret(),
                code,
                true,
            )
            .await?;
            token.save(&path)?;
            token
        } else {
            return Err(RuqqusClientError::AuthError(format!(
                "no token file at {} and RUQQUS_AUTH_CODE is not set",
                path.display()
            )));
        };

        let save_path = path.clone();
        token.on_refresh(move |token| {
            if let Err(err) = token.save(&save_path) {
                warn!("failed to persist refreshed token: {}", err);
            }
        });

        Client::new(token).await
    }
}
