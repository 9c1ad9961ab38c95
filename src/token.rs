//! OAuth2 bearer credential: acquisition, expiry tracking, refresh, persistence.

use crate::client::{RuqqusClientError, USER_AGENT};
use crate::oauth::Scope;
use crate::routes;
use chrono::{DateTime, TimeZone, Utc};
use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT as USER_AGENT_HEADER};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;

/// Seconds of remaining lifetime under which a token is refreshed before an
/// authenticated call instead of risking a mid-request 401.
pub const REFRESH_MARGIN_SECS: i64 = 60;

type RefreshCallback = Box<dyn Fn(&Token) + Send + Sync>;

fn default_grant_url() -> String {
    format!("{}/oauth/grant", routes::HOME)
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// The raw grant payload as the provider returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenData {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_at: i64,
    #[serde(default)]
    scopes: String,
}

/// A Ruqqus OAuth2 access token.
///
/// Created once through the authorization-code grant (or loaded from its
/// persisted form) and then mutated in place by [`refresh`](Token::refresh)
/// for the remainder of the process.
#[derive(Serialize, Deserialize)]
pub struct Token {
    client_id: String,
    client_secret: String,
    #[serde(default = "default_grant_url")]
    grant_url: String,
    data: TokenData,
    #[serde(skip)]
    http: reqwest::Client,
    #[serde(skip)]
    refreshed: Option<RefreshCallback>,
}

impl Token {
    /// Exchanges a one-time authorization code for a token pair.
    ///
    /// `persistent` maps to the provider's `permanent` flag and controls
    /// whether the grant is reusable after the process exits.
    pub async fn acquire(
        client_id: &str,
        client_secret: &str,
        code: &str,
        persistent: bool,
    ) -> Result<Self, RuqqusClientError> {
        Self::acquire_at(&default_grant_url(), client_id, client_secret, code, persistent).await
    }

    /// Same as [`acquire`](Token::acquire) against a non-default grant
    /// endpoint (self-hosted instances).
    pub async fn acquire_at(
        grant_url: &str,
        client_id: &str,
        client_secret: &str,
        code: &str,
        persistent: bool,
    ) -> Result<Self, RuqqusClientError> {
        let http = reqwest::Client::new();
        let params = [
            ("code", code.to_string()),
            ("client_id", client_id.to_string()),
            ("client_secret", client_secret.to_string()),
            ("grant_type", "code".to_string()),
            ("permanent", persistent.to_string()),
        ];

        let response = http
            .post(grant_url)
            .header(USER_AGENT_HEADER, USER_AGENT)
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        let json: Value = response.json().await?;
        if json.get("oauth_error").is_some() {
            return Err(RuqqusClientError::AuthError(
                "failed to grant access for token".to_string(),
            ));
        }

        let data: TokenData = serde_json::from_value(json)?;
        debug!("token granted, expires at {}", data.expires_at);

        Ok(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            grant_url: grant_url.to_string(),
            data,
            http,
            refreshed: None,
        })
    }

    /// Exchanges the stored refresh token for a new access token and resets
    /// the time of expiration.
    ///
    /// The current access token rides along as the bearer credential; the
    /// provider accepts it for refresh calls even when already expired. The
    /// call fails only when the HTTP status is non-success *and* the body
    /// carries no `oauth_error` marker, so ambiguous failures still surface.
    pub async fn refresh(&mut self) -> Result<(), RuqqusClientError> {
        debug!("refreshing access token");

        let params = [
            ("client_id", self.client_id.clone()),
            ("client_secret", self.client_secret.clone()),
            ("refresh_token", self.data.refresh_token.clone()),
            ("grant_type", "refresh".to_string()),
        ];

        let response = self
            .http
            .post(&self.grant_url)
            .header(USER_AGENT_HEADER, USER_AGENT)
            .header(
                AUTHORIZATION,
                format!("{} {}", self.data.token_type, self.data.access_token),
            )
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let json: Value = response.json().await?;
        if !status.is_success() && json.get("oauth_error").is_none() {
            return Err(RuqqusClientError::AuthError(format!(
                "failed to refresh authentication token: HTTP {}",
                status
            )));
        }

        self.merge(&json);
        debug!("access token refreshed, expires at {}", self.data.expires_at);

        if let Some(callback) = &self.refreshed {
            callback(self);
        }
        Ok(())
    }

    // Fields present in the response replace the stored ones; everything else
    // is kept as-is.
    fn merge(&mut self, json: &Value) {
        if let Some(value) = json["access_token"].as_str() {
            self.data.access_token = value.to_string();
        }
        if let Some(value) = json["refresh_token"].as_str() {
            self.data.refresh_token = value.to_string();
        }
        if let Some(value) = json["token_type"].as_str() {
            self.data.token_type = value.to_string();
        }
        if let Some(value) = json["expires_at"].as_i64() {
            self.data.expires_at = value;
        }
        if let Some(value) = json["scopes"].as_str() {
            self.data.scopes = value.to_string();
        }
    }

    /// Registers a callback invoked after every successful refresh, replacing
    /// any previously registered one. Useful to persist the updated token:
    ///
    /// ```no_run
    /// # let json = r#"{"client_id":"a","client_secret":"b","data":{}}"#;
    /// # let mut token = ruqrust::token::Token::from_json(json).unwrap();
    /// token.on_refresh(|t| {
    ///     let _ = t.save("token.json");
    /// });
    /// ```
    pub fn on_refresh<F>(&mut self, callback: F)
    where
        F: Fn(&Token) + Send + Sync + 'static,
    {
        self.refreshed = Some(Box::new(callback));
    }

    pub fn access_token(&self) -> &str {
        &self.data.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.data.refresh_token
    }

    /// The token type to specify in the `Authorization` header.
    pub fn token_type(&self) -> &str {
        &self.data.token_type
    }

    /// The time the token expires, in seconds since the Unix epoch.
    pub fn expires_at(&self) -> i64 {
        self.data.expires_at
    }

    /// The time the token expires and will require a refresh.
    pub fn expires(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.data.expires_at, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// The scopes this token authorizes. Unknown tags are skipped.
    pub fn scopes(&self) -> Vec<Scope> {
        self.data
            .scopes
            .split(',')
            .filter_map(|tag| tag.trim().parse().ok())
            .collect()
    }

    /// The comma-joined scope string as the provider granted it.
    pub fn scope_string(&self) -> &str {
        &self.data.scopes
    }

    pub fn is_expired(&self) -> bool {
        self.data.expires_at <= Utc::now().timestamp()
    }

    /// `true` once the remaining lifetime drops under
    /// [`REFRESH_MARGIN_SECS`]. Checked before every authenticated call, not
    /// only at literal expiry.
    pub fn needs_refresh(&self) -> bool {
        self.data.expires_at - Utc::now().timestamp() < REFRESH_MARGIN_SECS
    }

    /// Overrides the grant endpoint used by [`refresh`](Token::refresh).
    pub fn set_grant_url(&mut self, url: &str) {
        self.grant_url = url.to_string();
    }

    /// The token as a JSON-formatted string, round-trippable through
    /// [`from_json`](Token::from_json) with no information loss.
    pub fn to_json(&self) -> Result<String, RuqqusClientError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Loads a token from a JSON-formatted string.
    pub fn from_json(json: &str) -> Result<Self, RuqqusClientError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a token from an already-decoded value.
    pub fn from_value(value: Value) -> Result<Self, RuqqusClientError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Writes the token as the sole content of `path`.
    ///
    /// The token is the equivalent of login credentials; keep the file
    /// somewhere it cannot be easily compromised.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), RuqqusClientError> {
        let json = self.to_json()?;
        fs::write(path.as_ref(), json).map_err(|e| {
            RuqqusClientError::ApiError(format!("failed to write token file: {}", e))
        })
    }

    /// Loads a token previously written by [`save`](Token::save).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RuqqusClientError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| {
            RuqqusClientError::ApiError(format!("failed to read token file: {}", e))
        })?;
        Self::from_json(&contents)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Token")
            .field("client_id", &self.client_id)
            .field("token_type", &self.data.token_type)
            .field("expires_at", &self.data.expires_at)
            .field("scopes", &self.data.scopes)
            .finish()
    }
}
