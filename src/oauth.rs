//! Helpers for the interactive OAuth2 consent flow.
//!
//! The library itself only needs an authorization code; these helpers cover
//! the interactive part of obtaining one: building the consent URL, opening
//! it in a browser, and listening on localhost for the redirect.

use crate::client::RuqqusClientError;
use crate::routes;
use log::{debug, info};
use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tiny_http::{Response, Server, StatusCode};
use url::Url;

/// A permission that can be requested when authorizing an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Identity,
    Create,
    Read,
    Update,
    Delete,
    Vote,
    Guildmaster,
}

/// Every scope the service knows about.
pub const ALL_SCOPES: [Scope; 7] = [
    Scope::Identity,
    Scope::Create,
    Scope::Read,
    Scope::Update,
    Scope::Delete,
    Scope::Vote,
    Scope::Guildmaster,
];

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Identity => "identity",
            Scope::Create => "create",
            Scope::Read => "read",
            Scope::Update => "update",
            Scope::Delete => "delete",
            Scope::Vote => "vote",
            Scope::Guildmaster => "guildmaster",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = RuqqusClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity" => Ok(Scope::Identity),
            "create" => Ok(Scope::Create),
            "read" => Ok(Scope::Read),
            "update" => Ok(Scope::Update),
            "delete" => Ok(Scope::Delete),
            "vote" => Ok(Scope::Vote),
            "guildmaster" => Ok(Scope::Guildmaster),
            other => Err(RuqqusClientError::InvalidArgument(format!(
                "unknown scope: {:?}",
                other
            ))),
        }
    }
}

/// Builds the URL a user must visit to authorize an application.
///
/// `create`, `update`, and `guildmaster` require `identity`, which is added
/// automatically when missing. When `csrf` is `None` a random state token is
/// generated; validate it against the redirect if you care about CSRF.
pub fn authorize_url(
    client_id: &str,
    redirect: &str,
    scopes: &[Scope],
    permanent: bool,
    csrf: Option<&str>,
) -> Result<String, RuqqusClientError> {
    if client_id.is_empty() {
        return Err(RuqqusClientError::InvalidArgument(
            "client ID cannot be empty".to_string(),
        ));
    }
    if Url::parse(redirect).is_err() {
        return Err(RuqqusClientError::InvalidArgument(
            "invalid redirect URI".to_string(),
        ));
    }
    if scopes.is_empty() {
        return Err(RuqqusClientError::InvalidArgument(
            "scopes cannot be empty".to_string(),
        ));
    }

    let mut scopes = scopes.to_vec();
    let needs_identity = scopes
        .iter()
        .any(|s| matches!(s, Scope::Create | Scope::Update | Scope::Guildmaster));
    if needs_identity && !scopes.contains(&Scope::Identity) {
        scopes.push(Scope::Identity);
    }

    let scope_list = scopes.iter().map(Scope::as_str).collect::<Vec<_>>().join(",");
    let state = match csrf {
        Some(token) => token.to_string(),
        None => random_state(),
    };

    Ok(format!(
        "{}/oauth/authorize?client_id={}&redirect_uri={}&scope={}&state={}&permanent={}",
        routes::HOME,
        client_id,
        redirect,
        scope_list,
        state,
        permanent
    ))
}

fn random_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::encode_config(bytes, base64::URL_SAFE_NO_PAD)
}

/// Opens a URL in the system's default web browser.
pub fn open_browser(url: &str) -> std::io::Result<()> {
    webbrowser::open(url)
}

/// Listens on localhost for the OAuth redirect and returns the authorization
/// code once it arrives, or `None` on timeout or listener failure.
///
/// Blocking; intended for the one-time interactive setup, not for use inside
/// an async task.
pub fn wait_for_code(port: u16, timeout: Duration) -> Option<String> {
    let server = match Server::http(format!("127.0.0.1:{}", port)) {
        Ok(server) => server,
        Err(err) => {
            debug!("failed to start local server on port {}: {}", port, err);
            return None;
        }
    };
    info!("waiting for authorization redirect on http://localhost:{}", port);

    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.checked_duration_since(Instant::now())?;
        let request = match server.recv_timeout(remaining) {
            Ok(Some(request)) => request,
            _ => return None,
        };

        let code = Url::parse(&format!("http://localhost{}", request.url()))
            .ok()
            .and_then(|url| {
                url.query_pairs()
                    .find(|(key, _)| key == "code")
                    .map(|(_, value)| value.into_owned())
            });

        let response = Response::from_string(confirmation_page(code.is_some()))
            .with_status_code(StatusCode(200));
        request.respond(response).ok();

        // Anything without a code (favicon probes and the like) is ignored
        // and the listener keeps waiting until the deadline.
        if let Some(code) = code {
            return Some(code);
        }
    }
}

fn confirmation_page(success: bool) -> String {
    let (color, message) = if success {
        ("#339966", "Authorization Confirmed")
    } else {
        ("#ff0000", "Authorization Failed")
    };
    format!(
        "<html><body style=\"text-align: center;\">\
         <h1><span style=\"color: {};\">{}</span></h1>\
         <p style=\"color: #808080;\">You can safely close this tab and return to the application.</p>\
         </body></html>",
        color, message
    )
}
