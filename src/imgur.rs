//! Anonymous image upload through the Imgur API.
//!
//! Ruqqus accepts direct image attachments, but routing through Imgur keeps
//! the image available even when a post is later removed. No authentication
//! beyond a free client ID is required; Imgur's (generous) anonymous rate
//! limits apply.

use crate::client::RuqqusClientError;
use log::debug;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::Path;

const UPLOAD_URL: &str = "https://api.imgur.com/3/upload";

/// Uploads an image anonymously and returns the direct image link.
pub async fn imgur_upload(client_id: &str, image: &Path) -> Result<String, RuqqusClientError> {
    if client_id.is_empty() {
        return Err(RuqqusClientError::InvalidArgument(
            "imgur client ID cannot be empty".to_string(),
        ));
    }
    let bytes = tokio::fs::read(image).await.map_err(|e| {
        RuqqusClientError::InvalidArgument(format!("cannot read {}: {}", image.display(), e))
    })?;
    let file_name = image
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let form = Form::new()
        .part("image", Part::bytes(bytes).file_name(file_name))
        .text("type", "file");

    debug!("uploading {} to imgur", image.display());
    let response = reqwest::Client::new()
        .post(UPLOAD_URL)
        .header(AUTHORIZATION, format!("Client-ID {}", client_id))
        .multipart(form)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(RuqqusClientError::ApiError(format!(
            "imgur upload failed: HTTP {}",
            status
        )));
    }

    let json: Value = serde_json::from_str(&response.text().await?)?;
    json["data"]["link"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            RuqqusClientError::ApiError("imgur response carried no direct link".to_string())
        })
}
