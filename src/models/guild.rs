//! The guild entity.

use super::{FromPayload, ItemBase};
use crate::client::RuqqusClientError;
use serde_json::Value;

/// A topical community that posts are submitted to.
#[derive(Debug)]
pub struct Guild {
    data: Value,
}

impl Guild {
    /// Loads the guild from a JSON-formatted string.
    pub fn from_json(json: &str) -> Result<Self, RuqqusClientError> {
        Ok(Self::from_value(serde_json::from_str(json)?))
    }

    /// Wraps an already-decoded payload.
    pub fn from_value(data: Value) -> Self {
        Self { data }
    }

    /// The name of the guild.
    pub fn name(&self) -> &str {
        self.data["name"].as_str().unwrap_or_default()
    }

    /// The number of members subscribed to the guild.
    pub fn member_count(&self) -> i64 {
        self.data["subscriber_count"].as_i64().unwrap_or_default()
    }

    /// The number of guildmasters who moderate this guild.
    pub fn guildmaster_count(&self) -> i64 {
        self.data["mods_count"].as_i64().unwrap_or_default()
    }

    /// `true` if the guild contains adult content and is flagged as NSFW.
    pub fn is_nsfw(&self) -> bool {
        self.data["over_18"].as_bool().unwrap_or(false)
    }

    /// `true` if the guild is private and requires membership to view
    /// content.
    pub fn is_private(&self) -> bool {
        self.data["is_private"].as_bool().unwrap_or(false)
    }

    /// `true` if posting is restricted by the guildmasters.
    pub fn is_restricted(&self) -> bool {
        self.data["is_restricted"].as_bool().unwrap_or(false)
    }

    /// The description of the guild.
    pub fn description(&self) -> &str {
        self.data["description"].as_str().unwrap_or_default()
    }

    /// The description of the guild in HTML format.
    pub fn description_html(&self) -> &str {
        self.data["description_html"].as_str().unwrap_or_default()
    }

    /// The URL for the banner image associated with the guild.
    pub fn banner_url(&self) -> &str {
        self.data["banner_url"].as_str().unwrap_or_default()
    }

    /// The URL for the profile image associated with the guild.
    pub fn profile_url(&self) -> &str {
        self.data["profile_url"].as_str().unwrap_or_default()
    }

    /// The accent color used for the guild, in HTML format.
    pub fn color(&self) -> &str {
        self.data["color"].as_str().unwrap_or_default()
    }

    /// The type-prefixed global ID of the guild.
    pub fn full_name(&self) -> &str {
        self.data["fullname"].as_str().unwrap_or_default()
    }
}

impl ItemBase for Guild {
    fn data(&self) -> &Value {
        &self.data
    }
}

impl FromPayload for Guild {
    fn from_payload(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl PartialEq for Guild {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Guild {}
