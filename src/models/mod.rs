//! Typed, read-only projections over decoded API payloads.
//!
//! Every entity wraps the raw JSON object the server returned and exposes
//! typed accessors over it; nothing is validated at construction time, so a
//! missing field surfaces as `None`/zero/empty at the accessor instead of a
//! decode error. Entities are only buildable through their `from_json` /
//! `from_value` factories, so their data always originated from the service.

mod comment;
mod guild;
mod post;
mod user;

pub use comment::{Comment, CommentParent};
pub use guild::Guild;
pub use post::Post;
pub use user::User;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

pub(crate) fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

/// Internal hook the listing enumerator uses to build entities out of the
/// items of a page.
pub(crate) trait FromPayload: Sized {
    fn from_payload(value: Value) -> Self;
}

/// Common identity shared by every major API type.
pub trait ItemBase {
    /// The raw payload the entity was decoded from.
    fn data(&self) -> &Value;

    /// A unique ID for this item.
    fn id(&self) -> &str {
        self.data()["id"].as_str().unwrap_or_default()
    }

    /// The time the item was created, in seconds since the Unix epoch.
    fn created_utc(&self) -> i64 {
        self.data()["created_utc"].as_i64().unwrap_or_default()
    }

    /// The time the item was created.
    fn created(&self) -> DateTime<Utc> {
        timestamp(self.created_utc())
    }

    /// A relative link to this item.
    fn permalink(&self) -> &str {
        self.data()["permalink"].as_str().unwrap_or_default()
    }

    /// `true` if the item has been banned.
    fn is_banned(&self) -> bool {
        self.data()["is_banned"].as_bool().unwrap_or(false)
    }
}

/// Shared surface of [`Post`] and [`Comment`]: user-authored content that
/// collects votes.
pub trait Submission: ItemBase {
    /// The name of the creator, or `None` for a deleted account.
    fn author_name(&self) -> Option<&str> {
        self.data()["author"].as_str()
    }

    /// The text body of the item.
    fn body(&self) -> &str {
        self.data()["body"].as_str().unwrap_or_default()
    }

    /// The text body of the item in HTML format.
    fn body_html(&self) -> &str {
        self.data()["body_html"].as_str().unwrap_or_default()
    }

    /// The time of the last edit in seconds since the Unix epoch, or `0` if
    /// never edited.
    fn last_edit_utc(&self) -> i64 {
        self.data()["edited_utc"].as_i64().unwrap_or_default()
    }

    /// The time of the last edit.
    fn last_edit(&self) -> DateTime<Utc> {
        timestamp(self.last_edit_utc())
    }

    /// `true` if the item has been edited.
    fn is_edited(&self) -> bool {
        self.last_edit_utc() != 0
    }

    fn upvotes(&self) -> i64 {
        self.data()["upvotes"].as_i64().unwrap_or_default()
    }

    fn downvotes(&self) -> i64 {
        self.data()["downvotes"].as_i64().unwrap_or_default()
    }

    /// Upvotes minus downvotes.
    fn score(&self) -> i64 {
        self.data()["score"].as_i64().unwrap_or_default()
    }

    fn is_nsfw(&self) -> bool {
        self.data()["is_nsfw"].as_bool().unwrap_or(false)
    }

    fn is_nsfl(&self) -> bool {
        self.data()["is_nsfl"].as_bool().unwrap_or(false)
    }

    fn is_archived(&self) -> bool {
        self.data()["is_archived"].as_bool().unwrap_or(false)
    }

    fn is_deleted(&self) -> bool {
        self.data()["is_deleted"].as_bool().unwrap_or(false)
    }

    fn is_offensive(&self) -> bool {
        self.data()["is_offensive"].as_bool().unwrap_or(false)
    }

    /// The type-prefixed global ID of this item.
    fn full_name(&self) -> &str {
        self.data()["fullname"].as_str().unwrap_or_default()
    }

    /// The name of the guild this item is contained within.
    fn guild_name(&self) -> &str {
        self.data()["guild_name"].as_str().unwrap_or_default()
    }

    /// The name/title of this item.
    fn title(&self) -> &str {
        self.data()["title"].as_str().unwrap_or_default()
    }
}

/// A trophy issued to an account for a specific accomplishment.
#[derive(Debug, Clone)]
pub struct Badge {
    data: Value,
}

impl Badge {
    pub(crate) fn new(data: Value) -> Self {
        Self { data }
    }

    pub fn name(&self) -> &str {
        self.data["name"].as_str().unwrap_or_default()
    }

    /// A brief description of the badge.
    pub fn text(&self) -> &str {
        self.data["text"].as_str().unwrap_or_default()
    }

    /// The URL associated with the badge, or `None` if not defined.
    pub fn url(&self) -> Option<&str> {
        self.data["url"].as_str()
    }

    /// The time the badge was earned in seconds since the Unix epoch, or `0`
    /// if not defined.
    pub fn created_utc(&self) -> i64 {
        self.data["created_utc"].as_i64().unwrap_or_default()
    }

    /// The time the badge was earned, or `None` if not defined.
    pub fn created(&self) -> Option<DateTime<Utc>> {
        match self.created_utc() {
            0 => None,
            secs => Some(timestamp(secs)),
        }
    }
}

/// A title displayed next to a username.
#[derive(Debug, Clone)]
pub struct Title {
    data: Value,
}

impl Title {
    pub(crate) fn new(data: Value) -> Self {
        Self { data }
    }

    pub fn id(&self) -> i64 {
        self.data["id"].as_i64().unwrap_or_default()
    }

    /// The text value of the title.
    pub fn text(&self) -> &str {
        self.data["text"].as_str().unwrap_or_default()
    }

    /// The color used to display the title, in HTML format.
    pub fn color(&self) -> &str {
        self.data["color"].as_str().unwrap_or_default()
    }

    /// An integer determining the "rank" of the title.
    pub fn kind(&self) -> i64 {
        self.data["kind"].as_i64().unwrap_or_default()
    }
}
