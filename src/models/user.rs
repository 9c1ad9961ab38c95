//! The user account entity.

use super::{Badge, FromPayload, ItemBase, Title};
use crate::client::RuqqusClientError;
use serde_json::Value;
use std::sync::OnceLock;

/// A user account.
#[derive(Debug)]
pub struct User {
    data: Value,
    badges: OnceLock<Vec<Badge>>,
}

impl User {
    /// Loads the user from a JSON-formatted string.
    pub fn from_json(json: &str) -> Result<Self, RuqqusClientError> {
        Ok(Self::from_value(serde_json::from_str(json)?))
    }

    /// Wraps an already-decoded payload.
    pub fn from_value(data: Value) -> Self {
        Self {
            data,
            badges: OnceLock::new(),
        }
    }

    /// The username of the account.
    pub fn username(&self) -> &str {
        self.data["username"].as_str().unwrap_or_default()
    }

    /// The number of comments the user has created.
    pub fn comment_count(&self) -> i64 {
        self.data["comment_count"].as_i64().unwrap_or_default()
    }

    /// The number of posts the user has created.
    pub fn post_count(&self) -> i64 {
        self.data["post_count"].as_i64().unwrap_or_default()
    }

    /// The amount of rep the user has earned from comments.
    pub fn comment_rep(&self) -> i64 {
        self.data["comment_rep"].as_i64().unwrap_or_default()
    }

    /// The amount of rep the user has earned from posts.
    pub fn post_rep(&self) -> i64 {
        self.data["post_rep"].as_i64().unwrap_or_default()
    }

    /// The total amount of rep the user has earned from comments and posts.
    pub fn total_rep(&self) -> i64 {
        self.comment_rep() + self.post_rep()
    }

    /// The badges associated with this account, built on first access.
    pub fn badges(&self) -> &[Badge] {
        self.badges.get_or_init(|| {
            self.data["badges"]
                .as_array()
                .map(|list| list.iter().map(|badge| Badge::new(badge.clone())).collect())
                .unwrap_or_default()
        })
    }

    /// The title the user has associated with their account, or `None` if
    /// none is assigned.
    pub fn title(&self) -> Option<Title> {
        match &self.data["title"] {
            Value::Null => None,
            value => Some(Title::new(value.clone())),
        }
    }

    /// The URL for the banner image associated with the account.
    pub fn banner_url(&self) -> &str {
        self.data["banner_url"].as_str().unwrap_or_default()
    }

    /// The URL for the profile image associated with the account.
    pub fn profile_url(&self) -> &str {
        self.data["profile_url"].as_str().unwrap_or_default()
    }

    /// A brief statement/biography the user has associated with their account.
    pub fn bio(&self) -> &str {
        self.data["bio"].as_str().unwrap_or_default()
    }

    /// The biography in HTML format.
    pub fn bio_html(&self) -> &str {
        self.data["bio_html"].as_str().unwrap_or_default()
    }

    /// The reason the user was banned, or `None` if they were not.
    pub fn ban_reason(&self) -> Option<&str> {
        self.data["ban_reason"].as_str()
    }
}

impl ItemBase for User {
    fn data(&self) -> &Value {
        &self.data
    }
}

impl FromPayload for User {
    fn from_payload(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for User {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn total_rep_sums_both_sources() {
        let user = User::from_value(json!({
            "id": "u1", "username": "captain_f", "comment_rep": 40, "post_rep": 2
        }));
        assert_eq!(user.total_rep(), 42);
    }

    #[test]
    fn counts_default_to_zero() {
        let user = User::from_json(r#"{"id":"u1","username":"captain_f"}"#).unwrap();
        assert_eq!(user.comment_count(), 0);
        assert_eq!(user.post_count(), 0);
        assert_eq!(user.total_rep(), 0);
        assert!(user.badges().is_empty());
        assert!(user.title().is_none());
        assert_eq!(user.ban_reason(), None);
    }

    #[test]
    fn badges_build_from_the_embedded_list() {
        let user = User::from_value(json!({
            "id": "u1",
            "badges": [
                { "name": "Beta User", "text": "was here for launch" },
                { "name": "Recruiter", "text": "referred a friend" }
            ]
        }));
        let badges = user.badges();
        assert_eq!(badges.len(), 2);
        assert_eq!(badges[0].name(), "Beta User");
        assert_eq!(badges[1].text(), "referred a friend");
    }
}
