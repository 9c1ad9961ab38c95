//! The post entity.

use super::{FromPayload, Guild, ItemBase, Submission, Title, User};
use crate::client::{Client, RuqqusClientError};
use serde_json::Value;
use tokio::sync::OnceCell;

/// A post within a guild.
///
/// Relations (`author`, `guild`, `original_guild`) resolve through the API on
/// first access and are memoized for the lifetime of this instance; a fresh
/// fetch produces a fresh entity with empty caches.
#[derive(Debug)]
pub struct Post {
    data: Value,
    author: OnceCell<Option<User>>,
    guild: OnceCell<Option<Guild>>,
    original_guild: OnceCell<Option<Guild>>,
}

impl Post {
    /// Loads the post from a JSON-formatted string.
    pub fn from_json(json: &str) -> Result<Self, RuqqusClientError> {
        Ok(Self::from_value(serde_json::from_str(json)?))
    }

    /// Wraps an already-decoded payload.
    pub fn from_value(data: Value) -> Self {
        Self {
            data,
            author: OnceCell::new(),
            guild: OnceCell::new(),
            original_guild: OnceCell::new(),
        }
    }

    /// The number of comments made on the post.
    pub fn comment_count(&self) -> i64 {
        self.data["comment_count"].as_i64().unwrap_or_default()
    }

    /// The domain name for link posts, otherwise a short descriptor of the
    /// post type.
    pub fn domain(&self) -> &str {
        self.data["domain"].as_str().unwrap_or_default()
    }

    /// The embed URL for the post.
    pub fn embed_url(&self) -> &str {
        self.data["embed_url"].as_str().unwrap_or_default()
    }

    /// The name of the guild this post was originally posted in, or `None`
    /// when it was never relocated.
    pub fn original_guild_name(&self) -> Option<&str> {
        self.data["original_guild_name"].as_str()
    }

    /// The URL of the post's thumbnail image, or `None` if none exists.
    pub fn thumb_url(&self) -> Option<&str> {
        self.data["thumb_url"].as_str()
    }

    /// The URL the post links to. The service reports text posts as an empty
    /// string, which is normalized to `None` here.
    pub fn url(&self) -> Option<&str> {
        match self.data["url"].as_str() {
            None | Some("") => None,
            Some(url) => Some(url),
        }
    }

    /// The title assigned to the author, or `None` if none is defined.
    pub fn author_title(&self) -> Option<Title> {
        match &self.data["author_title"] {
            Value::Null => None,
            value => Some(Title::new(value.clone())),
        }
    }

    /// The account that created the post, or `None` for a deleted account
    /// (no network call is made in that case).
    pub async fn author(&self, client: &Client) -> Result<Option<&User>, RuqqusClientError> {
        self.author
            .get_or_try_init(|| async {
                match self.author_name() {
                    Some(name) => client.get_user(name).await.map(Some),
                    None => Ok(None),
                }
            })
            .await
            .map(Option::as_ref)
    }

    /// The guild this post lives in.
    pub async fn guild(&self, client: &Client) -> Result<Option<&Guild>, RuqqusClientError> {
        self.guild
            .get_or_try_init(|| async {
                match self.guild_name() {
                    "" => Ok(None),
                    name => client.get_guild(name).await.map(Some),
                }
            })
            .await
            .map(Option::as_ref)
    }

    /// The guild this post was originally submitted to, or `None` when it was
    /// never relocated.
    pub async fn original_guild(
        &self,
        client: &Client,
    ) -> Result<Option<&Guild>, RuqqusClientError> {
        self.original_guild
            .get_or_try_init(|| async {
                match self.original_guild_name() {
                    Some(name) => client.get_guild(name).await.map(Some),
                    None => Ok(None),
                }
            })
            .await
            .map(Option::as_ref)
    }
}

impl ItemBase for Post {
    fn data(&self) -> &Value {
        &self.data
    }
}

impl Submission for Post {}

impl FromPayload for Post {
    fn from_payload(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl PartialEq for Post {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Post {}
