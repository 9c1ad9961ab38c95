//! The comment entity.

use super::{FromPayload, Guild, ItemBase, Post, Submission, User};
use crate::client::{Client, RuqqusClientError};
use serde_json::Value;
use tokio::sync::OnceCell;

/// The parent of a comment: the post itself for top-level comments, another
/// comment otherwise.
#[derive(Debug)]
pub enum CommentParent {
    Post(Post),
    Comment(Box<Comment>),
}

/// A comment within a post.
#[derive(Debug)]
pub struct Comment {
    data: Value,
    author: OnceCell<Option<User>>,
    guild: OnceCell<Option<Guild>>,
    post: OnceCell<Option<Post>>,
    parent: OnceCell<Option<CommentParent>>,
}

impl Comment {
    /// Loads the comment from a JSON-formatted string.
    pub fn from_json(json: &str) -> Result<Self, RuqqusClientError> {
        Ok(Self::from_value(serde_json::from_str(json)?))
    }

    /// Wraps an already-decoded payload.
    pub fn from_value(data: Value) -> Self {
        Self {
            data,
            author: OnceCell::new(),
            guild: OnceCell::new(),
            post: OnceCell::new(),
            parent: OnceCell::new(),
        }
    }

    /// The level of "nesting" in the comment tree, starting at `1` when in
    /// direct reply to the post.
    pub fn level(&self) -> i64 {
        self.data["level"].as_i64().unwrap_or_default()
    }

    /// The unique ID of the parent for this comment.
    pub fn parent_id(&self) -> &str {
        self.data["parent"].as_str().unwrap_or_default()
    }

    /// `true` if the comment's parent is a comment, otherwise `false` if it
    /// is a post.
    pub fn is_parent_comment(&self) -> bool {
        self.level() > 1
    }

    /// `true` if the comment's parent is a post.
    pub fn is_parent_post(&self) -> bool {
        self.level() == 1
    }

    /// The ID of the post this comment belongs to.
    pub fn post_id(&self) -> &str {
        self.data["post"].as_str().unwrap_or_default()
    }

    /// The account that created the comment, or `None` for a deleted account
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

    /// The guild this comment lives in.
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

    /// The post this comment belongs to.
    pub async fn post(&self, client: &Client) -> Result<Option<&Post>, RuqqusClientError> {
        self.post
            .get_or_try_init(|| async {
                match self.post_id() {
                    "" => Ok(None),
                    id => client.get_post(id).await.map(Some),
                }
            })
            .await
            .map(Option::as_ref)
    }

    /// The parent of this comment, fetched as a comment when `level > 1` and
    /// as a post otherwise.
    pub async fn parent(
        &self,
        client: &Client,
    ) -> Result<Option<&CommentParent>, RuqqusClientError> {
        self.parent
            .get_or_try_init(|| async {
                match self.parent_id() {
                    "" => Ok(None),
                    id if self.is_parent_comment() => client
                        .get_comment(id)
                        .await
                        .map(|c| Some(CommentParent::Comment(Box::new(c)))),
                    id => client.get_post(id).await.map(|p| Some(CommentParent::Post(p))),
                }
            })
            .await
            .map(Option::as_ref)
    }
}

impl ItemBase for Comment {
    fn data(&self) -> &Value {
        &self.data
    }
}

impl Submission for Comment {}

impl FromPayload for Comment {
    fn from_payload(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl PartialEq for Comment {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Comment {}
