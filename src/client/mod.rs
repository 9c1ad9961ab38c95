//! The authenticated gateway for all Ruqqus API operations.

use crate::imgur;
use crate::models::{Comment, FromPayload, Guild, ItemBase, Post, Submission, User};
use crate::routes::Routes;
use crate::token::Token;
use crate::validation;
use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::{Error as ReqwestError, Response};
use serde_json::{json, Value};
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OnceCell};
use url::Url;

/// The user-agent the client identifies itself as.
pub const USER_AGENT: &str = concat!("ruqrust/", env!("CARGO_PKG_VERSION"));

/// Every listing endpoint serves fixed pages of this size; a shorter page
/// marks the end of the listing.
pub const PAGE_SIZE: usize = 25;

/// The session cookie the service issues alongside authenticated responses.
const SESSION_COOKIE: &str = "session_ruqqus";

// Fullname prefixes distinguishing item kinds at the ID level.
const POST_PREFIX: &str = "t2_";
const COMMENT_PREFIX: &str = "t3_";

/// Errors surfaced by the client and the token lifecycle.
#[derive(Debug)]
pub enum RuqqusClientError {
    RequestError(ReqwestError),
    ParseError(serde_json::Error),
    /// Bad or missing caller input; never reaches the network.
    InvalidArgument(String),
    /// Token grant or refresh failure.
    AuthError(String),
    /// The provider reported a missing object.
    NotFound(String),
    /// Any other non-success HTTP outcome.
    ApiError(String),
}

impl fmt::Display for RuqqusClientError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RuqqusClientError::RequestError(err) => write!(f, "Request error: {}", err),
            RuqqusClientError::ParseError(err) => write!(f, "Parse error: {}", err),
            RuqqusClientError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            RuqqusClientError::AuthError(msg) => write!(f, "Authentication error: {}", msg),
            RuqqusClientError::NotFound(msg) => write!(f, "Not found: {}", msg),
            RuqqusClientError::ApiError(msg) => write!(f, "Ruqqus API error: {}", msg),
        }
    }
}

impl std::error::Error for RuqqusClientError {}

impl From<ReqwestError> for RuqqusClientError {
    fn from(err: ReqwestError) -> Self {
        RuqqusClientError::RequestError(err)
    }
}

impl From<serde_json::Error> for RuqqusClientError {
    fn from(err: serde_json::Error) -> Self {
        RuqqusClientError::ParseError(err)
    }
}

/// Sort orders accepted by the post listing endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostSort {
    #[default]
    New,
    Hot,
    Top,
    Activity,
    Disputed,
}

impl PostSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostSort::New => "new",
            PostSort::Hot => "hot",
            PostSort::Top => "top",
            PostSort::Activity => "activity",
            PostSort::Disputed => "disputed",
        }
    }
}

/// Time windows accepted by the post listing endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFilter {
    #[default]
    All,
    Day,
    Week,
    Month,
    Year,
}

impl TimeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::All => "all",
            TimeFilter::Day => "day",
            TimeFilter::Week => "week",
            TimeFilter::Month => "month",
            TimeFilter::Year => "year",
        }
    }
}

/// Sort orders accepted by the guild directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuildSort {
    #[default]
    New,
    Subs,
    Trending,
}

impl GuildSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuildSort::New => "new",
            GuildSort::Subs => "subs",
            GuildSort::Trending => "trending",
        }
    }
}

/// Options forwarded as query parameters to the post listing endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingOptions {
    pub sort: PostSort,
    pub filter: TimeFilter,
}

/// Content attachments for [`Client::create_post`]. Exactly one of the post
/// body, `url`, or `image` must end up present.
#[derive(Debug, Clone, Default)]
pub struct PostOptions {
    /// A link the post points at; must parse as a URI.
    pub url: Option<String>,
    /// Path to a local image to attach to the post.
    pub image: Option<PathBuf>,
    /// When set together with `image`, the image is uploaded through Imgur
    /// and submitted as a link instead of being attached directly.
    pub imgur_client_id: Option<String>,
}

// Thin adapter between the strict inner operations and the best-effort
// surface: submission failures collapse to `None` while validation and auth
// errors keep propagating.
fn best_effort<T>(
    result: Result<T, RuqqusClientError>,
) -> Result<Option<T>, RuqqusClientError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err @ (RuqqusClientError::AuthError(_) | RuqqusClientError::InvalidArgument(_))) => {
            Err(err)
        }
        Err(err) => {
            debug!("best-effort operation failed: {}", err);
            Ok(None)
        }
    }
}

/// An authenticated Ruqqus API client.
///
/// Owns exactly one [`Token`]; before every call the token's remaining
/// lifetime is checked and it is refreshed in place when necessary, firing
/// any callback registered with [`Token::on_refresh`].
///
/// All methods take `&self`; token refresh and the session cookie slot are
/// guarded internally, so sharing a client across tasks is safe, though the
/// API itself rate-limits aggressively enough that there is little to gain.
pub struct Client {
    http: reqwest::Client,
    token: AsyncMutex<Token>,
    session: Mutex<Option<String>>,
    routes: Routes,
    identity: OnceCell<User>,
}

impl Client {
    /// Creates a client from an existing token, eagerly refreshing it so bad
    /// credentials fail here instead of on the first call.
    pub async fn new(token: Token) -> Result<Self, RuqqusClientError> {
        Self::with_routes(token, Routes::default()).await
    }

    /// Same as [`new`](Client::new) against a non-default host (self-hosted
    /// instances, test servers).
    pub async fn with_routes(mut token: Token, routes: Routes) -> Result<Self, RuqqusClientError> {
        token.refresh().await?;
        Self::assemble(token, routes)
    }

    /// Exchanges a one-time authorization code for a token and builds the
    /// client around it.
    pub async fn from_code(
        client_id: &str,
        client_secret: &str,
        code: &str,
        persistent: bool,
    ) -> Result<Self, RuqqusClientError> {
        let token = Token::acquire(client_id, client_secret, code, persistent).await?;
        Self::assemble(token, Routes::default())
    }

    fn assemble(token: Token, routes: Routes) -> Result<Self, RuqqusClientError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            token: AsyncMutex::new(token),
            session: Mutex::new(None),
            routes,
            identity: OnceCell::new(),
        })
    }

    /// The token authorizing this client.
    pub fn token(&self) -> &AsyncMutex<Token> {
        &self.token
    }

    /// The route table requests are dispatched against.
    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    // ----- single-item queries -------------------------------------------

    /// Retrieves the user with the specified username.
    pub async fn get_user(&self, username: &str) -> Result<User, RuqqusClientError> {
        if !validation::valid_username(username) {
            return Err(RuqqusClientError::InvalidArgument(format!(
                "invalid username: {:?}",
                username
            )));
        }
        let value = self.fetch_item(&self.routes.user_info(username), "user").await?;
        Ok(User::from_value(value))
    }

    /// Retrieves the guild with the specified name.
    pub async fn get_guild(&self, name: &str) -> Result<Guild, RuqqusClientError> {
        if !validation::valid_guild_name(name) {
            return Err(RuqqusClientError::InvalidArgument(format!(
                "invalid guild name: {:?}",
                name
            )));
        }
        let value = self.fetch_item(&self.routes.guild_info(name), "guild").await?;
        Ok(Guild::from_value(value))
    }

    /// Retrieves the post with the specified ID.
    pub async fn get_post(&self, post_id: &str) -> Result<Post, RuqqusClientError> {
        let id = post_id.trim_start_matches(POST_PREFIX);
        if !validation::valid_post_id(id) {
            return Err(RuqqusClientError::InvalidArgument(format!(
                "invalid post ID: {:?}",
                post_id
            )));
        }
        let value = self.fetch_item(&self.routes.post_info(id), "post").await?;
        Ok(Post::from_value(value))
    }

    /// Retrieves the comment with the specified ID.
    pub async fn get_comment(&self, comment_id: &str) -> Result<Comment, RuqqusClientError> {
        let id = comment_id.trim_start_matches(COMMENT_PREFIX);
        if !validation::valid_post_id(id) {
            return Err(RuqqusClientError::InvalidArgument(format!(
                "invalid comment ID: {:?}",
                comment_id
            )));
        }
        let value = self.fetch_item(&self.routes.comment_info(id), "comment").await?;
        Ok(Comment::from_value(value))
    }

    /// Retrieves the post a canonical web URL links to.
    pub async fn post_from_url(&self, url: &str) -> Result<Post, RuqqusClientError> {
        match validation::post_id_from_url(url) {
            Some(id) => self.get_post(id).await,
            None => Err(RuqqusClientError::InvalidArgument(format!(
                "not a post URL: {}",
                url
            ))),
        }
    }

    /// Retrieves the comment a canonical web URL links to.
    pub async fn comment_from_url(&self, url: &str) -> Result<Comment, RuqqusClientError> {
        match validation::comment_id_from_url(url) {
            Some(id) => self.get_comment(id).await,
            None => Err(RuqqusClientError::InvalidArgument(format!(
                "not a comment URL: {}",
                url
            ))),
        }
    }

    /// The account this client is authenticated as, fetched once and
    /// memoized for the lifetime of the client.
    pub async fn get_identity(&self) -> Result<&User, RuqqusClientError> {
        self.identity
            .get_or_try_init(|| async {
                let value = self.fetch_item(&self.routes.identity(), "identity").await?;
                Ok(User::from_value(value))
            })
            .await
    }

    /// `true` when the username is syntactically valid and available for
    /// creation; `false` on invalid input or any request failure.
    pub async fn username_available(&self, username: &str) -> bool {
        if !validation::valid_username(username) {
            return false;
        }
        match self.http_get(&self.routes.username_available(username)).await {
            Ok(json) => json[username].as_bool().unwrap_or(false),
            Err(_) => false,
        }
    }

    /// `true` when the guild name is syntactically valid and available for
    /// creation; `false` on invalid input or any request failure.
    pub async fn guild_available(&self, name: &str) -> bool {
        if !validation::valid_guild_name(name) {
            return false;
        }
        match self.http_get(&self.routes.guild_available(name)).await {
            Ok(json) => json[name].as_bool().unwrap_or(false),
            Err(_) => false,
        }
    }

    // ----- creation, deletion, voting ------------------------------------

    /// Submits a new comment on a post, under `parent` when given and
    /// directly on the post otherwise.
    ///
    /// Returns `Ok(None)` when the submission fails (rate limit, malformed
    /// response); the provider's error shapes are too inconsistent to
    /// surface structurally.
    pub async fn create_comment(
        &self,
        body: &str,
        post: &Post,
        parent: Option<&Comment>,
    ) -> Result<Option<Comment>, RuqqusClientError> {
        let parent_fullname = match parent {
            Some(comment) => comment.full_name().to_string(),
            None => post.full_name().to_string(),
        };
        best_effort(self.submit_comment(&parent_fullname, post.id(), body).await)
    }

    /// Submits a new top-level comment on a post identified by its bare ID.
    pub async fn create_comment_on(
        &self,
        body: &str,
        post_id: &str,
    ) -> Result<Option<Comment>, RuqqusClientError> {
        let id = post_id.trim_start_matches(POST_PREFIX);
        if !validation::valid_post_id(id) {
            return Err(RuqqusClientError::InvalidArgument(format!(
                "invalid post ID: {:?}",
                post_id
            )));
        }
        let parent_fullname = format!("{}{}", POST_PREFIX, id);
        best_effort(self.submit_comment(&parent_fullname, id, body).await)
    }

    /// Submits a reply under an existing comment.
    pub async fn reply_to_comment(
        &self,
        body: &str,
        comment: &Comment,
    ) -> Result<Option<Comment>, RuqqusClientError> {
        best_effort(
            self.submit_comment(comment.full_name(), comment.post_id(), body)
                .await,
        )
    }

    /// Submits a reply under a comment identified by its bare ID, fetching
    /// the comment first to learn its post and full name.
    pub async fn reply_to_comment_id(
        &self,
        body: &str,
        comment_id: &str,
    ) -> Result<Option<Comment>, RuqqusClientError> {
        let comment = self.get_comment(comment_id).await?;
        self.reply_to_comment(body, &comment).await
    }

    /// Creates a new post in a guild as the current user. The guild may be
    /// given with or without the leading `+`.
    ///
    /// Returns `Ok(None)` when the submission (or an Imgur upload) fails.
    pub async fn create_post(
        &self,
        guild: &str,
        title: &str,
        body: Option<&str>,
        options: PostOptions,
    ) -> Result<Option<Post>, RuqqusClientError> {
        let name = guild.trim().trim_start_matches('+');
        if !validation::valid_guild_name(name) {
            return Err(RuqqusClientError::InvalidArgument(format!(
                "invalid guild name: {:?}",
                guild
            )));
        }
        if title.is_empty() {
            return Err(RuqqusClientError::InvalidArgument(
                "title cannot be empty".to_string(),
            ));
        }

        let mut params = json!({ "title": title, "board": name });
        let mut attach: Option<PathBuf> = None;

        if let Some(image) = &options.image {
            if !image.exists() {
                return Err(RuqqusClientError::InvalidArgument(format!(
                    "no such file: {}",
                    image.display()
                )));
            }
            if let Some(imgur_client_id) = &options.imgur_client_id {
                match imgur::imgur_upload(imgur_client_id, image).await {
                    Ok(link) => params["url"] = Value::String(link),
                    Err(err) => {
                        debug!("imgur upload failed: {}", err);
                        return Ok(None);
                    }
                }
            } else {
                attach = Some(image.clone());
            }
        } else if let Some(url) = &options.url {
            if Url::parse(url).is_err() {
                return Err(RuqqusClientError::InvalidArgument(format!(
                    "invalid URI: {:?}",
                    url
                )));
            }
            params["url"] = Value::String(url.clone());
        }

        match body {
            Some(text) if !text.is_empty() => params["body"] = Value::String(text.to_string()),
            _ => {}
        }

        if params.get("body").is_none() && params.get("url").is_none() && attach.is_none() {
            return Err(RuqqusClientError::InvalidArgument(
                "text body cannot be empty without a URL or image".to_string(),
            ));
        }

        let result = match attach {
            Some(path) => self.submit_post_with_image(&params, &path).await,
            None => self.submit_post(&params).await,
        };
        best_effort(result)
    }

    /// Deletes a post previously created by the current user.
    ///
    /// An empty response body is the provider's success signal; anything
    /// else, including request failures, reads as `false`.
    pub async fn delete_post(&self, post_id: &str) -> Result<bool, RuqqusClientError> {
        let id = post_id.trim_start_matches(POST_PREFIX);
        if !validation::valid_post_id(id) {
            return Err(RuqqusClientError::InvalidArgument(format!(
                "invalid post ID: {:?}",
                post_id
            )));
        }
        self.delete_item(&self.routes.delete_post(id)).await
    }

    /// Deletes a comment previously created by the current user.
    pub async fn delete_comment(&self, comment_id: &str) -> Result<bool, RuqqusClientError> {
        let id = comment_id.trim_start_matches(COMMENT_PREFIX);
        if !validation::valid_post_id(id) {
            return Err(RuqqusClientError::InvalidArgument(format!(
                "invalid comment ID: {:?}",
                comment_id
            )));
        }
        self.delete_item(&self.routes.delete_comment(id)).await
    }

    /// Places a vote on a post. Any value is accepted and clamped into
    /// `{-1, 0, 1}` before dispatch; `0` retracts a previous vote.
    ///
    /// `Ok(true)` iff the response reports no error; request failures read
    /// as `false`.
    pub async fn vote_post(&self, post_id: &str, value: i64) -> Result<bool, RuqqusClientError> {
        let id = post_id.trim_start_matches(POST_PREFIX);
        if !validation::valid_post_id(id) {
            return Err(RuqqusClientError::InvalidArgument(format!(
                "invalid post ID: {:?}",
                post_id
            )));
        }
        let url = self.routes.vote_post(id, value.clamp(-1, 1));
        self.vote(&url).await
    }

    /// Places a vote on a comment, with the same contract as
    /// [`vote_post`](Client::vote_post).
    pub async fn vote_comment(
        &self,
        comment_id: &str,
        value: i64,
    ) -> Result<bool, RuqqusClientError> {
        let id = comment_id.trim_start_matches(COMMENT_PREFIX);
        if !validation::valid_post_id(id) {
            return Err(RuqqusClientError::InvalidArgument(format!(
                "invalid comment ID: {:?}",
                comment_id
            )));
        }
        let url = self.routes.vote_comment(id, value.clamp(-1, 1));
        self.vote(&url).await
    }

    // ----- listing enumeration -------------------------------------------

    /// Walks the posts of a guild page by page, yielding each post to the
    /// consumer. Return `false` from the consumer to stop early.
    pub async fn each_guild_post<F>(
        &self,
        guild: &str,
        options: ListingOptions,
        consumer: F,
    ) -> Result<(), RuqqusClientError>
    where
        F: FnMut(Post) -> bool,
    {
        let name = guild.trim().trim_start_matches('+');
        if !validation::valid_guild_name(name) {
            return Err(RuqqusClientError::InvalidArgument(format!(
                "invalid guild name: {:?}",
                guild
            )));
        }
        let params = [
            ("sort", options.sort.as_str().to_string()),
            ("t", options.filter.as_str().to_string()),
        ];
        self.each_listing_item(&self.routes.guild_listing(name), &params, consumer)
            .await
    }

    /// Walks every comment of a guild, newest first.
    pub async fn each_guild_comment<F>(
        &self,
        guild: &str,
        consumer: F,
    ) -> Result<(), RuqqusClientError>
    where
        F: FnMut(Comment) -> bool,
    {
        let name = guild.trim().trim_start_matches('+');
        if !validation::valid_guild_name(name) {
            return Err(RuqqusClientError::InvalidArgument(format!(
                "invalid guild name: {:?}",
                guild
            )));
        }
        self.each_listing_item(&self.routes.guild_comments(name), &[], consumer)
            .await
    }

    /// Walks the posts submitted by a user.
    pub async fn each_user_post<F>(
        &self,
        username: &str,
        consumer: F,
    ) -> Result<(), RuqqusClientError>
    where
        F: FnMut(Post) -> bool,
    {
        if !validation::valid_username(username) {
            return Err(RuqqusClientError::InvalidArgument(format!(
                "invalid username: {:?}",
                username
            )));
        }
        self.each_listing_item(&self.routes.user_listing(username), &[], consumer)
            .await
    }

    /// Walks the comments submitted by a user.
    pub async fn each_user_comment<F>(
        &self,
        username: &str,
        consumer: F,
    ) -> Result<(), RuqqusClientError>
    where
        F: FnMut(Comment) -> bool,
    {
        if !validation::valid_username(username) {
            return Err(RuqqusClientError::InvalidArgument(format!(
                "invalid username: {:?}",
                username
            )));
        }
        self.each_listing_item(&self.routes.user_comments(username), &[], consumer)
            .await
    }

    /// Walks the guild directory.
    pub async fn each_guild<F>(&self, sort: GuildSort, consumer: F) -> Result<(), RuqqusClientError>
    where
        F: FnMut(Guild) -> bool,
    {
        let params = [("sort", sort.as_str().to_string())];
        self.each_listing_item(&self.routes.guilds(), &params, consumer)
            .await
    }

    /// Walks the site-wide post listing.
    pub async fn each_post<F>(
        &self,
        options: ListingOptions,
        consumer: F,
    ) -> Result<(), RuqqusClientError>
    where
        F: FnMut(Post) -> bool,
    {
        let params = [
            ("sort", options.sort.as_str().to_string()),
            ("t", options.filter.as_str().to_string()),
        ];
        self.each_listing_item(&self.routes.all_listing(), &params, consumer)
            .await
    }

    /// Walks the personalized front page of the authenticated user.
    pub async fn each_home_post<F>(&self, consumer: F) -> Result<(), RuqqusClientError>
    where
        F: FnMut(Post) -> bool,
    {
        self.each_listing_item(&self.routes.front_listing(), &[], consumer)
            .await
    }

    /// Walks the comments of a single post.
    ///
    /// The API has no per-post comment listing, so this filters the post's
    /// guild-wide comment enumeration on the post ID; the cost is a request
    /// per 25 comments *in the guild*, not in the post.
    pub async fn each_post_comment<F>(
        &self,
        post: &Post,
        mut consumer: F,
    ) -> Result<(), RuqqusClientError>
    where
        F: FnMut(Comment) -> bool,
    {
        let post_id = post.id().to_string();
        self.each_guild_comment(post.guild_name(), move |comment| {
            if comment.post_id() == post_id {
                consumer(comment)
            } else {
                true
            }
        })
        .await
    }

    // ----- internals ------------------------------------------------------

    // Offset pagination over a fixed page size. A provider error mid-stream
    // (error field, missing data array, non-success status) is an implicit
    // end of the listing, not an exception.
    async fn each_listing_item<T, F>(
        &self,
        url: &str,
        params: &[(&str, String)],
        mut consumer: F,
    ) -> Result<(), RuqqusClientError>
    where
        T: FromPayload,
        F: FnMut(T) -> bool,
    {
        let mut page = 1u32;
        loop {
            let mut query = params.to_vec();
            query.push(("page", page.to_string()));
            debug!("GET {} page {}", url, page);
            let builder = self
                .http
                .get(url)
                .query(&query)
                .header(CONTENT_TYPE, "application/json");
            let response = self.send(builder).await?;
            if !response.status().is_success() {
                break;
            }
            let body = response.text().await?;
            let json: Value = match serde_json::from_str(&body) {
                Ok(json) => json,
                Err(_) => break,
            };
            if json.get("error").is_some() {
                break;
            }
            let items = match json.get("data").and_then(Value::as_array) {
                Some(items) => items,
                None => break,
            };
            let count = items.len();
            for item in items {
                if !consumer(T::from_payload(item.clone())) {
                    return Ok(());
                }
            }
            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(())
    }

    /// The strict core the lenient comment wrappers are layered over.
    async fn submit_comment(
        &self,
        parent_fullname: &str,
        post_id: &str,
        body: &str,
    ) -> Result<Comment, RuqqusClientError> {
        if body.is_empty() {
            return Err(RuqqusClientError::InvalidArgument(
                "comment body cannot be empty".to_string(),
            ));
        }
        let params = json!({
            "submission": post_id,
            "parent_fullname": parent_fullname,
            "body": body,
        });
        let json = self.http_post(&self.routes.comment(), Some(&params)).await?;
        if json.get("error").is_some() {
            return Err(RuqqusClientError::ApiError(format!(
                "comment submission failed: {}",
                json["error"]
            )));
        }
        Ok(Comment::from_value(json))
    }

    async fn submit_post(&self, params: &Value) -> Result<Post, RuqqusClientError> {
        let json = self.http_post(&self.routes.submit(), Some(params)).await?;
        if json.get("error").is_some() {
            return Err(RuqqusClientError::ApiError(format!(
                "post submission failed: {}",
                json["error"]
            )));
        }
        Ok(Post::from_value(json))
    }

    async fn submit_post_with_image(
        &self,
        params: &Value,
        image: &std::path::Path,
    ) -> Result<Post, RuqqusClientError> {
        let bytes = tokio::fs::read(image).await.map_err(|e| {
            RuqqusClientError::ApiError(format!("failed to read {}: {}", image.display(), e))
        })?;
        let file_name = image
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let mut form = reqwest::multipart::Form::new()
            .part("file", reqwest::multipart::Part::bytes(bytes).file_name(file_name));
        if let Some(fields) = params.as_object() {
            for (key, value) in fields {
                if let Some(text) = value.as_str() {
                    form = form.text(key.clone(), text.to_string());
                }
            }
        }

        debug!("POST {} (multipart)", self.routes.submit());
        let builder = self.http.post(self.routes.submit()).multipart(form);
        let response = self.send(builder).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RuqqusClientError::ApiError(format!(
                "server returned error status: {}",
                status
            )));
        }
        let body = response.text().await?;
        let json: Value = serde_json::from_str(&body)?;
        if json.get("error").is_some() {
            return Err(RuqqusClientError::ApiError(format!(
                "post submission failed: {}",
                json["error"]
            )));
        }
        Ok(Post::from_value(json))
    }

    async fn delete_item(&self, url: &str) -> Result<bool, RuqqusClientError> {
        match self.post_response(url, None).await {
            Ok(response) if response.status().is_success() => {
                Ok(response.text().await.map(|body| body.is_empty()).unwrap_or(false))
            }
            Ok(_) => Ok(false),
            Err(err @ RuqqusClientError::AuthError(_)) => Err(err),
            Err(err) => {
                debug!("deletion failed: {}", err);
                Ok(false)
            }
        }
    }

    async fn vote(&self, url: &str) -> Result<bool, RuqqusClientError> {
        match self.http_post(url, None).await {
            Ok(json) => Ok(json.get("error").is_none()),
            Err(err @ RuqqusClientError::AuthError(_)) => Err(err),
            Err(err) => {
                debug!("vote failed: {}", err);
                Ok(false)
            }
        }
    }

    // Single-object fetch; the provider answers missing objects with a
    // client-error status.
    async fn fetch_item(&self, url: &str, what: &str) -> Result<Value, RuqqusClientError> {
        debug!("GET {}", url);
        let builder = self.http.get(url).header(CONTENT_TYPE, "application/json");
        let response = self.send(builder).await?;
        let status = response.status();
        if status.is_client_error() {
            return Err(RuqqusClientError::NotFound(format!(
                "{} does not exist",
                what
            )));
        }
        if !status.is_success() {
            return Err(RuqqusClientError::ApiError(format!(
                "server returned error status: {}",
                status
            )));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn http_get(&self, url: &str) -> Result<Value, RuqqusClientError> {
        debug!("GET {}", url);
        let builder = self.http.get(url).header(CONTENT_TYPE, "application/json");
        let response = self.send(builder).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RuqqusClientError::ApiError(format!(
                "server returned error status: {}",
                status
            )));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn http_post(
        &self,
        url: &str,
        params: Option<&Value>,
    ) -> Result<Value, RuqqusClientError> {
        let response = self.post_response(url, params).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RuqqusClientError::ApiError(format!(
                "server returned error status: {}",
                status
            )));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn post_response(
        &self,
        url: &str,
        params: Option<&Value>,
    ) -> Result<Response, RuqqusClientError> {
        debug!("POST {}", url);
        let mut builder = self.http.post(url).header(CONTENT_TYPE, "application/json");
        if let Some(params) = params {
            builder = builder.json(params);
        }
        self.send(builder).await
    }

    // Every request funnels through here: token pre-flight, auth headers,
    // session cookie round-trip.
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Response, RuqqusClientError> {
        self.ensure_fresh_token().await?;

        let mut builder = builder
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, self.auth_header().await);
        let session = self.session.lock().unwrap().clone();
        if let Some(session) = session {
            builder = builder.header(COOKIE, format!("{}={}", SESSION_COOKIE, session));
        }

        let response = builder.send().await?;
        self.capture_session(&response);
        Ok(response)
    }

    async fn ensure_fresh_token(&self) -> Result<(), RuqqusClientError> {
        let mut token = self.token.lock().await;
        if token.needs_refresh() {
            debug!("access token near expiry, refreshing before call");
            token.refresh().await?;
        }
        Ok(())
    }

    async fn auth_header(&self) -> String {
        let token = self.token.lock().await;
        format!("{} {}", token.token_type(), token.access_token())
    }

    fn capture_session(&self, response: &Response) {
        for value in response.headers().get_all(SET_COOKIE) {
            let cookie = match value.to_str() {
                Ok(cookie) => cookie,
                Err(_) => continue,
            };
            if let Some(rest) = cookie
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
            {
                let session = rest.split(';').next().unwrap_or_default().to_string();
                debug!("captured session cookie");
                *self.session.lock().unwrap() = Some(session);
            }
        }
    }
}
