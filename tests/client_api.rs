//! Integration tests driving the client against a mock HTTP server.

use ruqrust::client::{Client, ListingOptions, PostOptions, RuqqusClientError};
use ruqrust::models::{Comment, ItemBase, Post, Submission};
use ruqrust::routes::Routes;
use ruqrust::token::Token;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn far_future() -> i64 {
    chrono::Utc::now().timestamp() + 3600
}

fn stale_token(server: &MockServer) -> Token {
    Token::from_value(json!({
        "client_id": "app-id",
        "client_secret": "app-secret",
        "grant_url": format!("{}/oauth/grant", server.uri()),
        "data": {
            "access_token": "stale-token",
            "refresh_token": "refresh-abc",
            "token_type": "Bearer",
            "expires_at": 0,
            "scopes": "identity,read,create,vote"
        }
    }))
    .expect("token payload deserializes")
}

/// Mounts the grant endpoint (answering the eager refresh at construction
/// and any pre-flight refresh later) and builds a client against the mock.
async fn client_for(server: &MockServer) -> Client {
    Mock::given(method("POST"))
        .and(path("/oauth/grant"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "refresh_token": "refresh-abc",
            "token_type": "Bearer",
            "expires_at": far_future(),
            "scopes": "identity,read,create,vote"
        })))
        .mount(server)
        .await;

    Client::with_routes(stale_token(server), Routes::with_home(&server.uri()))
        .await
        .expect("client construction succeeds against the mock grant endpoint")
}

async fn non_grant_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() != "/oauth/grant")
        .count()
}

#[tokio::test]
async fn get_user_issues_one_get_and_echoes_the_username() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user/captain_f"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "username": "captain_f",
            "post_count": 3,
            "comment_rep": 40,
            "post_rep": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let user = client.get_user("captain_f").await.unwrap();
    assert_eq!(user.username(), "captain_f");
    assert_eq!(user.post_count(), 3);
    assert_eq!(user.total_rep(), 42);
}

#[tokio::test]
async fn invalid_identifiers_never_reach_the_network() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;

    assert!(matches!(
        client.get_user("bad name").await,
        Err(RuqqusClientError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.get_guild("_nope").await,
        Err(RuqqusClientError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.get_post("no!pe").await,
        Err(RuqqusClientError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.get_comment("").await,
        Err(RuqqusClientError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.vote_post("no!pe", 1).await,
        Err(RuqqusClientError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.delete_comment("no!pe").await,
        Err(RuqqusClientError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.each_user_post("abc", |_| true).await,
        Err(RuqqusClientError::InvalidArgument(_))
    ));
    assert!(matches!(
        client
            .each_guild_post("ab", ListingOptions::default(), |_| true)
            .await,
        Err(RuqqusClientError::InvalidArgument(_))
    ));
    assert!(!client.username_available("bad name").await);

    assert_eq!(non_grant_requests(&server).await, 0);
}

#[tokio::test]
async fn construction_eagerly_refreshes_and_fires_the_callback() {
    let server = MockServer::start().await;
    let refreshed = Arc::new(AtomicBool::new(false));

    Mock::given(method("POST"))
        .and(path("/oauth/grant"))
        .and(body_string_contains("grant_type=refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "expires_at": far_future()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut token = stale_token(&server);
    let flag = refreshed.clone();
    token.on_refresh(move |_| flag.store(true, Ordering::SeqCst));

    let client = Client::with_routes(token, Routes::with_home(&server.uri()))
        .await
        .unwrap();
    assert!(refreshed.load(Ordering::SeqCst));
    assert_eq!(client.token().lock().await.access_token(), "fresh-token");
}

#[tokio::test]
async fn construction_fails_fast_on_bad_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/grant"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({})))
        .mount(&server)
        .await;

    let result = Client::with_routes(stale_token(&server), Routes::with_home(&server.uri())).await;
    assert!(matches!(result, Err(RuqqusClientError::AuthError(_))));
}

#[tokio::test]
async fn enumeration_pages_until_a_short_page() {
    let server = MockServer::start().await;
    for (page, size) in [(1, 25), (2, 25), (3, 10)] {
        let items: Vec<Value> = (0..size)
            .map(|i| json!({ "id": format!("p{}_{}", page, i), "guild_name": "rust" }))
            .collect();
        Mock::given(method("GET"))
            .and(path("/api/v1/guild/rust/listing"))
            .and(query_param("page", page.to_string()))
            .and(query_param("sort", "new"))
            .and(query_param("t", "all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": items })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = client_for(&server).await;
    let mut seen = 0usize;
    client
        .each_guild_post("rust", ListingOptions::default(), |_| {
            seen += 1;
            true
        })
        .await
        .unwrap();

    assert_eq!(seen, 60);
    assert_eq!(non_grant_requests(&server).await, 3);
}

#[tokio::test]
async fn enumeration_stops_silently_on_a_provider_error() {
    let server = MockServer::start().await;
    let items: Vec<Value> = (0..25).map(|i| json!({ "id": format!("p{}", i) })).collect();
    Mock::given(method("GET"))
        .and(path("/api/v1/user/captain_f/listing"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": items })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user/captain_f/listing"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "error": "rate limited" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mut seen = 0usize;
    client
        .each_user_post("captain_f", |_| {
            seen += 1;
            true
        })
        .await
        .unwrap();
    assert_eq!(seen, 25);
}

#[tokio::test]
async fn enumeration_stops_when_the_consumer_declines() {
    let server = MockServer::start().await;
    let items: Vec<Value> = (0..25).map(|i| json!({ "id": format!("p{}", i) })).collect();
    Mock::given(method("GET"))
        .and(path("/api/v1/all/listing"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": items })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let mut seen = 0usize;
    client
        .each_post(ListingOptions::default(), |_| {
            seen += 1;
            seen < 10
        })
        .await
        .unwrap();
    assert_eq!(seen, 10);
    assert_eq!(non_grant_requests(&server).await, 1);
}

#[tokio::test]
async fn create_post_requires_some_content() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;

    let result = client
        .create_post("rust", "a title", None, PostOptions::default())
        .await;
    assert!(matches!(result, Err(RuqqusClientError::InvalidArgument(_))));

    let options = PostOptions {
        url: Some("not a uri".to_string()),
        ..PostOptions::default()
    };
    let result = client.create_post("rust", "a title", None, options).await;
    assert!(matches!(result, Err(RuqqusClientError::InvalidArgument(_))));

    assert_eq!(non_grant_requests(&server).await, 0);
}

#[tokio::test]
async fn create_post_with_a_link_echoes_the_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/submit"))
        .and(body_partial_json(json!({
            "board": "rust",
            "title": "a title",
            "url": "https://example.com/article"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "2v0b",
            "title": "a title",
            "url": "https://example.com/article",
            "guild_name": "rust"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let options = PostOptions {
        url: Some("https://example.com/article".to_string()),
        ..PostOptions::default()
    };
    // The leading + of the guild name is stripped before dispatch.
    let post = client
        .create_post("+rust", "a title", None, options)
        .await
        .unwrap()
        .expect("submission succeeds");
    assert_eq!(post.url(), Some("https://example.com/article"));
    assert_eq!(post.id(), "2v0b");
}

#[tokio::test]
async fn create_post_swallows_a_submission_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/submit"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({ "error": "slow down" })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let result = client
        .create_post("rust", "a title", Some("text body"), PostOptions::default())
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn comments_carry_the_right_parent_fullname() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/comment"))
        .and(body_partial_json(json!({
            "submission": "2v0b",
            "parent_fullname": "t2_2v0b",
            "body": "nice post"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "3f9a", "post": "2v0b", "level": 1
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/comment"))
        .and(body_partial_json(json!({
            "submission": "2v0b",
            "parent_fullname": "t3_3f9a",
            "body": "nice comment"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "4g0b", "post": "2v0b", "level": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let post = Post::from_value(json!({ "id": "2v0b", "fullname": "t2_2v0b" }));

    let comment = client
        .create_comment("nice post", &post, None)
        .await
        .unwrap()
        .expect("submission succeeds");
    assert_eq!(comment.id(), "3f9a");
    assert!(comment.is_parent_post());

    let parent =
        Comment::from_value(json!({ "id": "3f9a", "fullname": "t3_3f9a", "post": "2v0b" }));
    let reply = client
        .create_comment("nice comment", &post, Some(&parent))
        .await
        .unwrap()
        .expect("submission succeeds");
    assert_eq!(reply.level(), 2);
}

#[tokio::test]
async fn empty_comment_bodies_are_rejected_before_dispatch() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;
    let post = Post::from_value(json!({ "id": "2v0b", "fullname": "t2_2v0b" }));

    let result = client.create_comment("", &post, None).await;
    assert!(matches!(result, Err(RuqqusClientError::InvalidArgument(_))));
    assert_eq!(non_grant_requests(&server).await, 0);
}

#[tokio::test]
async fn votes_clamp_before_dispatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/vote/post/2v0b/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/vote/post/2v0b/-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(client.vote_post("2v0b", 5).await.unwrap());
    assert!(client.vote_post("2v0b", -99).await.unwrap());
}

#[tokio::test]
async fn vote_success_means_no_error_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/vote/comment/3f9a/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "error": "archived" })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(!client.vote_comment("3f9a", 1).await.unwrap());
}

#[tokio::test]
async fn deletion_trusts_the_empty_body_signal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/delete_post/2v0b"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/delete/comment/3f9a"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "error": "not yours" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(client.delete_post("2v0b").await.unwrap());
    assert!(!client.delete_comment("3f9a").await.unwrap());
}

#[tokio::test]
async fn missing_objects_map_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/post/deadbeef"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "404" })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(matches!(
        client.get_post("deadbeef").await,
        Err(RuqqusClientError::NotFound(_))
    ));
}

#[tokio::test]
async fn lazy_relations_fetch_once_and_memoize() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/post/2v0b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "2v0b", "title": "the post"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let comment = Comment::from_value(json!({ "id": "3f9a", "post": "2v0b", "level": 1 }));

    let first = comment.post(&client).await.unwrap().expect("post resolves");
    assert_eq!(first.title(), "the post");
    let second = comment.post(&client).await.unwrap().expect("post resolves");
    assert_eq!(second.id(), "2v0b");

    // A deleted author short-circuits without a network call.
    assert!(comment.author(&client).await.unwrap().is_none());
    assert_eq!(non_grant_requests(&server).await, 1);
}

#[tokio::test]
async fn each_post_comment_filters_the_guild_stream() {
    let server = MockServer::start().await;
    let comments = json!({ "data": [
        { "id": "c1", "post": "2v0b", "level": 1 },
        { "id": "c2", "post": "other", "level": 1 },
        { "id": "c3", "post": "2v0b", "level": 2 }
    ]});
    Mock::given(method("GET"))
        .and(path("/api/v1/guild/rust/comments"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(comments))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let post = Post::from_value(json!({ "id": "2v0b", "guild_name": "rust" }));
    let mut ids = Vec::new();
    client
        .each_post_comment(&post, |comment| {
            ids.push(comment.id().to_string());
            true
        })
        .await
        .unwrap();
    assert_eq!(ids, vec!["c1", "c3"]);
}

#[tokio::test]
async fn session_cookie_rides_along_once_captured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/guild/rust"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "g1", "name": "rust" }))
                .insert_header("set-cookie", "session_ruqqus=abc123; Path=/"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user/captain_f"))
        .and(header("cookie", "session_ruqqus=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1", "username": "captain_f"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client.get_guild("rust").await.unwrap();
    client.get_user("captain_f").await.unwrap();
}

#[tokio::test]
async fn identity_is_memoized_for_the_client_lifetime() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/identity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1", "username": "captain_f"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert_eq!(client.get_identity().await.unwrap().username(), "captain_f");
    assert_eq!(client.get_identity().await.unwrap().username(), "captain_f");
    assert_eq!(non_grant_requests(&server).await, 1);
}

#[tokio::test]
async fn availability_is_keyed_by_the_queried_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/board_available/rustaceans"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rustaceans": true })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/is_available/captain_f"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "captain_f": false })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(client.guild_available("rustaceans").await);
    assert!(!client.username_available("captain_f").await);
}

#[tokio::test]
async fn post_from_url_extracts_the_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/post/2v0b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "2v0b" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let post = client
        .post_from_url("https://ruqqus.com/post/2v0b/some-title")
        .await
        .unwrap();
    assert_eq!(post.id(), "2v0b");

    assert!(matches!(
        client.comment_from_url("https://ruqqus.com/guild/rust").await,
        Err(RuqqusClientError::InvalidArgument(_))
    ));
}
