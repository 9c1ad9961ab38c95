//! Rust wrapper for the Ruqqus API.
//!
//! The entry point is [`Client`], built from a persisted [`Token`] or a
//! one-time authorization code; [`oauth`] has the helpers for obtaining one
//! interactively. Entities come back as the types in [`models`] and can
//! lazily resolve their relations through the client:
//!
//! ```no_run
//! use ruqrust::models::Submission;
//!
//! # async fn run() -> Result<(), ruqrust::RuqqusClientError> {
//! let token = ruqrust::Token::load("token.json")?;
//! let client = ruqrust::Client::new(token).await?;
//!
//! let post = client.get_post("2v0b").await?;
//! println!("{} (+{}/-{})", post.title(), post.upvotes(), post.downvotes());
//! if let Some(author) = post.author(&client).await? {
//!     println!("written by {}", author.username());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod imgur;
pub mod models;
pub mod oauth;
pub mod routes;
pub mod token;
pub mod validation;

pub use client::{Client, ListingOptions, PostOptions, RuqqusClientError};
pub use token::Token;
