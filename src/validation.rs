//! Syntactic validators applied before any network dispatch.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// A regular expression used for username validation.
    pub static ref VALID_USERNAME: Regex = Regex::new(r"^[a-zA-Z0-9_]{5,25}$").unwrap();

    /// A regular expression used for password validation.
    pub static ref VALID_PASSWORD: Regex = Regex::new(r"^.{8,100}$").unwrap();

    /// A regular expression used for guild name validation.
    pub static ref VALID_GUILD: Regex = Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_]{2,24}$").unwrap();

    /// A regular expression used for post/comment ID validation.
    pub static ref VALID_POST: Regex = Regex::new(r"^[A-Za-z0-9]+$").unwrap();

    /// Captures the ID of a post from a Ruqqus URL.
    static ref POST_URL: Regex = Regex::new(r"/post/([A-Za-z0-9]+)/?").unwrap();

    /// Captures the ID of a comment from a Ruqqus URL.
    static ref COMMENT_URL: Regex = Regex::new(r"/post/.+/.+/([A-Za-z0-9]+)/?").unwrap();
}

pub fn valid_username(username: &str) -> bool {
    VALID_USERNAME.is_match(username)
}

pub fn valid_password(password: &str) -> bool {
    VALID_PASSWORD.is_match(password)
}

pub fn valid_guild_name(name: &str) -> bool {
    VALID_GUILD.is_match(name)
}

pub fn valid_post_id(id: &str) -> bool {
    VALID_POST.is_match(id)
}

/// Extracts the post ID from a canonical post URL, or `None` when the link is
/// not shaped like one.
pub fn post_id_from_url(url: &str) -> Option<&str> {
    POST_URL.captures(url).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Extracts the comment ID from a canonical comment URL.
pub fn comment_id_from_url(url: &str) -> Option<&str> {
    COMMENT_URL.captures(url).and_then(|c| c.get(1)).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(valid_username("captain_falcon"));
        assert!(valid_username("abc12"));
        assert!(!valid_username("abcd")); // too short
        assert!(!valid_username("has a space"));
        assert!(!valid_username("punctuation!"));
        assert!(!valid_username(&"x".repeat(26)));
    }

    #[test]
    fn guild_names() {
        assert!(valid_guild_name("rust"));
        assert!(valid_guild_name("Ruqqus_Feedback"));
        assert!(!valid_guild_name("_underscore_first"));
        assert!(!valid_guild_name("ab"));
        assert!(!valid_guild_name("no spaces"));
    }

    #[test]
    fn post_ids() {
        assert!(valid_post_id("2v0b"));
        assert!(!valid_post_id(""));
        assert!(!valid_post_id("ab!cd"));
    }

    #[test]
    fn passwords() {
        assert!(valid_password("12345678"));
        assert!(!valid_password("short"));
        assert!(!valid_password(&"x".repeat(101)));
    }

    #[test]
    fn url_captures() {
        assert_eq!(post_id_from_url("https://ruqqus.com/post/2v0b/some-title"), Some("2v0b"));
        assert_eq!(post_id_from_url("https://ruqqus.com/post/2v0b"), Some("2v0b"));
        assert_eq!(post_id_from_url("https://ruqqus.com/guild/rust"), None);
        assert_eq!(
            comment_id_from_url("https://ruqqus.com/post/2v0b/some-title/3f9a"),
            Some("3f9a")
        );
        assert_eq!(comment_id_from_url("https://ruqqus.com/post/2v0b/some-title"), None);
    }
}
