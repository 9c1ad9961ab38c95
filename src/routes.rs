//! Endpoint URL table for the Ruqqus REST API.

/// The base Ruqqus URL.
pub const HOME: &str = "https://ruqqus.com";

/// The Ruqqus API version.
pub const API_VERSION: u32 = 1;

/// Resolves the method routes for the Ruqqus REST API.
///
/// The defaults point at ruqqus.com; the base is overridable so the client can
/// be aimed at a self-hosted instance or a local mock server.
#[derive(Debug, Clone)]
pub struct Routes {
    home: String,
    api_base: String,
}

impl Default for Routes {
    fn default() -> Self {
        Self::with_home(HOME)
    }
}

impl Routes {
    /// Builds a route table rooted at the given home URL.
    pub fn with_home(home: &str) -> Self {
        let home = home.trim_end_matches('/').to_string();
        let api_base = format!("{}/api/v{}", home, API_VERSION);
        Self { home, api_base }
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// The endpoint for the POST method to acquire or refresh a token.
    pub fn grant(&self) -> String {
        format!("{}/oauth/grant", self.home)
    }

    /// The endpoint for the GET method to obtain user information.
    pub fn user_info(&self, username: &str) -> String {
        format!("{}/user/{}", self.api_base, username)
    }

    /// The endpoint for the GET method to obtain guild information.
    pub fn guild_info(&self, name: &str) -> String {
        format!("{}/guild/{}", self.api_base, name)
    }

    /// The endpoint for the GET method to obtain post information.
    pub fn post_info(&self, id: &str) -> String {
        format!("{}/post/{}", self.api_base, id)
    }

    /// The endpoint for the GET method to obtain comment information.
    pub fn comment_info(&self, id: &str) -> String {
        format!("{}/comment/{}", self.api_base, id)
    }

    pub fn guild_listing(&self, name: &str) -> String {
        format!("{}/guild/{}/listing", self.api_base, name)
    }

    pub fn guild_comments(&self, name: &str) -> String {
        format!("{}/guild/{}/comments", self.api_base, name)
    }

    pub fn user_listing(&self, username: &str) -> String {
        format!("{}/user/{}/listing", self.api_base, username)
    }

    pub fn user_comments(&self, username: &str) -> String {
        format!("{}/user/{}/comments", self.api_base, username)
    }

    /// The endpoint for the GET method to enumerate all guilds.
    pub fn guilds(&self) -> String {
        format!("{}/guilds", self.api_base)
    }

    /// The endpoint for the GET method over the site-wide post listing.
    pub fn all_listing(&self) -> String {
        format!("{}/all/listing", self.api_base)
    }

    /// The endpoint for the GET method over the personalized front page.
    pub fn front_listing(&self) -> String {
        format!("{}/front/listing", self.api_base)
    }

    /// The endpoint for the GET method to fetch the authenticated account.
    pub fn identity(&self) -> String {
        format!("{}/identity", self.api_base)
    }

    /// The endpoint for the POST method to submit a post.
    pub fn submit(&self) -> String {
        format!("{}/submit", self.api_base)
    }

    /// The endpoint for the POST method to submit a comment.
    pub fn comment(&self) -> String {
        format!("{}/comment", self.api_base)
    }

    pub fn delete_post(&self, id: &str) -> String {
        format!("{}/delete_post/{}", self.api_base, id)
    }

    pub fn delete_comment(&self, id: &str) -> String {
        format!("{}/delete/comment/{}", self.api_base, id)
    }

    pub fn vote_post(&self, id: &str, amount: i64) -> String {
        format!("{}/vote/post/{}/{}", self.api_base, id, amount)
    }

    pub fn vote_comment(&self, id: &str, amount: i64) -> String {
        format!("{}/vote/comment/{}/{}", self.api_base, id, amount)
    }

    /// The endpoint for the GET method to query username availability.
    pub fn username_available(&self, username: &str) -> String {
        format!("{}/api/is_available/{}", self.home, username)
    }

    /// The endpoint for the GET method to query guild name availability.
    pub fn guild_available(&self, name: &str) -> String {
        format!("{}/api/board_available/{}", self.home, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_routes_point_at_ruqqus() {
        let routes = Routes::default();
        assert_eq!(routes.user_info("captain"), "https://ruqqus.com/api/v1/user/captain");
        assert_eq!(routes.grant(), "https://ruqqus.com/oauth/grant");
        assert_eq!(
            routes.guild_available("rust"),
            "https://ruqqus.com/api/board_available/rust"
        );
    }

    #[test]
    fn custom_home_rebases_every_route() {
        let routes = Routes::with_home("http://127.0.0.1:9999/");
        assert_eq!(routes.vote_post("abc", -1), "http://127.0.0.1:9999/api/v1/vote/post/abc/-1");
        assert_eq!(routes.identity(), "http://127.0.0.1:9999/api/v1/identity");
    }
}
