use clap::Parser;
use log::{error, info};
use ruqrust::client::{ListingOptions, PostOptions};
use ruqrust::config::AppConfig;
use ruqrust::models::{ItemBase, Submission};
use ruqrust::oauth::{self, Scope};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "ruqrust",
    version,
    about = "Rust wrapper for the Ruqqus API.",
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Open the consent page in a browser and wait for the authorization
    /// code on a localhost redirect. Run this once, then export the printed
    /// code as RUQQUS_AUTH_CODE.
    Authorize,

    /// Fetch a user account.
    User {
        #[arg(help = "Username to look up", required = true)]
        username: String,
    },

    /// Fetch a guild.
    Guild {
        #[arg(help = "Guild name, with or without the leading +", required = true)]
        name: String,
    },

    /// Fetch a single post.
    Post {
        #[arg(help = "Post ID", required = true)]
        id: String,
    },

    /// List the newest posts of a guild.
    GuildPosts {
        #[arg(help = "Guild name", required = true)]
        name: String,

        #[arg(help = "Number of posts to print", default_value_t = 25)]
        count: usize,
    },

    /// List the personalized front page.
    Front {
        #[arg(help = "Number of posts to print", default_value_t = 25)]
        count: usize,
    },

    /// Create a text or link post in a guild.
    Create {
        #[arg(help = "Guild name", required = true)]
        guild: String,

        #[arg(help = "Post title", required = true)]
        title: String,

        #[arg(long, help = "Text body of the post")]
        body: Option<String>,

        #[arg(long, help = "Link the post points at")]
        url: Option<String>,

        #[arg(long, help = "Path to an image to attach (uploaded via Imgur when IMGUR_CLIENT_ID is set)")]
        image: Option<PathBuf>,
    },

    /// Vote on a post: 1, 0 (retract), or -1.
    Vote {
        #[arg(help = "Post ID", required = true)]
        post_id: String,

        #[arg(help = "Vote value", required = true, allow_hyphen_values = true)]
        value: i64,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig::load();

    if let Commands::Authorize = &cli.command {
        authorize(&config);
        return;
    }

    let client = match config.create_client().await {
        Ok(client) => client,
        Err(err) => {
            error!("Failed to build an authenticated client: {}", err);
            return;
        }
    };

    match &cli.command {
        Commands::Authorize => unreachable!("handled above"),
        Commands::User { username } => match client.get_user(username).await {
            Ok(user) => {
                info!(
                    "@{}: {} posts, {} comments, {} rep",
                    user.username(),
                    user.post_count(),
                    user.comment_count(),
                    user.total_rep()
                );
                for badge in user.badges() {
                    info!("  badge: {}", badge.text());
                }
            }
            Err(err) => error!("Error fetching user: {}", err),
        },
        Commands::Guild { name } => {
            match client.get_guild(name.trim_start_matches('+')).await {
                Ok(guild) => info!(
                    "+{} ({} members, {} guildmasters): {}",
                    guild.name(),
                    guild.member_count(),
                    guild.guildmaster_count(),
                    guild.description()
                ),
                Err(err) => error!("Error fetching guild: {}", err),
            }
        }
        Commands::Post { id } => match client.get_post(id).await {
            Ok(post) => {
                info!(
                    "[{}] {} (+{}/-{}), {} comments",
                    post.created().format("%Y-%m-%d %H:%M:%S"),
                    post.title(),
                    post.upvotes(),
                    post.downvotes(),
                    post.comment_count()
                );
                if let Some(url) = post.url() {
                    info!("links to {}", url);
                }
            }
            Err(err) => error!("Error fetching post: {}", err),
        },
        Commands::GuildPosts { name, count } => {
            info!("Gathering new posts from +{}", name.trim_start_matches('+'));
            let mut seen = 0usize;
            let result = client
                .each_guild_post(name, ListingOptions::default(), |post| {
                    info!("[+{} | {} pts] {}", post.guild_name(), post.score(), post.title());
                    seen += 1;
                    seen < *count
                })
                .await;
            if let Err(err) = result {
                error!("Error fetching posts: {}", err);
            }
        }
        Commands::Front { count } => {
            let mut seen = 0usize;
            let result = client
                .each_home_post(|post| {
                    info!("[+{} | {} pts] {}", post.guild_name(), post.score(), post.title());
                    seen += 1;
                    seen < *count
                })
                .await;
            if let Err(err) = result {
                error!("Error fetching front page: {}", err);
            }
        }
        Commands::Create { guild, title, body, url, image } => {
            let options = PostOptions {
                url: url.clone(),
                image: image.clone(),
                imgur_client_id: config.imgur_client_id.clone(),
            };
            match client.create_post(guild, title, body.as_deref(), options).await {
                Ok(Some(post)) => info!("Post created: {}", post.permalink()),
                Ok(None) => error!("Post submission failed (rate limit or rejected content)"),
                Err(err) => error!("Error creating post: {}", err),
            }
        }
        Commands::Vote { post_id, value } => match client.vote_post(post_id, *value).await {
            Ok(true) => info!("Vote registered"),
            Ok(false) => error!("Vote was not accepted"),
            Err(err) => error!("Error voting: {}", err),
        },
    }
}

fn authorize(config: &AppConfig) {
    let port = config.oauth_port.unwrap_or(8080);
    let redirect = format!("http://localhost:{}", port);
    let scopes = [Scope::Identity, Scope::Read, Scope::Create, Scope::Vote];

    let url = match oauth::authorize_url(&config.require_client_id(), &redirect, &scopes, true, None)
    {
        Ok(url) => url,
        Err(err) => {
            error!("Failed to build the consent URL: {}", err);
            return;
        }
    };

    info!("Opening browser for Ruqqus OAuth authorization...");
    info!("If your browser doesn't open automatically, please visit this URL:");
    info!("{}", url);
    if let Err(err) = oauth::open_browser(&url) {
        error!("Failed to open browser: {}", err);
    }

    match oauth::wait_for_code(port, Duration::from_secs(300)) {
        Some(code) => {
            info!("Authorization code received.");
            println!("export RUQQUS_AUTH_CODE={}", code);
        }
        None => error!("Timed out waiting for the authorization redirect"),
    }
}
