//! Slack workflow command line.
//!
//! A thin driver over [`Session`] for the launcher and for manual use. Results
//! go to stdout, logs to stderr.

use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use slack_workflow::emoji::EmojiImage;
use slack_workflow::models::Presence;
use slack_workflow::{AppError, Config, Session, SlackClient};

#[derive(Parser)]
#[command(name = "slack-workflow")]
#[command(about = "Query and update a Slack workspace from a launcher", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the API token
    Token { token: String },
    /// Refresh the cached workspace snapshot
    Refresh {
        /// Refresh even if the cache is recent
        #[arg(long)]
        force: bool,
    },
    /// List channels, joined channels first
    Channels,
    /// List users, optionally only the members of a channel
    Users {
        #[arg(long)]
        channel: Option<String>,
    },
    /// List the pins of a channel
    Pins { channel: String },
    /// Show, set or toggle your presence
    Presence { state: Option<PresenceArg> },
    /// Show or set your status
    Status {
        text: Option<String>,
        #[arg(long, default_value = "")]
        emoji: String,
    },
    /// Open a direct message with a user and print its deep link
    Dm { user: String },
    /// Locate the image for an emoji, or list every known emoji name
    Emoji { name: Option<String> },
    /// Erase the token and all cached data
    Reset,
}

#[derive(Clone, Copy, ValueEnum)]
enum PresenceArg {
    Active,
    Away,
    Toggle,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Using config file {:?}", config.config_file());
    tracing::debug!("Using cache file {:?}", config.snapshot_file());

    let api = Arc::new(SlackClient::from_config(&config)?);
    let mut session = Session::open(config, api).await;

    if let Err(e) = run(cli.command, &mut session).await {
        if matches!(e, AppError::MissingToken) {
            eprintln!("No API token stored; run `slack-workflow token <TOKEN>` first");
        }
        return Err(e.into());
    }

    Ok(())
}

async fn run(command: Commands, session: &mut Session) -> Result<(), AppError> {
    match command {
        Commands::Token { token } => {
            session.set_token(&token).await?;
            println!("Token saved!");
        }
        Commands::Refresh { force } => {
            if force {
                session.refresh().await?;
            } else {
                session.ensure_fresh().await?;
            }
            let snapshot = session.snapshot();
            println!(
                "{} channels, {} users",
                snapshot.channels.len(),
                snapshot.users.len()
            );
        }
        Commands::Channels => {
            session.ensure_fresh().await?;
            let snapshot = session.snapshot();
            let me = &snapshot.identity.user_id;

            let mut channels: Vec<_> = snapshot.channels.iter().collect();
            channels.sort_by_key(|c| (!c.is_member(me), c.name.clone()));
            for channel in channels {
                let marker = if channel.is_member(me) { "*" } else { " " };
                println!("{} {}\t{}\t{}", marker, channel.name, channel.id, channel.topic);
            }
        }
        Commands::Users { channel } => {
            session.ensure_fresh().await?;
            let snapshot = session.snapshot();
            let channel = match channel {
                Some(id) => Some(
                    snapshot
                        .find_channel(&id)
                        .ok_or_else(|| AppError::NotFound(format!("channel {}", id)))?,
                ),
                None => None,
            };

            let mut users: Vec<_> = snapshot
                .users
                .iter()
                .filter(|u| u.is_addressable())
                .filter(|u| channel.map_or(true, |c| c.is_member(&u.id)))
                .collect();
            users.sort_by_key(|u| (u.presence != Presence::Active, u.name.clone()));
            let identity = &snapshot.identity;
            for user in users {
                let marker = if identity.is_current_user(&user.id) { "*" } else { " " };
                println!(
                    "{} {}\t{}\t{}\t{}\t{}",
                    marker,
                    user.presence,
                    user.name,
                    user.real_name,
                    identity.user_link(&user.id),
                    user.status_text
                );
            }
        }
        Commands::Pins { channel } => {
            for pin in session.list_pins(&channel).await? {
                println!("{}\t{}", pin.title(), pin.target_url().unwrap_or_default());
            }
        }
        Commands::Presence { state } => match state {
            Some(state) => {
                session.ensure_fresh().await?;
                let presence = match state {
                    PresenceArg::Toggle => session.toggle_presence().await?,
                    PresenceArg::Active | PresenceArg::Away => {
                        let presence = if matches!(state, PresenceArg::Active) {
                            Presence::Active
                        } else {
                            Presence::Away
                        };
                        session.set_presence(presence).await?;
                        presence
                    }
                };
                println!("Presence set to {}", presence);
            }
            None => {
                let presence = session.own_presence().await?;
                println!("{}", presence);
            }
        },
        Commands::Status { text, emoji } => {
            session.ensure_fresh().await?;
            match text {
                Some(text) => {
                    session.set_status(&text, &emoji).await?;
                    if text.is_empty() {
                        println!("Status message cleared");
                    } else {
                        println!("Status set to {}", text);
                    }
                }
                None => {
                    let me = session
                        .snapshot()
                        .current_user()
                        .ok_or_else(|| AppError::NotFound("current user".to_string()))?;
                    println!("{}\t{}\t{}", me.presence, me.status_emoji, me.status_text);
                }
            }
        }
        Commands::Dm { user } => {
            session.ensure_fresh().await?;
            println!("{}", session.open_direct_message(&user).await?);
        }
        Commands::Emoji { name: Some(name) } => match session.emoji_image(&name).await? {
            EmojiImage::File(path) => println!("{}", path.display()),
            EmojiImage::Sprite { path, cell } => println!(
                "{}\tsprite {}x{}+{}+{}",
                path.display(),
                cell.width,
                cell.height,
                cell.x,
                cell.y
            ),
        },
        Commands::Emoji { name: None } => {
            session.ensure_emoji().await?;
            match session.emoji_store().sprites().await {
                Ok(sprites) => {
                    for name in sprites.names() {
                        println!(":{}:", name);
                    }
                }
                Err(e) => tracing::warn!("Unable to read sprite index: {}", e),
            }
            for emoji in &session.snapshot().emoji {
                println!(":{}:\tcustom", emoji.name);
            }
        }
        Commands::Reset => {
            session.reset().await?;
            println!("The Slack workflow has been reset");
        }
    }

    Ok(())
}
