use clap::Parser;
use tracing_subscriber::EnvFilter;

use trendmorph::api::{Credentials, Registration};
use trendmorph::chat::{ChatSession, Topic};
use trendmorph::config::{ChatAction, Cli, Command, Config};
use trendmorph::error::ApiError;
use trendmorph::state::AppState;
use trendmorph::trends::PlatformFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args first so --verbose can pick the default level
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = Config::load(&cli)?;
    std::fs::create_dir_all(config.storage_dir())?;
    let state = AppState::open(config)?;

    if let Err(err) = run(cli.command, &state).await {
        match err.downcast_ref::<ApiError>() {
            Some(api_err) => {
                eprintln!("Error: {}", api_err.user_message());
                if api_err.requires_login() {
                    eprintln!("Run `trendmorph login` to sign in again.");
                }
            }
            None => eprintln!("Error: {:#}", err),
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: Command, state: &AppState) -> anyhow::Result<()> {
    match command {
        Command::Login { username, password } => {
            state
                .api
                .login(&Credentials { username, password })
                .await?;
            println!("Logged in.");
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            state
                .api
                .register(&Registration {
                    username,
                    email,
                    password,
                })
                .await?;
            println!("Account created. You can now log in.");
        }
        Command::Logout => {
            state.api.logout().await?;
            println!("Logged out.");
        }
        Command::Profile => {
            let profile = state.api.profile().await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Command::Session => {
            let session = state.api.current_session().await?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        Command::Verify { token } => {
            let token = match token {
                Some(token) => token,
                None => state
                    .session
                    .access_token()
                    .await
                    .ok_or_else(|| anyhow::anyhow!("Not logged in"))?,
            };
            let result = state.api.verify_token(&token).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::GoogleUrl => {
            println!("Open this URL to sign in with Google:");
            let client_id = state.config.backend.oauth_client_id.as_deref();
            println!("{}", state.api.google_login_url(client_id));
        }
        Command::GoogleCallback { code, state: oauth_state } => {
            state
                .api
                .google_callback(&code, oauth_state.as_deref())
                .await?;
            println!("Logged in with Google.");
        }
        Command::Trends { niche, platform } => {
            let filter: PlatformFilter = platform.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let report = state.aggregator.collect(&niche, filter).await;
            if let Some(ref err) = report.error {
                anyhow::bail!("{}", err);
            }
            for failure in &report.failures {
                eprintln!("{} unavailable: {}", failure.platform, failure.reason);
            }
            if report.items.is_empty() {
                println!("No trending content found for {}.", niche);
            }
            for item in &report.items {
                println!("[{}] {}", item.platform, item.title);
                println!("    {}", item.url);
                if !item.hashtags.is_empty() {
                    println!("    {}", item.hashtags.join(" "));
                }
            }
        }
        Command::Niches => {
            for category in state.aggregator.discover_categories().await {
                println!(
                    "{} {:<14} {:>4}  {}",
                    category.icon, category.title, category.count, category.description
                );
            }
        }
        Command::Hashtags { niche, platform } => {
            let tags = state.api.hashtags(&niche, platform.as_deref()).await?;
            if tags.is_empty() {
                println!("No hashtags found for {}.", niche);
            } else {
                println!("{}", tags.join(" "));
            }
        }
        Command::Captions { niche, platform } => {
            let ideas = state.api.captions(&niche, platform.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&ideas)?);
        }
        Command::Chat { action } => run_chat(action, state).await?,
        Command::Caption { image } => {
            let result = state.captions.generate(&image).await?;
            println!("Description: {}", result.description);
            println!("Caption & hashtags: {}", result.caption_hashtags);
        }
        Command::Health => {
            let checks = state.keepalive.initial_checks().await;
            for (name, status) in checks {
                let mark = if status.available { "up" } else { "down" };
                println!("{:<8} {:<5} {}", name, mark, status.status);
            }
        }
        Command::Keepalive => {
            for (name, status) in state.keepalive.initial_checks().await {
                tracing::info!("{}: {}", name, status.status);
            }
            state.keepalive.start().await;
            tracing::info!("Pinging {:?}; press Ctrl-C to stop", state.keepalive.status().await);
            tokio::signal::ctrl_c().await?;
            state.keepalive.stop().await;
        }
    }
    Ok(())
}

async fn run_chat(action: ChatAction, state: &AppState) -> anyhow::Result<()> {
    let chats = &state.chats;
    match action {
        ChatAction::New { niche, platform } => {
            let session = chats.start_session(Topic::new(niche, platform)).await?;
            print_chat(&session);
        }
        ChatAction::Send { message } => {
            let reply = chats.send(&message).await?;
            println!("{}", reply.content);
        }
        ChatAction::Image { path } => {
            let reply = chats.attach_image(&path).await?;
            println!("{}", reply.content);
        }
        ChatAction::List => {
            let current = chats.store().lock().await.state().current_chat_id.clone();
            for chat in chats.list().await {
                let marker = if current.as_deref() == Some(chat.id.as_str()) { "*" } else { " " };
                println!(
                    "{} {}  {}  ({} messages)",
                    marker,
                    chat.id,
                    chat.title,
                    chat.messages.len()
                );
            }
        }
        ChatAction::History => {
            let entries = chats.history().await?;
            if entries.is_empty() {
                println!("No chat history yet.");
            }
            for entry in entries {
                let when = entry
                    .created_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!("{}  {}  {}", entry.id, when, entry.title);
                println!("    {} ({} messages)", entry.preview, entry.message_count);
            }
        }
        ChatAction::Open { id } => {
            let session = chats.open(&id).await?;
            print_chat(&session);
        }
        ChatAction::Reset => {
            chats.store().lock().await.reset()?;
            println!("Cleared the current chat selection.");
        }
        ChatAction::DeleteMessage { id } => {
            state.api.delete_history_message(&id).await?;
            println!("Deleted message {}.", id);
        }
        ChatAction::Delete { id } => {
            if chats.delete(&id).await? {
                println!("Deleted chat {}.", id);
            } else {
                println!("No chat {} stored locally.", id);
            }
        }
    }
    Ok(())
}

fn print_chat(session: &ChatSession) {
    println!("Chat {}: {}", session.id, session.title);
    for message in &session.messages {
        println!("[{}] {}", message.role.as_str(), message.content);
    }
}
