use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::*;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use jkchat_core::render::{message_html, transcript_html};
use jkchat_core::{
    format_message, send_message, typewriter, ChatRole, ChatStore, Config, HttpCompletionService,
    Outcome, Provider, Session, SqliteStore, Theme,
};

#[derive(Parser)]
#[command(name = "jkchat")]
#[command(about = "Chat client with saved conversations and formatted replies")]
struct Cli {
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Chat server base URL
    #[arg(long, env = "JKCHAT_SERVER", global = true)]
    server: Option<String>,
    /// Chat database file (defaults to the user data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Chat(ChatCommand),
    /// Format text from stdin as reply HTML
    Format,
    /// List available providers
    Providers,
}

/// Commands that work on the saved chats
#[derive(Subcommand)]
enum ChatCommand {
    /// Send a message in the current chat
    Send {
        message: String,
        /// Provider the server should use (gemini, openrouter)
        #[arg(short, long)]
        provider: Option<String>,
        /// Reply language
        #[arg(short, long)]
        lang: Option<String>,
        /// Print the reply at once instead of typing it out
        #[arg(long)]
        no_animate: bool,
    },
    /// List chats
    List {
        /// Only chats whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Start a new chat
    New,
    /// Make another chat current
    Switch { id: String },
    /// Rename a chat
    Rename { id: String, name: String },
    /// Delete a chat
    Delete { id: String },
    /// Clear the current chat's history
    Clear,
    /// Print the current chat
    Show {
        /// Print each message as formatted HTML
        #[arg(long)]
        html: bool,
    },
    /// Write the current chat as an HTML page
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show, set or toggle the export theme
    Theme {
        /// light or dark; toggles when omitted
        theme: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not read config, using defaults");
        Config::default()
    });

    match cli.command {
        Commands::Format => format_stdin()?,
        Commands::Providers => list_providers(&config),
        Commands::Chat(command) => {
            let mut session = open_session(cli.db)?;
            let server = cli.server.unwrap_or_else(|| config.server_url.clone());
            run(command, &mut session, &config, &server).await?;
        }
    }

    Ok(())
}

async fn run(
    command: ChatCommand,
    session: &mut Session<SqliteStore>,
    config: &Config,
    server: &str,
) -> Result<()> {
    match command {
        ChatCommand::Send {
            message,
            provider,
            lang,
            no_animate,
        } => {
            let provider = match provider {
                Some(name) => {
                    Provider::from_str(&name).ok_or_else(|| anyhow!("Unknown provider: {}", name))?
                }
                None => config.provider(),
            };
            let lang = lang.unwrap_or_else(|| config.lang.clone());
            let speed = Duration::from_millis(config.typing_speed_ms.max(1));
            send(session, server, &message, &lang, provider, !no_animate, speed).await?;
        }
        ChatCommand::List { search } => list_chats(session, search.as_deref()),
        ChatCommand::New => {
            let id = session.new_chat()?;
            println!("✨ Started chat {}", id.bold());
        }
        ChatCommand::Switch { id } => {
            session.switch_to(&id)?;
            println!("💬 Now in {}", session.current().name.bold());
        }
        ChatCommand::Rename { id, name } => {
            if session.rename(&id, &name)? {
                println!("✏️  Renamed {} to {}", id.dimmed(), name.trim().bold());
            } else {
                println!("{}", "Name unchanged".yellow());
            }
        }
        ChatCommand::Delete { id } => {
            session.delete(&id)?;
            println!("🗑  Deleted {}", id.dimmed());
        }
        ChatCommand::Clear => {
            session.clear()?;
            println!("🧹 Cleared {}", session.current().name.bold());
        }
        ChatCommand::Show { html } => show_chat(session, html),
        ChatCommand::Export { output } => {
            let theme = session.store().theme()?;
            let html = transcript_html(session.current(), theme);
            match output {
                Some(path) => {
                    fs::write(&path, html)?;
                    println!("📄 Wrote {}", path.display());
                }
                None => print!("{}", html),
            }
        }
        ChatCommand::Theme { theme } => {
            let current = session.store().theme()?;
            let next = match theme {
                Some(name) => {
                    Theme::from_str(&name).ok_or_else(|| anyhow!("Unknown theme: {}", name))?
                }
                None => current.toggled(),
            };
            session.store_mut().set_theme(next)?;
            println!("🎨 Theme: {}", next.as_str().bold());
        }
    }
    Ok(())
}

fn format_stdin() -> Result<()> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    println!("{}", format_message(&input));
    Ok(())
}

fn open_session(db: Option<PathBuf>) -> Result<Session<SqliteStore>> {
    let store = match db {
        Some(path) => SqliteStore::open(&path)?,
        None => SqliteStore::open_default()?,
    };
    Session::load(ChatStore::new(store))
}

async fn send(
    session: &mut Session<SqliteStore>,
    server: &str,
    message: &str,
    lang: &str,
    provider: Provider,
    animate: bool,
    speed: Duration,
) -> Result<()> {
    let service = HttpCompletionService::new(server);

    println!("{} {}", "You:".bold().blue(), message.trim());
    println!("{}", format!("🤖 {} is typing...", provider.display_name()).dimmed());

    match send_message(session, &service, message, lang, provider).await? {
        Outcome::Reply(reply) => {
            print!("{} ", "Assistant:".bold().green());
            if animate {
                let mut shown = 0;
                typewriter::play(&reply, speed, |prefix| {
                    print!("{}", &prefix[shown..]);
                    let _ = io::stdout().flush();
                    shown = prefix.len();
                })
                .await;
                println!();
            } else {
                println!("{}", reply);
            }
        }
        Outcome::Failed(text) => println!("{}", text.red()),
        Outcome::Ignored => println!("{}", "Nothing to send".yellow()),
    }
    Ok(())
}

fn list_chats(session: &Session<SqliteStore>, search: Option<&str>) {
    let chats: Vec<_> = match search {
        Some(query) => session.search(query),
        None => session.chats().iter().collect(),
    };

    println!("\n{}", "💬 Chats".bold().blue());
    println!("{}", "=".repeat(30).dimmed());

    if chats.is_empty() {
        println!("{}", "No chats found".red());
        return;
    }

    for chat in chats {
        let marker = if chat.id == session.current_id() { "▶" } else { " " };
        println!(
            "{} {} {} {}",
            marker.green(),
            chat.id.dimmed(),
            chat.name.bold(),
            format!("({} messages)", chat.history.len()).dimmed()
        );
    }
}

fn show_chat(session: &Session<SqliteStore>, html: bool) {
    println!("\n{}", format!("💬 {}", session.current().name).bold().blue());
    println!("{}", "=".repeat(30).dimmed());

    if session.history().is_empty() {
        println!("{}", "How can I help you today?".dimmed());
        return;
    }

    for message in session.history() {
        if html {
            println!("{}", message_html(message));
            continue;
        }
        let label = match message.role {
            ChatRole::User => "You:".bold().blue(),
            ChatRole::Assistant => "Assistant:".bold().green(),
        };
        println!("\n{} {}", label, message.text);
    }
}

fn list_providers(config: &Config) {
    println!("\n{}", "🤖 Available Providers".bold().blue());
    println!("{}", "=".repeat(30).dimmed());

    let current = config.provider();
    for provider in Provider::all() {
        let marker = if provider == current { "▶" } else { " " };
        println!(
            "{} {} {}",
            marker.green(),
            provider.as_str().bold(),
            provider.display_name().dimmed()
        );
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();
}
