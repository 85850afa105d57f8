mod config;
mod error;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use fstools::Workspace;
use runtime::{
    AnthropicAuth, AnthropicBackend, ContentBlock, Conversation, ToolRegistry, Turn, transcript,
};
use storage::{ConversationId, TranscriptStore};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::{Config, Credentials};
use error::{Error, Result};

const CONFIG_FILE: &str = "skiff.toml";
const DB_FILE: &str = "transcripts.db";
const TITLE_CHARS: usize = 60;
const PREVIEW_CHARS: usize = 200;

#[derive(Parser)]
#[command(name = "skiff")]
#[command(about = "Chat with a model that can read your repository", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the config file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Directory the filesystem tools operate in (overrides tools.root)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Model to use (overrides backend.model)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start or resume an interactive conversation
    Chat {
        /// Conversation ID to resume (prefix match supported)
        #[arg(short, long)]
        conversation: Option<String>,
    },
    /// List stored conversations
    Conversations {
        /// Show only the last N conversations
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Print a stored conversation
    Show {
        /// Conversation ID (prefix match supported)
        id: String,
    },
    /// Print a stored conversation as JSON
    Export {
        /// Conversation ID (prefix match supported)
        id: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Chat { conversation }) => cmd_chat(&cli, conversation.as_deref()).await,
        None => cmd_chat(&cli, None).await,
        Some(Commands::Conversations { limit }) => cmd_conversations(*limit),
        Some(Commands::Show { id }) => cmd_show(id),
        Some(Commands::Export { id }) => cmd_export(id),
    }
}

async fn cmd_chat(cli: &Cli, resume: Option<&str>) -> Result<()> {
    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(root) = &cli.root {
        config.tools.root = root.clone();
    }
    if let Some(model) = &cli.model {
        config.backend.model = model.clone();
    }

    println!("skiff v{}", env!("CARGO_PKG_VERSION"));

    let credentials = Credentials::new(config.backend.api_key.clone());
    let mut builder =
        AnthropicBackend::builder(AnthropicAuth::ApiKey(credentials.api_key()?.to_string()));
    if let Some(base_url) = &config.backend.base_url {
        builder = builder.base_url(base_url);
    }
    let backend = builder.build();

    if !config.tools.root.is_dir() {
        return Err(Error::InvalidRoot {
            path: config.tools.root,
        });
    }
    let workspace = Workspace::new(config.tools.root.clone());
    let registry = ToolRegistry::from_tools(fstools::workspace_tools(
        &workspace,
        config.tools.search_max_results,
    ))?;

    let data_dir = dirs_data_dir().unwrap_or_else(|| ".skiff".into());
    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join(DB_FILE);
    let store = TranscriptStore::open(&db_path)?;

    let (mut id, history) = match resume {
        Some(prefix) => {
            let id = find_conversation(&store, prefix)?;
            (Some(id), transcript::load(&store, id)?)
        }
        None => (None, Vec::new()),
    };

    let mut conversation =
        Conversation::with_history(backend, registry, config.conversation_config(), history)?;

    println!("Transcripts stored at: {}", db_path.display());
    if let Some(id) = id {
        println!("Resuming conversation {id} ({} turns)", conversation.turns().len());
    }
    println!("Model: {}", config.backend.model);
    println!(
        "Tools: {} in {}",
        conversation.registry().names().join(", "),
        workspace.root().display()
    );
    println!("Type 'quit' or Ctrl+D to exit.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            break;
        }

        let before = conversation.turns().len();
        let result = conversation.submit_prompt(input).await;
        print_activity(&conversation.turns()[before..]);

        match result {
            Ok(answer) => println!("\n{}\n", answer.text()),
            Err(e) => eprintln!("Error: {e}\n"),
        }

        // Failed prompts are saved too; whatever was appended stays valid.
        let id = match id {
            Some(id) => id,
            None => {
                let created = store.create_conversation(Some(&title_for(input)))?;
                id = Some(created);
                created
            }
        };
        let saved = transcript::save(&store, id, conversation.turns())?;
        debug!(%id, saved, "transcript saved");
    }

    let usage = conversation.usage();
    if let Some(id) = id {
        println!("\nConversation {id} saved.");
    }
    println!(
        "Tokens used: {} in, {} out",
        usage.input_tokens, usage.output_tokens
    );
    Ok(())
}

fn cmd_conversations(limit: usize) -> Result<()> {
    let store = open_store()?;
    let conversations = store.list_conversations()?;

    if conversations.is_empty() {
        println!("No conversations found.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<16}  {:<6}  TITLE",
        "CONVERSATION ID", "UPDATED", "TURNS"
    );
    println!("{}", "-".repeat(80));

    for summary in conversations.into_iter().take(limit) {
        let updated = Local
            .from_utc_datetime(&summary.updated_at.naive_utc())
            .format("%Y-%m-%d %H:%M");
        println!(
            "{:<36}  {:<16}  {:<6}  {}",
            summary.id.to_string(),
            updated,
            summary.turn_count,
            summary.title.as_deref().unwrap_or("")
        );
    }

    Ok(())
}

fn cmd_show(prefix: &str) -> Result<()> {
    let store = open_store()?;
    let id = find_conversation(&store, prefix)?;
    let turns = transcript::load(&store, id)?;

    if turns.is_empty() {
        println!("No turns stored for conversation {id}");
        return Ok(());
    }

    println!("Conversation: {id}\n");
    for turn in &turns {
        print_turn(turn);
    }
    Ok(())
}

fn cmd_export(prefix: &str) -> Result<()> {
    let store = open_store()?;
    let id = find_conversation(&store, prefix)?;
    let turns = transcript::load(&store, id)?;
    println!("{}", transcript::to_json(&turns)?);
    Ok(())
}

/// Tool traffic from the turns a prompt appended.
fn print_activity(turns: &[Turn]) {
    for block in turns.iter().flat_map(|turn| &turn.content) {
        match block {
            ContentBlock::ToolUse(tool_use) => {
                println!("  [tool] {} {}", tool_use.name, tool_use.input);
            }
            ContentBlock::ToolResult(result) if result.is_error => {
                println!("  [tool error] {}", preview(&result.content.text()));
            }
            _ => {}
        }
    }
}

fn print_turn(turn: &Turn) {
    let role = turn.role.to_string().to_uppercase();
    for block in &turn.content {
        match block {
            ContentBlock::Text { text } => println!("{role}: {}", preview(text)),
            ContentBlock::ToolUse(tool_use) => {
                println!("{role}: TOOL USE {} [{}] {}", tool_use.name, tool_use.id, tool_use.input);
            }
            ContentBlock::ToolResult(result) => {
                let label = if result.is_error { "TOOL ERROR" } else { "TOOL RESULT" };
                println!(
                    "{role}: {label} [{}] {}",
                    result.tool_use_id,
                    preview(&result.content.text())
                );
            }
        }
    }
}

/// First line of a prompt, shortened for the conversation list.
fn title_for(prompt: &str) -> String {
    let line = prompt.lines().next().unwrap_or_default();
    truncate(line, TITLE_CHARS)
}

fn preview(text: &str) -> String {
    truncate(text, PREVIEW_CHARS)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

fn find_conversation(store: &TranscriptStore, prefix: &str) -> Result<ConversationId> {
    let conversations = store.list_conversations()?;
    let matching: Vec<_> = conversations
        .iter()
        .filter(|c| c.id.to_string().starts_with(prefix))
        .collect();

    match matching.as_slice() {
        [] => Err(Error::ConversationNotFound {
            prefix: prefix.to_string(),
        }),
        [only] => Ok(only.id),
        _ => Err(Error::AmbiguousConversation {
            prefix: prefix.to_string(),
            matches: matching.iter().map(|c| c.id.to_string()).collect(),
        }),
    }
}

fn open_store() -> Result<TranscriptStore> {
    let data_dir = dirs_data_dir().unwrap_or_else(|| ".skiff".into());
    open_existing(&data_dir.join(DB_FILE))
}

fn open_existing(db_path: &Path) -> Result<TranscriptStore> {
    if !db_path.exists() {
        return Err(Error::DatabaseNotFound {
            path: db_path.to_path_buf(),
        });
    }
    Ok(TranscriptStore::open(db_path)?)
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share/skiff"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("skiff"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join("skiff"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}
