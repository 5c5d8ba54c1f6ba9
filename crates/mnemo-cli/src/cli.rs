use clap::{Args, Parser, Subcommand};

pub use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "mnemo")]
#[command(version, about = "Mnemo - adaptive memory for conversational agents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (defaults to ~/.mnemo/mnemo.db)
    #[arg(long, global = true, env = "MNEMO_DB_PATH")]
    pub db_path: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Chat with the model; memories and summaries update as you talk
    Chat(ChatArgs),

    /// User memory management
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },

    /// Session summaries
    Summary {
        #[command(subcommand)]
        command: SummaryCommands,
    },

    /// Conversation history
    Messages {
        #[command(subcommand)]
        command: MessagesCommands,
    },
}

#[derive(Args)]
pub struct ChatArgs {
    /// User ID
    #[arg(short, long, env = "MNEMO_USER")]
    pub user: String,

    /// Session ID (a new one is generated when omitted)
    #[arg(short, long)]
    pub session: Option<String>,

    /// Model override
    #[arg(short, long)]
    pub model: Option<String>,
}

#[derive(Subcommand)]
pub enum MemoryCommands {
    /// List a user's memories
    List {
        #[arg(short, long, env = "MNEMO_USER")]
        user: String,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Add a memory by hand
    Add {
        #[arg(short, long, env = "MNEMO_USER")]
        user: String,

        memory: String,
    },

    /// Delete one memory
    Delete {
        #[arg(short, long, env = "MNEMO_USER")]
        user: String,

        id: String,
    },

    /// Delete every memory of a user
    Clear {
        #[arg(short, long, env = "MNEMO_USER")]
        user: String,
    },

    /// Keyword search over a user's memories
    Search {
        #[arg(short, long, env = "MNEMO_USER")]
        user: String,

        query: String,

        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
pub enum SummaryCommands {
    /// Show the current summary of a session
    Show {
        #[arg(short, long, env = "MNEMO_USER")]
        user: String,

        #[arg(short, long)]
        session: String,
    },
}

#[derive(Subcommand)]
pub enum MessagesCommands {
    /// List the messages of a session, oldest first
    List {
        #[arg(short, long, env = "MNEMO_USER")]
        user: String,

        #[arg(short, long)]
        session: String,

        /// Only the most recent N messages
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Delete the messages of a session
    Delete {
        #[arg(short, long, env = "MNEMO_USER")]
        user: String,

        #[arg(short, long)]
        session: String,
    },
}
