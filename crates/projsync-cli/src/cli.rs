use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "projsync")]
#[command(about = "Run sync operations against a local projsync database")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the sync database file (falls back to PROJSYNC_DATABASE_PATH, then projsync.db)
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show pending record counts per table
    Status {
        /// Device whose own pending rows are counted separately
        #[arg(long, value_name = "ID")]
        device_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload a batch of records from a JSON sync request
    Upload {
        /// Path to the request document, or `-` for stdin
        file: PathBuf,
    },
    /// Download records changed after a watermark
    Download {
        /// Table to read
        #[arg(long, value_name = "TABLE")]
        table: String,
        /// Device requesting the download
        #[arg(long, value_name = "ID")]
        device_id: String,
        /// Exclusive `updatedAt` watermark in epoch milliseconds
        #[arg(long, default_value = "0", value_name = "MILLIS")]
        since: i64,
        /// Maximum number of records in the page
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Resolve a conflict from a JSON resolution document
    Resolve {
        /// Path to the resolution document, or `-` for stdin
        file: PathBuf,
    },
    /// List unresolved conflicts
    Conflicts {
        /// Only show conflicts on this table
        #[arg(long, value_name = "TABLE")]
        table: Option<String>,
        /// Number of conflicts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the sync audit log
    Audit {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Show counts per operation and status instead of entries
        #[arg(long)]
        summary: bool,
        /// Lower bound for the summary window in epoch milliseconds
        #[arg(long, default_value = "0", value_name = "MILLIS")]
        since: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
