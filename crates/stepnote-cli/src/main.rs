mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{colors::ColorsSubcommand, serve::ServeArgs, source::SourceArgs, Context};
use std::path::PathBuf;
use stepnote_client::DEFAULT_PROXY_URL;
use stepnote_core::prefs::PrefsStore;

#[derive(Parser)]
#[command(
    name = "stepnote",
    about = "Read AI-agent transcripts step by step and annotate each assistant action",
    version,
    propagate_version = true
)]
struct Cli {
    /// Base URL of the stepnote proxy's /api root
    #[arg(long, global = true, env = "STEPNOTE_PROXY_URL", default_value = DEFAULT_PROXY_URL)]
    proxy: String,

    /// Directory for local preferences (default: <config dir>/stepnote)
    #[arg(long, global = true, env = "STEPNOTE_PREFS_DIR")]
    prefs_dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the proxy in front of the task table
    Serve(ServeArgs),

    /// List tasks submitted under a Unique ID
    Tasks {
        /// Submitter's Unique ID (default: the last one used)
        #[arg(long)]
        unique_id: Option<String>,
    },

    /// Show one task and its stored annotations
    Task {
        /// Task Number
        number: String,
    },

    /// Render a transcript to HTML with annotation form slots
    Render {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Record one answer for a section of a task
    Annotate {
        /// Task Number
        task: String,
        /// 1-based section index
        section: usize,
        /// Form field, e.g. actionCategory or errorFlags
        field: String,
        /// New value; errorFlags takes several, comma or space separated
        #[arg(required = true, num_args = 1..)]
        value: Vec<String>,
    },

    /// Show how far each assistant section of a task has been annotated
    Progress {
        /// Task Number
        task: String,
        // Defaults to the task's Link to Task.
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Show or change display colors
    Colors {
        #[command(subcommand)]
        subcommand: ColorsSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve(_) => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let ctx = Context {
        proxy_url: cli.proxy,
        prefs: PrefsStore::new(cli.prefs_dir.unwrap_or_else(PrefsStore::default_dir)),
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Serve(args) => cmd::serve::run(args),
        Commands::Tasks { unique_id } => cmd::tasks::run(&ctx, unique_id.as_deref()),
        Commands::Task { number } => cmd::task::run(&ctx, &number),
        Commands::Render { source } => cmd::render::run(&ctx, &source),
        Commands::Annotate {
            task,
            section,
            field,
            value,
        } => cmd::annotate::run(&ctx, &task, section, &field, &value),
        Commands::Progress { task, source } => cmd::progress::run(&ctx, &task, &source),
        Commands::Colors { subcommand } => cmd::colors::run(&ctx, subcommand),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
