mod assistant;
mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "enrich",
    about = "Reconcile enrichment payloads into a structured record store",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .enrich/)
    #[arg(long, global = true, env = "ENRICH_ROOT")]
    root: Option<PathBuf>,

    /// Config file (default: <root>/.enrich/config.yaml)
    #[arg(long, global = true, env = "ENRICH_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log stage outcomes (info level)
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map a payload onto a store and create or update its record
    Reconcile {
        /// Payload JSON file
        payload: PathBuf,

        /// Store (database) id; defaults to store.store_id from config
        #[arg(long)]
        store: Option<String>,

        /// Use this schema file instead of fetching the store's schema
        #[arg(long, conflicts_with = "batch")]
        schema: Option<PathBuf>,

        /// Show what would be written without writing
        #[arg(long, conflicts_with = "batch")]
        dry_run: bool,

        /// Treat a top-level array as a batch of payloads
        #[arg(long)]
        batch: bool,
    },

    /// Deterministically map a payload against a schema file (offline)
    Map {
        /// Payload JSON file
        payload: PathBuf,

        /// Schema JSON file
        #[arg(long)]
        schema: PathBuf,
    },

    /// Fetch and print a store's schema
    Schema {
        /// Store (database) id; defaults to store.store_id from config
        #[arg(long)]
        store: Option<String>,
    },

    /// Manage .enrich/config.yaml
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let ctx = cmd::Context {
        root,
        config_path: cli.config,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Reconcile {
            payload,
            store,
            schema,
            dry_run,
            batch,
        } => cmd::reconcile::run(
            &ctx,
            cmd::reconcile::ReconcileArgs {
                payload,
                store,
                schema,
                dry_run,
                batch,
            },
        ),
        Commands::Map { payload, schema } => cmd::map::run(&ctx, &payload, &schema),
        Commands::Schema { store } => cmd::schema::run(&ctx, store.as_deref()),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
