mod cmd;
mod context;
mod output;

use clap::{Parser, Subcommand};
use cmd::{card::CardSubcommand, config::ConfigSubcommand, robot::RobotSubcommand};
use context::Context;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "captain",
    about = "Edit Thymio robot programs stored on Captain cards",
    version,
    propagate_version = true
)]
struct Cli {
    /// Card-store API base URL (overrides client.api_url)
    #[arg(long, global = true, env = "CAPTAIN_API")]
    api: Option<String>,

    /// Config file (default: ~/.captain/config.yaml)
    #[arg(long, global = true, env = "CAPTAIN_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the actions a program can use
    Catalog,

    /// Generate, inspect and control cards
    Card {
        #[command(subcommand)]
        subcommand: CardSubcommand,
    },

    /// Edit a card's program interactively
    Edit {
        /// Card id
        card_id: String,
    },

    /// Manage robots and their card associations
    Robot {
        #[command(subcommand)]
        subcommand: RobotSubcommand,
    },

    /// Show or validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Run the card-store service
    Serve {
        /// Port to listen on (overrides server.port)
        #[arg(long)]
        port: Option<u16>,

        /// Database file (overrides server.db_path)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = Context::load(cli.config, cli.api, cli.json).and_then(|ctx| match cli.command {
        Commands::Catalog => cmd::catalog::run(&ctx),
        Commands::Card { subcommand } => cmd::card::run(&ctx, subcommand),
        Commands::Edit { card_id } => cmd::edit::run(&ctx, &card_id),
        Commands::Robot { subcommand } => cmd::robot::run(&ctx, subcommand),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand),
        Commands::Serve { port, db } => cmd::serve::run(&ctx, port, db),
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
