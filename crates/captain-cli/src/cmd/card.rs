use crate::context::Context;
use crate::output::print_json;
use anyhow::Context as _;
use captain_core::card::RobotCommand;
use captain_core::catalog::ActionCatalog;
use captain_core::client::CardApi;
use captain_core::{card_id, codec};
use clap::Subcommand;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum CardSubcommand {
    /// Generate signed card ids
    New {
        /// Number of ids to generate
        #[arg(long, short = 'n', default_value = "1")]
        count: usize,
        /// Signing secret (default: server.card_secret)
        #[arg(long, env = "CAPTAIN_CARD_SECRET")]
        secret: Option<String>,
    },

    /// Check that a card id was signed with the secret
    Verify {
        card_id: String,
        /// Signing secret (default: server.card_secret)
        #[arg(long, env = "CAPTAIN_CARD_SECRET")]
        secret: Option<String>,
    },

    /// Print a card's notes and program
    Show { card_id: String },

    /// Start the program on the card's robot
    Run { card_id: String },

    /// Stop the card's robot
    Stop { card_id: String },

    /// Upload the saved program to the card's robot
    Upload { card_id: String },

    /// Check that the card's robot answers
    Ping { card_id: String },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(ctx: &Context, subcmd: CardSubcommand) -> anyhow::Result<()> {
    match subcmd {
        CardSubcommand::New { count, secret } => new(ctx, count, secret),
        CardSubcommand::Verify { card_id, secret } => verify(ctx, &card_id, secret),
        CardSubcommand::Show { card_id } => show(ctx, &card_id),
        CardSubcommand::Run { card_id } => command(ctx, &card_id, RobotCommand::Run),
        CardSubcommand::Stop { card_id } => command(ctx, &card_id, RobotCommand::Stop),
        CardSubcommand::Upload { card_id } => command(ctx, &card_id, RobotCommand::Upload),
        CardSubcommand::Ping { card_id } => command(ctx, &card_id, RobotCommand::Ping),
    }
}

fn secret_of(ctx: &Context, secret: Option<String>) -> anyhow::Result<String> {
    secret
        .or_else(|| ctx.config.server.card_secret.clone())
        .filter(|s| !s.is_empty())
        .context("no card secret: pass --secret or set server.card_secret")
}

// ---------------------------------------------------------------------------
// new / verify
// ---------------------------------------------------------------------------

fn new(ctx: &Context, count: usize, secret: Option<String>) -> anyhow::Result<()> {
    let secret = secret_of(ctx, secret)?;
    let ids = (0..count)
        .map(|_| card_id::generate(secret.as_bytes()))
        .collect::<Result<Vec<_>, _>>()?;

    if ctx.json {
        print_json(&ids)?;
    } else {
        for id in &ids {
            println!("{id}");
        }
    }
    Ok(())
}

fn verify(ctx: &Context, id: &str, secret: Option<String>) -> anyhow::Result<()> {
    let secret = secret_of(ctx, secret)?;
    let valid = card_id::verify(secret.as_bytes(), id).is_ok();

    if ctx.json {
        print_json(&serde_json::json!({ "cardId": id, "valid": valid }))?;
    } else if valid {
        println!("{}: valid", card_id::abbreviate(id, 8));
    }
    if !valid {
        anyhow::bail!("card id {} is not signed with this secret", card_id::abbreviate(id, 8));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let body = client
        .load_card(id)
        .with_context(|| format!("failed to load card {id}"))?;
    let catalog = ActionCatalog::standard();
    let card = codec::decode(&catalog, &body).context("card holds an unreadable program")?;

    if ctx.json {
        return print_json(&serde_json::json!({
            "cardId": body.card_id,
            "notes": card.notes,
            "program": card.program.to_wire(),
        }));
    }

    println!("Card:  {}", card_id::abbreviate(&body.card_id, 8));
    if !card.notes.is_empty() {
        println!("Notes: {}", card.notes);
    }
    if card.program.is_empty() {
        println!("(empty program)");
    }
    for (i, action) in card.program.iter().enumerate() {
        let title = action.title(&catalog)?;
        match action.param_description(&catalog) {
            Some(desc) => println!("{:>3}. {title}: {desc}", i + 1),
            None => println!("{:>3}. {title}", i + 1),
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// run / stop / upload / ping
// ---------------------------------------------------------------------------

fn command(ctx: &Context, id: &str, cmd: RobotCommand) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let report = client
        .command(id, cmd)
        .with_context(|| format!("{cmd} failed for card {}", card_id::abbreviate(id, 8)))?;

    if ctx.json {
        print_json(&report)?;
    } else {
        println!("{cmd}: {} {}", report.status, report.body.trim());
    }
    Ok(())
}
