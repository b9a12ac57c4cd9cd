use crate::context::Context;
use crate::output::{print_json, print_table};
use anyhow::Context as _;
use captain_core::card::RobotFilter;
use captain_core::card_id;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum RobotSubcommand {
    /// List robots
    List {
        /// all, used or free
        #[arg(long, default_value = "all")]
        filter: RobotFilter,
    },

    /// Register a robot or change its URL
    Add { name: String, url: String },

    /// Remove a robot
    Rm { name: String },

    /// Put a robot on a card
    Associate { name: String, card_id: String },

    /// Free a robot from its card
    Dissociate { name: String },

    /// Check that a robot answers
    Ping { name: String },
}

pub fn run(ctx: &Context, subcmd: RobotSubcommand) -> anyhow::Result<()> {
    let client = ctx.client()?;
    match subcmd {
        RobotSubcommand::List { filter } => {
            let robots = client.list_robots(filter).context("failed to list robots")?;
            if ctx.json {
                return print_json(&robots);
            }
            if robots.is_empty() {
                println!("No robots.");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = robots
                .iter()
                .map(|r| {
                    let card = if r.is_free() {
                        "-".to_string()
                    } else {
                        card_id::abbreviate(&r.card_id, 8)
                    };
                    vec![r.name.clone(), r.url.clone(), card]
                })
                .collect();
            print_table(&["NAME", "URL", "CARD"], &rows);
        }
        RobotSubcommand::Add { name, url } => {
            client
                .put_robot(&name, &url)
                .with_context(|| format!("failed to register robot {name}"))?;
            done(ctx, &format!("Robot {name} -> {url}"))?;
        }
        RobotSubcommand::Rm { name } => {
            client
                .delete_robot(&name)
                .with_context(|| format!("failed to remove robot {name}"))?;
            done(ctx, &format!("Removed robot {name}"))?;
        }
        RobotSubcommand::Associate { name, card_id: id } => {
            client
                .associate(&name, &id)
                .with_context(|| format!("failed to associate robot {name}"))?;
            done(
                ctx,
                &format!("Robot {name} on card {}", card_id::abbreviate(&id, 8)),
            )?;
        }
        RobotSubcommand::Dissociate { name } => {
            client
                .dissociate(&name)
                .with_context(|| format!("failed to dissociate robot {name}"))?;
            done(ctx, &format!("Robot {name} is free"))?;
        }
        RobotSubcommand::Ping { name } => {
            let report = client
                .ping_robot(&name)
                .with_context(|| format!("robot {name} did not answer"))?;
            if ctx.json {
                print_json(&report)?;
            } else {
                println!("{name}: {} {}", report.status, report.body.trim());
            }
        }
    }
    Ok(())
}

fn done(ctx: &Context, message: &str) -> anyhow::Result<()> {
    if ctx.json {
        print_json(&serde_json::json!({ "result": "done" }))
    } else {
        println!("{message}");
        Ok(())
    }
}
