use crate::context::Context;
use crate::output::print_json;
use captain_core::config::WarnLevel;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,

    /// Validate the config for common mistakes
    Validate,

    /// Write the effective configuration to the config file
    Init,
}

pub fn run(ctx: &Context, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(ctx),
        ConfigSubcommand::Validate => validate(ctx),
        ConfigSubcommand::Init => init(ctx),
    }
}

fn show(ctx: &Context) -> anyhow::Result<()> {
    if ctx.json {
        return print_json(&ctx.config);
    }
    println!("# {}", ctx.config_path.display());
    print!("{}", serde_yaml::to_string(&ctx.config)?);
    Ok(())
}

fn validate(ctx: &Context) -> anyhow::Result<()> {
    let warnings = ctx.config.validate();

    if ctx.json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

fn init(ctx: &Context) -> anyhow::Result<()> {
    ctx.config.save(&ctx.config_path)?;
    if ctx.json {
        print_json(&serde_json::json!({ "path": ctx.config_path }))
    } else {
        println!("Wrote {}", ctx.config_path.display());
        Ok(())
    }
}
