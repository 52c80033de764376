use crate::cmd::Context;
use crate::output::print_json;
use anyhow::Context as _;
use clap::Subcommand;
use enrich_core::config::{Config, WarnLevel};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Write a default config file if none exists
    Init,

    /// Print the effective config (file merged over defaults)
    Show,

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(ctx: &Context, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Init => init(ctx),
        ConfigSubcommand::Show => show(ctx),
        ConfigSubcommand::Validate => validate(ctx),
    }
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn init(ctx: &Context) -> anyhow::Result<()> {
    let path = ctx.config_file();
    let data = serde_yaml::to_string(&Config::default())?;
    let written = enrich_core::io::write_if_missing(&path, data.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;

    if ctx.json {
        print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "created": written,
        }))?;
    } else if written {
        println!("Created {}", path.display());
    } else {
        println!("{} already exists; left unchanged", path.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    if ctx.json {
        return print_json(&config);
    }
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    let warnings = config.validate();

    if ctx.json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
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
