use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use monotributo::chrome::{ChromeBrowser, ChromeOptions};
use monotributo::config::parse_cli_value;
use monotributo::{ConfigStore, ConsolePrompter, Settings};

#[derive(Parser)]
#[command(name = "monotributo", version, about = "Generate AFIP receipts from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and generate a receipt
    #[command(visible_aliases = ["run", "up"])]
    Factura,

    /// Set a config variable
    #[command(visible_aliases = ["config", "cfg"])]
    Configure {
        /// Dotted key, e.g. `browser.headless`
        key: String,
        #[arg(default_value = "true")]
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("monotributo=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Factura => run_factura().await,
        Commands::Configure { key, value } => configure(&key, &value),
    }
}

async fn run_factura() -> Result<()> {
    let store = ConfigStore::discover().context("Failed to load configuration")?;
    let settings = Settings::from_store(&store);

    let options = ChromeOptions {
        headless: settings.headless,
        path: settings.chrome_path.clone(),
        wait: settings.wait_policy(),
    };
    let browser = tokio::task::spawn_blocking(move || ChromeBrowser::launch(&options))
        .await
        .map_err(|e| anyhow::anyhow!("Browser launch panicked: {}", e))?
        .context("Failed to launch Chrome")?;

    let receipt = monotributo::factura(Arc::new(browser), Arc::new(ConsolePrompter), &settings)
        .await
        .context("Receipt generation failed")?;

    if receipt.submitted {
        println!("{} {}", "✔".green(), "Factura generada".bold());
    } else {
        println!("{} {}", "ℹ".blue(), "La factura no fue generada".bold());
    }
    Ok(())
}

fn configure(key: &str, value: &str) -> Result<()> {
    let mut store = ConfigStore::discover().context("Failed to load configuration")?;
    store.set(key, parse_cli_value(value));
    store.save().context("Failed to save configuration")?;

    info!(path = %store.path().display(), "configuration saved");
    println!("setting {key} to {value}");
    Ok(())
}
