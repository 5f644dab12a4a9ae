use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use serde_json::{Value, json};
use std::io::Read;
use stockgate::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run one gateway invocation locally and print the response
    Invoke {
        /// Ticker symbols to look up
        tickers: Vec<String>,

        /// Read the invocation event from a JSON file ("-" for stdin)
        #[arg(short, long, conflicts_with = "tickers")]
        event: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(Commands::Invoke { tickers, event }) => {
            invoke(tickers, event.as_deref(), cli.config_path.as_deref()).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn read_event(source: &str) -> Result<Value> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read event from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read event file: {source}"))?
    };
    serde_json::from_str(&raw).context("Event is not valid JSON")
}

async fn invoke(tickers: Vec<String>, event: Option<&str>, config_path: Option<&str>) -> Result<()> {
    // Mirror the platform envelope, where the body arrives as a JSON string
    let event = match event {
        Some(source) => read_event(source)?,
        None => json!({ "body": json!({ "tickers": tickers }).to_string() }),
    };

    let response = stockgate::invoke(&event, config_path).await?;

    let body: Value =
        serde_json::from_str(&response.body).unwrap_or(Value::String(response.body.clone()));
    let printable = json!({
        "statusCode": response.status_code,
        "headers": response.headers,
        "body": body,
    });
    println!("{}", serde_json::to_string_pretty(&printable)?);

    if response.status_code != 200 {
        anyhow::bail!("Invocation returned status {}", response.status_code);
    }
    Ok(())
}

fn setup() -> anyhow::Result<()> {
    let path = stockgate::config::GatewayConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
providers:
  yahoo:
    base_url: "https://query1.finance.yahoo.com"
    cookie_url: "https://fc.yahoo.com"

# Maximum number of tickers fetched at once; omit for no limit
# max_concurrency: 8
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
