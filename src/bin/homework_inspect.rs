use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use hw_watchbot::config;
use hw_watchbot::practicum::{HomeworkApi, PracticumClient};
use hw_watchbot::validate;

#[derive(Parser, Debug)]
#[command(about = "Fetch homework statuses once and print what would be sent")]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Unix timestamp to request changes from
    #[arg(long, default_value_t = 0)]
    from_date: i64,

    /// Print the raw JSON payload as well
    #[arg(long)]
    raw: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    if cfg.practicum.token.trim().is_empty() {
        anyhow::bail!("{} is not set", config::ENV_PRACTICUM_TOKEN);
    }

    let client = PracticumClient::from_config(&cfg)?;
    let payload = client.fetch(args.from_date).await?;
    if args.raw {
        println!("{}", serde_json::to_string_pretty(&payload)?);
    }

    let records = validate::validate(&payload)?;
    println!("Homeworks since {}: {}", args.from_date, records.len());
    for rec in &records {
        println!("  {} -> {}", rec.name, rec.status.as_str());
    }
    match records.first() {
        Some(latest) => println!("Would send: {}", latest.status_message()),
        None => println!("Nothing to send"),
    }
    Ok(())
}
