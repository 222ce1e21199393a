//! Imagehook Submit - sends an image to the generation API.
//!
//! The generated result is delivered later to the webhook URL, where
//! `imagehook-web` stores it.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use imagehook::{Config, SubmitClient, SubmitRequest};

#[derive(Debug, Parser)]
#[command(name = "imagehook-submit", about = "Submit an image for generation")]
struct Args {
    /// Image file to upload
    image: PathBuf,

    /// Correlation id echoed back in the callback
    #[arg(long)]
    id_gen: String,

    /// Callback URL (defaults to WEBHOOK_URL)
    #[arg(long)]
    webhook: Option<String>,

    /// Extra generation parameter, as name=value (repeatable)
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,
}

/// Parse a `name=value` pair.
fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got {:?}", raw)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    let webhook = args
        .webhook
        .or_else(|| config.webhook_url.clone())
        .ok_or_else(|| anyhow!("No webhook URL: pass --webhook or set WEBHOOK_URL"))?;
    let webhook = Url::parse(&webhook).context("Invalid webhook URL")?;

    let client = SubmitClient::from_config(&config).context("Failed to create submit client")?;

    let request = args
        .params
        .into_iter()
        .fold(SubmitRequest::new(args.image, webhook, args.id_gen), |req, (name, value)| {
            req.param(name, value)
        });

    let response = client.submit(&request).await.context("Submit failed")?;

    info!(id_gen = %request.id_gen, response = %response, "submit_accepted");
    println!("{}", response);

    Ok(())
}
