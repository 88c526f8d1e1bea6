use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "nexus-cli")]
#[command(about = "Management CLI for the Nexus load balancer", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8090")]
    url: String,

    /// Admin API key, if the proxy was started with one.
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Alive and total backend counts
    Status,
    /// List backend liveness
    Backends,
    /// Put a backend back into rotation
    Up { endpoint: String },
    /// Take a backend out of rotation
    Down { endpoint: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key))?,
        );
    }

    let res = match cli.command {
        Commands::Status => {
            client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Backends => {
            client
                .get(format!("{}/admin/backends", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Up { endpoint } => set_status(&client, &cli.url, headers, endpoint, true).await?,
        Commands::Down { endpoint } => set_status(&client, &cli.url, headers, endpoint, false).await?,
    };

    print_response(res).await
}

async fn set_status(
    client: &reqwest::Client,
    url: &str,
    headers: HeaderMap,
    endpoint: String,
    alive: bool,
) -> Result<reqwest::Response, reqwest::Error> {
    client
        .post(format!("{}/admin/backends/status", url))
        .headers(headers)
        .json(&json!({ "endpoint": endpoint, "alive": alive }))
        .send()
        .await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
