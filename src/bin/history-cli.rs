use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "history-cli")]
#[command(about = "Query a running history server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8082")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the dashboard configuration descriptor
    Config,
    /// List the jobs known to the server
    Overview,
    /// Show an archived job, or one of its resources
    Job {
        /// Job ID
        id: String,
        /// Resource below the job, e.g. `vertices` or `config`
        resource: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let path = match cli.command {
        Commands::Config => "/config".to_string(),
        Commands::Overview => "/joboverview".to_string(),
        Commands::Job { id, resource: None } => format!("/jobs/{id}"),
        Commands::Job { id, resource: Some(resource) } => {
            format!("/jobs/{id}/{}", resource.trim_start_matches('/'))
        }
    };

    let res = client.get(format!("{base}{path}")).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: history server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
