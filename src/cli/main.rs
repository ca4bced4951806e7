use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::{Client, Response};
use serde_json::json;

#[derive(Parser)]
#[command(name = "issue-triage-cli")]
#[command(about = "Issue Triage CLI", long_about = None)]
struct Cli {
    #[arg(short, long, env = "ISSUE_TRIAGE_ENDPOINT", default_value = "http://localhost:5000")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify an issue
    Predict {
        #[arg(short, long)]
        title: String,

        #[arg(short, long, default_value = "")]
        body: String,
    },

    /// Explain the classification of an issue
    Explain {
        #[arg(short, long)]
        title: String,

        #[arg(short, long, default_value = "")]
        body: String,

        #[arg(short, long)]
        num_features: Option<usize>,
    },

    /// Correct a stored prediction
    Correct {
        #[arg(value_name = "PREDICTION_ID")]
        id: String,

        #[arg(short, long)]
        label: String,
    },

    /// List stored predictions
    List {
        #[arg(short, long, default_value = "0")]
        page: u32,

        #[arg(short = 's', long, default_value = "20")]
        page_size: u32,
    },

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let endpoint = cli.endpoint.trim_end_matches('/');

    let response = match cli.command {
        Commands::Predict { title, body } => {
            client
                .post(format!("{}/api/predict", endpoint))
                .json(&json!({ "title": title, "body": body }))
                .send()
                .await
        }

        Commands::Explain {
            title,
            body,
            num_features,
        } => {
            client
                .post(format!("{}/api/explain", endpoint))
                .json(&json!({
                    "title": title,
                    "body": body,
                    "num_features": num_features,
                }))
                .send()
                .await
        }

        Commands::Correct { id, label } => {
            client
                .post(format!("{}/api/correct", endpoint))
                .json(&json!({ "id": id, "corrected_label": label }))
                .send()
                .await
        }

        Commands::List { page, page_size } => {
            client
                .get(format!("{}/api/view_predictions", endpoint))
                .query(&[("page", page), ("page_size", page_size)])
                .send()
                .await
        }

        Commands::Health => client.get(format!("{}/health", endpoint)).send().await,
    }
    .with_context(|| format!("Failed to reach {}", endpoint))?;

    print_response(response).await
}

async fn print_response(response: Response) -> Result<()> {
    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .context("Server returned a non-JSON body")?;

    println!("{}", serde_json::to_string_pretty(&body)?);

    if !status.is_success() {
        bail!("Request failed with status {}", status);
    }
    Ok(())
}
