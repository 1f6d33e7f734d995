use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the proof-of-work ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a transaction to the pending pool
    Submit {
        /// Transaction text
        #[arg(long)]
        data: String,
    },
    /// Mine all pending transactions into a new block
    Mine,
    /// Show blocks, pending pool and difficulty
    View,
    /// Show the pending pool
    Pending,
    /// Case-insensitive search over sealed transactions
    Search {
        #[arg(long, short)]
        query: String,
    },
    /// Ask the node to re-check its chain
    Verify,
}

#[derive(Serialize)]
struct Tx {
    data: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/');
    let client = reqwest::Client::new();

    let request = match cli.cmd {
        Command::Submit { data } => client.post(format!("{node}/tx")).json(&Tx { data }),
        Command::Mine => client.post(format!("{node}/mine")),
        Command::View => client.get(format!("{node}/view")),
        Command::Pending => client.get(format!("{node}/pending")),
        Command::Search { query } => client
            .get(format!("{node}/search"))
            .query(&[("q", query)]),
        Command::Verify => client.get(format!("{node}/verify")),
    };
    debug!(?request, "sending");

    let res = request.send().await?;
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}
