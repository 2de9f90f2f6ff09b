use anyhow::Result;
use chrono::Local;
use clap::Parser;
use governance_sentinel::config::Config;
use governance_sentinel::rpc::RpcClient;
use governance_sentinel::snapshot::formatters::{OutputFormat, format_snapshot};
use governance_sentinel::snapshot::{
    SnapshotContracts, default_filename, export_snapshot, write_snapshot,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snapshot")]
#[command(about = "Export an emergency snapshot of DAO governance state", long_about = None)]
struct Cli {
    /// Where to write the JSON snapshot, defaults to emergency_snapshot_<timestamp>.json
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Summary printed to stdout: table, json or csv
    #[arg(short, long, default_value = "table")]
    format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from(cli.format.as_str());

    info!("Starting emergency DAO snapshot");

    let config = Config::from_env()?;
    let client = RpcClient::from_config(&config)?;
    let contracts = SnapshotContracts::from_config(&config);

    let snapshot = match export_snapshot(&client, &contracts, &config.network).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("Snapshot failed: {:#}", e);
            return Err(e);
        }
    };

    let path = cli.output.unwrap_or_else(|| default_filename(Local::now()));
    write_snapshot(&snapshot, &path)?;
    info!("Snapshot saved successfully to {}", path.display());

    println!("{}", format_snapshot(&snapshot, &format));

    Ok(())
}
