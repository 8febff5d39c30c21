use clap::Parser;
use misra_ring::{
    config::{NodeConfig, Timings, DEFAULT_PORT},
    log,
    peer::Peer,
};
use std::{error::Error, path::PathBuf, process::ExitCode};

/// A node of the ping-pong token ring.
#[derive(Parser, Debug)]
#[command(name = "node")]
struct Args {
    /// Port to run the server on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address of the next node.
    #[arg(long)]
    next: String,

    /// Port of the next node.
    #[arg(long = "next-port")]
    next_port: u16,

    /// Initialize as the first node of the ring.
    #[arg(long)]
    init: bool,

    /// JSON file overriding the protocol timings.
    #[arg(long)]
    timings: Option<PathBuf>,
}

async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let timings = match &args.timings {
        Some(path) => Timings::from_json_string(&tokio::fs::read_to_string(path).await?)?,
        None => Timings::default(),
    };
    let config = NodeConfig::new(args.port, args.next, args.next_port, args.init).with_timings(timings);

    Peer::new(config).run().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error(&format!("{e}"));
            ExitCode::FAILURE
        }
    }
}
