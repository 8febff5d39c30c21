use clap::{Parser, ValueEnum};
use misra_ring::{injector::Injector, log, message::Width};
use std::{error::Error, process::ExitCode, time::Duration};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum WidthArg {
    #[value(name = "32")]
    Bits32,
    #[value(name = "64")]
    Bits64,
}

impl From<WidthArg> for Width {
    fn from(width: WidthArg) -> Self {
        match width {
            WidthArg::Bits32 => Width::Bits32,
            WidthArg::Bits64 => Width::Bits64,
        }
    }
}

/// Keeps writing an integer to a ring node, as if it were the previous node.
#[derive(Parser, Debug)]
#[command(name = "injector")]
struct Args {
    address: String,
    port: u16,
    #[arg(allow_negative_numbers = true)]
    value: i64,

    /// Width of the integer written on each tick.
    #[arg(long, value_enum, default_value = "32")]
    width: WidthArg,

    #[arg(long = "interval-ms", default_value_t = 5_000)]
    interval_ms: u64,
}

async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let width = Width::from(args.width);
    if width == Width::Bits32 && i32::try_from(args.value).is_err() {
        return Err(format!("{} does not fit in 32 bits", args.value).into());
    }

    let injector = Injector::new(format!("{}:{}", args.address, args.port), args.value, width)
        .with_interval(Duration::from_millis(args.interval_ms));

    injector
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error(&format!("Couldn't listen for CTRL+C: {e}"));
            }
        })
        .await?;
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
