mod bitstream;
mod config;
mod mapping;
mod output;
mod roles;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use qmap_io::loader::SampleFormat;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "qmap")]
#[command(about = "Map sampled surface-code measurements to labeled, spatially ordered records")]
struct Cli {
    /// TOML job configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map a samples file against its circuit and write the JSON artifact
    Map {
        #[arg(short, long)]
        circuit: PathBuf,
        #[arg(short, long)]
        samples: PathBuf,
        #[arg(long, default_value = "b8")]
        sample_format: SampleFormat,
        #[arg(short, long)]
        rounds: Option<usize>,
        #[arg(short, long)]
        distance: Option<usize>,
        /// Export a bitstream with this section order (e.g. zxd)
        #[arg(short, long)]
        bitstream: Option<String>,
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(long)]
        pretty: bool,
    },
    /// Print the qubit roles and coordinates of a circuit
    Roles {
        #[arg(short, long)]
        circuit: PathBuf,
    },
    /// Re-encode the arranged section of an artifact as a bitstream
    Bitstream {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, default_value = "zxd")]
        format: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter)
        .init();

    match cli.command {
        Commands::Map {
            circuit,
            samples,
            sample_format,
            rounds,
            distance,
            bitstream,
            out,
            pretty,
        } => {
            let mut config = Config::load(cli.config.as_deref())?;
            if rounds.is_some() {
                config.parameters.rounds = rounds;
            }
            if distance.is_some() {
                config.parameters.distance = distance;
            }
            if let Some(format) = bitstream {
                config.bitstream.exporting = true;
                config.bitstream.format = format;
            }
            if let Some(out) = out {
                config.output.file = out;
            }
            config.output.prettify |= pretty;
            config.validate()?;

            mapping::run_map(&circuit, &samples, sample_format, &config)?;
        }
        Commands::Roles { circuit } => {
            roles::print_roles(&circuit)?;
        }
        Commands::Bitstream { input, format } => {
            bitstream::reencode(&input, &format)?;
        }
    }
    Ok(())
}
