use clap::{Parser, ValueEnum};
use schemars::schema_for;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = env!("CARGO_BIN_NAME"))]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Generate JSON schema for the specified config file.
    Schema {
        /// Kind of config file.
        #[arg(value_enum, ignore_case = true)]
        kind: ConfigKind,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConfigKind {
    MuxConfig,
    VelocityLimits,
}

fn main() -> anyhow::Result<()> {
    velmux_apps::utils::init_tracing();
    let args = Args::parse();
    debug!(?args);

    match args.command {
        Command::Schema { kind } => {
            let schema = match kind {
                ConfigKind::MuxConfig => schema_for!(velmux_apps::MuxConfig),
                ConfigKind::VelocityLimits => schema_for!(velmux::VelocityLimiterConfig),
            };
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }
    Ok(())
}
