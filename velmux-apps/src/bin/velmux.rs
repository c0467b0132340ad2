use std::{path::PathBuf, sync::Arc, time::Instant};

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use velmux::{CommandMux, MoveBase, Tracing, VelocityLimiter};
use velmux_apps::{utils::init_tracing, InputLine, JsonLinesMoveBase, MuxConfig};

/// Velocity command multiplexer.
///
/// Reads commands from stdin, one per line: `<source> <x> <y> <theta>`,
/// `lock <source>` or `unlock <source>`. Writes the arbitrated velocity to
/// stdout as JSON lines.
#[derive(Parser, Debug)]
#[command(name = env!("CARGO_BIN_NAME"))]
struct Args {
    /// Path to the setting file.
    #[arg(short, long)]
    config_path: Option<PathBuf>,
    /// Prints the default setting as TOML.
    #[arg(long)]
    show_default_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    debug!(?args);

    if args.show_default_config {
        print!("{}", toml::to_string(&MuxConfig::default())?);
        return Ok(());
    }

    let config = match velmux_apps::utils::get_config_path(args.config_path) {
        Some(path) => MuxConfig::new(path)?,
        None => {
            info!("no config path is specified, using the default config");
            MuxConfig::default()
        }
    };
    let period = config.period()?;
    let output = JsonLinesMoveBase::new(config.output_topic.clone(), std::io::stdout());
    let output: Box<dyn MoveBase> = match &config.velocity_limits {
        Some(limits) => Box::new(Tracing::new(VelocityLimiter::from_config(output, limits)?)),
        None => Box::new(Tracing::new(output)),
    };
    let mux = Arc::new(CommandMux::new(config.create_arbitrator()?, output));
    info!(
        sources = ?config.sources.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
        ?period,
        "started"
    );

    let ticker = {
        let mux = mux.clone();
        tokio::spawn(async move { mux.main(period).await })
    };

    tokio::select! {
        () = read_lines(&*mux, &config, BufReader::new(tokio::io::stdin())) => {}
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    mux.stop();
    ticker.await?;
    Ok(())
}

/// Handles every line of `reader` until it is closed or fails to read.
///
/// Lines that are not valid UTF-8 are logged and skipped like any other
/// malformed line.
async fn read_lines<M, R>(mux: &CommandMux<M>, config: &MuxConfig, mut reader: R)
where
    M: MoveBase,
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                debug!("stdin closed");
                return;
            }
            Ok(_) => match std::str::from_utf8(&buf) {
                Ok(line) => handle_line(mux, config, line),
                Err(e) => warn!("skipping a line that is not valid UTF-8: {e}"),
            },
            Err(e) => {
                warn!("failed to read stdin: {e}");
                return;
            }
        }
    }
}

fn handle_line<M: MoveBase>(mux: &CommandMux<M>, config: &MuxConfig, line: &str) {
    let line = match InputLine::parse(line) {
        Ok(Some(line)) => line,
        Ok(None) => return,
        Err(e) => {
            warn!("{e}");
            return;
        }
    };
    let now = Instant::now();
    let result = match line {
        InputLine::Command { source, velocity } => mux.on_command(&source, velocity, now),
        InputLine::Lock { source, locked } => {
            if !config.has_lock(&source) {
                warn!(%source, "no lock is configured for this source, ignoring");
                return;
            }
            mux.on_lock(&source, locked, now)
        }
    };
    // rejected input is already logged by the mux
    if let Err(e) = result {
        debug!("ignored: {e}");
    }
}
