use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use sdlink::{
    default_config_path, init_logging, Config, ProgressCallback, SerialTransport, TimeoutPolicy,
    TransferSession, TransferState, BUILD_DATE, VERSION,
};
use std::path::{Path, PathBuf};

/// Store G-code programs on a Marlin printer's SD card
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (.toml or .json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log protocol traffic
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a G-code file to the printer's SD card
    Send(SendArgs),
    /// Write a config file with default settings
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct SendArgs {
    /// G-code file to send
    file: PathBuf,

    /// Serial port (e.g. /dev/ttyUSB0, COM7)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Read timeout per response line, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Pause after opening the port, in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,

    /// File name on the SD card (defaults to the source file name)
    #[arg(long)]
    remote_name: Option<String>,

    /// Treat a command that gets no answer before the timeout as failed
    #[arg(long)]
    strict_timeouts: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    tracing::debug!("sdlink {} (built {})", VERSION, BUILD_DATE);

    let config_path = cli.config.unwrap_or_else(default_config_path);
    match cli.command {
        Commands::Send(args) => send(args, &config_path).await,
        Commands::InitConfig { force } => init_config(&config_path, force),
    }
}

async fn send(args: SendArgs, config_path: &Path) -> anyhow::Result<()> {
    let mut config = Config::load_or_default(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    if let Some(port) = args.port {
        config.connection.port = port;
    }
    if let Some(baud) = args.baud {
        config.connection.baud_rate = baud;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.connection.timeout_ms = timeout_ms;
    }
    if let Some(settle_ms) = args.settle_ms {
        config.connection.settle_ms = settle_ms;
    }
    if args.strict_timeouts {
        config.transfer.timeout_policy = TimeoutPolicy::Fail;
    }
    config.validate()?;

    if config.connection.port.is_empty() {
        bail!(
            "no serial port configured; pass --port or set connection.port in {}",
            config_path.display()
        );
    }

    let mut session_config = config.session_config();
    session_config.remote_name = args.remote_name;

    let mut session = TransferSession::new(&args.file, session_config);
    let cancel = session.cancel_token();

    // The session blocks on serial reads; keep it off the runtime threads.
    let mut worker = tokio::task::spawn_blocking(move || {
        let mut transport = SerialTransport::new();
        let on_progress: ProgressCallback = Box::new(|event| println!("Progress: {}", event));
        session.run(&mut transport, on_progress)
    });

    let joined = tokio::select! {
        joined = &mut worker => joined,
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => {
                    tracing::warn!("Interrupt received; stopping after the current command");
                    cancel.cancel();
                }
                Err(e) => tracing::warn!("Cannot listen for Ctrl-C: {}", e),
            }
            (&mut worker).await
        }
    };
    let outcome = joined.context("transfer worker panicked")??;

    println!("{}", outcome.message);
    let elapsed = outcome.finished_at - outcome.started_at;
    println!(
        "{} of {} lines processed, {} sent in {:.1}s",
        outcome.lines_processed,
        outcome.total_lines,
        outcome.lines_sent,
        elapsed.num_milliseconds() as f64 / 1000.0
    );

    match outcome.state {
        TransferState::Completed => Ok(()),
        TransferState::Aborted => bail!("transfer aborted"),
        _ => {
            for line in &outcome.responses {
                eprintln!("  printer: {}", line);
            }
            match outcome.error {
                Some(e) => Err(e.into()),
                None => bail!("transfer failed"),
            }
        }
    }
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; use --force to overwrite", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    Config::default().save_to_file(path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
