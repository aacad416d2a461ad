use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use daemonize::Daemonize;
use tabwriter::TabWriter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use autorund::classify::{self, DriveKind};
use autorund::config::Config;
use autorund::daemon;
use autorund::mounts::MountTable;

#[derive(Parser)]
#[command(name = "autorund")]
#[command(about = "Autorun daemon for removable robot media", long_about = None)]
struct Cli {
    /// YAML config file overriding the built-in defaults
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the daemon using ./autorund run")]
    Run {
        /// Detach from the terminal and run in the background
        #[arg(long)]
        detach: bool,
        /// Send logs to the systemd journal as well
        #[arg(long)]
        journald: bool,
    },
    #[command(about = "Print the current mount table with classification")]
    List,
    #[command(about = "Classify a single mountpoint path")]
    Classify {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { detach, journald } => {
            init_logging(journald)?;
            if detach {
                let stdout = File::create("/var/log/autorund.out")
                    .context("failed to create daemon stdout log")?;
                let stderr = File::create("/var/log/autorund.err")
                    .context("failed to create daemon stderr log")?;
                let daemonize = Daemonize::new()
                    .pid_file("/run/autorund.pid")
                    .stdout(stdout)
                    .stderr(stderr);
                daemonize.start().context("failed to daemonize")?;
            }
            daemon::run(config)
        }
        Commands::List => {
            init_logging(false)?;
            list(&config)
        }
        Commands::Classify { path } => {
            init_logging(false)?;
            println!("{}", classify::classify(&config, &path));
            Ok(())
        }
    }
}

fn init_logging(journald: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());
    if journald {
        let journald = tracing_journald::layer().context("failed to connect to journald")?;
        registry.with(journald).init();
    } else {
        registry.init();
    }
    Ok(())
}

/// Print every current mount with its viability verdict and drive kind.
fn list(config: &Config) -> Result<()> {
    let mut table = MountTable::open(&config.mounts_path)?;
    let mut content = String::new();
    for entry in table.read()? {
        let kind = if classify::is_viable(&entry) {
            classify::classify(config, &entry.mountpoint)
        } else {
            DriveKind::NotOfInterest
        };
        let _ = writeln!(
            content,
            "{}\t{}\t{}",
            entry.mountpoint.display(),
            entry.fstype,
            kind
        );
    }

    let mut tab_writer = TabWriter::new(std::io::stdout());
    writeln!(&mut tab_writer, "MOUNTPOINT\tFSTYPE\tKIND")?;
    write!(&mut tab_writer, "{content}")?;
    tab_writer.flush()?;

    Ok(())
}
