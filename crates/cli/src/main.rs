mod args;
mod error;

use crate::args::{Cli, Command, ConfigCommand};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use retrosync_config::{Backend, Config};
use retrosync_sync::{JobSlot, Syncer};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Sync => sync(&load(&cli)?).await,
        Command::Config(ConfigCommand::Validate) => {
            let config = load(&cli)?;
            let backend = match config.storage.selected().or_raise(|| ErrorKind::Config)? {
                Backend::S3(_) => "s3",
                Backend::Local(_) => "local",
                Backend::Sftp(_) => "sftp",
                Backend::Drive(_) => "drive",
            };
            println!("configuration ok: owner {}, backend {backend}", config.owner);
            Ok(())
        },
        Command::Config(ConfigCommand::Example { dir }) => {
            let path = retrosync_config::write_example(&dir).or_raise(|| ErrorKind::Example(dir.clone()))?;
            println!("{}", path.display());
            Ok(())
        },
    }
}

fn load(cli: &Cli) -> Result<Config> {
    Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)
}

async fn sync(config: &Config) -> Result<()> {
    let syncer = Syncer::from_config(config).await.or_raise(|| ErrorKind::Init)?;
    syncer.init().await.or_raise(|| ErrorKind::Init)?;
    let slot = JobSlot::new();
    let Some(result) = slot.run(&syncer).await else {
        exn::bail!(ErrorKind::Busy);
    };
    let report = result.or_raise(|| ErrorKind::Sync)?;
    for kind in &report.kinds {
        println!("{kind}");
    }
    println!("bucket {}: {} uploaded, {} downloaded", report.bucket, report.uploaded(), report.downloaded());
    Ok(())
}
