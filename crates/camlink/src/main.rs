mod cli;
mod config;
mod files;
mod spool;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use camlink_protocol::{
    CancelToken, ReceiverConfig, SenderConfig, ThreadPacer, TracingLogger, TransferError,
    TransferProgress, VisualLink, run_receiver, run_sender,
};

use cli::{Command, Role};
use config::Config;
use files::{DirSink, PathSource};
use spool::{SpoolDisplay, SpoolScanner};

fn main() -> ExitCode {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camlink=info,camlink_protocol=info".into()),
        )
        .init();

    let command = match cli::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("camlink: {e}\n\n{}", cli::USAGE);
            return ExitCode::from(2);
        }
    };

    let (role, path) = match command {
        Command::Version => {
            println!("camlink {}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        Command::Help => {
            println!("{}", cli::USAGE);
            return ExitCode::SUCCESS;
        }
        Command::Run { role, path } => (role, path),
    };

    match run(role, path, Config::from_env()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_cancelled(&e) => {
            eprintln!("camlink: cancelled");
            ExitCode::from(130)
        }
        Err(e) => {
            eprintln!("camlink: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    err.downcast_ref::<TransferError>()
        .is_some_and(TransferError::is_cancelled)
}

/// Runs the blocking transfer on a worker thread; Ctrl-C raises the cancel
/// flag, which the transfer notices at its next scan or pause.
fn run(role: Role, path: Option<PathBuf>, config: Config) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    runtime.block_on(async move {
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let mut worker =
            tokio::task::spawn_blocking(move || transfer(role, path, &config, worker_cancel));

        tokio::select! {
            joined = &mut worker => joined.context("transfer thread panicked")?,
            Ok(()) = tokio::signal::ctrl_c() => {
                info!("interrupt received, cancelling");
                cancel.cancel();
                worker.await.context("transfer thread panicked")?
            }
        }
    })
}

fn transfer(role: Role, path: Option<PathBuf>, config: &Config, cancel: CancelToken) -> anyhow::Result<()> {
    let own_screen = config.spool_dir.join(role.screen_name());
    let peer_screen = config.spool_dir.join(role.peer().screen_name());
    let display = SpoolDisplay::open(&own_screen)
        .with_context(|| format!("failed to open spool directory {}", own_screen.display()))?;
    let mut link = VisualLink::new(SpoolScanner::new(&peer_screen), display, ThreadPacer, cancel)
        .with_poll_interval(config.poll_interval);
    let progress = TransferProgress::new();

    info!(
        "{:?} ready: showing codes in {}, watching {}",
        role,
        own_screen.display(),
        peer_screen.display()
    );

    match role {
        Role::Sender => {
            let mut source = PathSource::new(path.or_else(|| config.input_file.clone()));
            let sender_config = SenderConfig {
                chunk_size: config.chunk_size,
                logger: Some(Arc::new(TracingLogger)),
            };
            let report = run_sender(&sender_config, &mut source, &mut link, &progress)?;
            println!(
                "sent {} ({} bytes, {} chunks) in {:.1}s",
                report.file_name,
                report.bytes,
                report.total_chunks,
                report.duration.as_secs_f64()
            );
        }
        Role::Receiver => {
            let dir = path
                .or_else(|| config.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            let mut sink = DirSink::new(dir);
            let receiver_config = ReceiverConfig {
                ack_linger: config.ack_linger,
                logger: Some(Arc::new(TracingLogger)),
            };
            let report = run_receiver(&receiver_config, &mut sink, &mut link, &progress)?;
            println!(
                "received {} ({} bytes, {} chunks) in {:.1}s -> {}",
                report.file_name,
                report.bytes,
                report.total_chunks,
                report.duration.as_secs_f64(),
                report.path.display()
            );
        }
    }
    Ok(())
}
