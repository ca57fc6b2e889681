mod bootstrap;

use anyhow::Result;
use mavsnap_core::settings::{CollectorArgs, Command, PresenterArgs, Settings};
use mavsnap_core::snapshot::SnapshotStore;
use mavsnap_link::{LinkAddress, MavlinkLink};
use mavsnap_runtime::context::CollectorContext;
use mavsnap_runtime::orchestrator::CollectorOrchestrator;
use mavsnap_runtime::poller::Poller;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("mavsnap v{} starting", env!("CARGO_PKG_VERSION"));

    match settings.command {
        Command::Collect(args) => run_collector(args).await,
        Command::Serve(args) => run_presenter(args).await,
    }
}

async fn run_collector(args: CollectorArgs) -> Result<()> {
    let message_types = args.message_type_list()?;
    let address = LinkAddress::parse(&args.link, args.baud)?;

    bootstrap::ensure_directories(&args.params_dir)?;

    tracing::info!(
        link = %address,
        params_dir = %args.params_dir.display(),
        message_types = message_types.len(),
        "Starting collector"
    );

    // Opening a serial port or TCP connection blocks.
    let link = tokio::task::spawn_blocking(move || MavlinkLink::connect(address)).await??;

    let ctx = CollectorContext::new(
        Box::new(link),
        SnapshotStore::new(&args.params_dir),
        message_types,
        args.receive_timeout(),
    );

    let orchestrator = CollectorOrchestrator::new(args.cycle_interval(), args.heartbeat_timeout());
    let (mut rx, handle) = orchestrator.start(Poller::new(ctx));

    let mut cycles = 0u64;
    loop {
        tokio::select! {
            report = rx.recv() => match report {
                Some(report) => cycles = report.cycle,
                None => anyhow::bail!("collector stopped after {cycles} cycles"),
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(cycles, "Ctrl+C received; shutting down collector");
                handle.abort();
                break;
            }
        }
    }

    Ok(())
}

async fn run_presenter(args: PresenterArgs) -> Result<()> {
    tracing::info!(
        params_dir = %args.params_dir.display(),
        web_root = %args.web_root.display(),
        "Starting presenter"
    );

    tokio::select! {
        result = mavsnap_web::run(&args) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received; shutting down presenter");
        }
    }

    Ok(())
}
