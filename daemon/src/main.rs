use anyhow::Result;
use loadguard_daemon::{
    config::Config,
    lifecycle::Lifecycle,
    monitor::Monitor,
    platform::LinuxPlatform,
    signals::TerminationSignals,
    status::{self, StatusLine},
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    println!("{}", status::banner());

    // Load configuration
    let config_path = Config::config_path();
    let config = if config_path.exists() {
        Config::load(&config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {:#}, using defaults", e);
            Config::default()
        })
    } else {
        info!("No config file found, using defaults");
        Config::default()
    };

    if !LinuxPlatform::is_privileged() {
        warn!("Not running as root; processes above RLIMIT_NICE will be left alone");
    }

    // Without handlers a signal would kill us with processes still demoted.
    let mut signals = match TerminationSignals::install() {
        Ok(signals) => signals,
        Err(e) => {
            error!("Failed to install signal handlers, not monitoring: {}", e);
            return Ok(());
        }
    };

    let (lifecycle, termination) = Lifecycle::new();

    // Hold off the host's shutdown until every priority has been restored.
    let signal_task = tokio::spawn(async move {
        signals.recv().await;
        termination.request().await;
    });

    let platform = Arc::new(LinuxPlatform::new());
    let monitor = Monitor::new(platform, &config, lifecycle);
    let mut status_line = StatusLine::new(config.general.status_line);
    let summary = monitor.run(|outcome| status_line.show(outcome)).await;
    status_line.finish(&summary);

    if summary.interrupted {
        let _ = signal_task.await;
    } else {
        signal_task.abort();
    }
    Ok(())
}
