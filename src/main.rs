//! podprof Binary Entry Point
//!
//! Runs every configured measurement until interrupted (or for a fixed
//! duration) and exits with the aggregated measurement status.

use std::time::Duration;

use clap::Parser;
use podprof::{AppConfig, Catalog, Cluster, KubectlClient, MeasurementRegistry, StartReports};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit code used when a measurement cannot run at all.
const FATAL_EXIT_CODE: i32 = 1;

/// podprof - Periodic pprof collection from Kubernetes pods
#[derive(Parser, Debug)]
#[command(name = "podprof", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "PODPROF_CONFIG"
    )]
    config: String,

    /// Kubeconfig file (overrides config file)
    #[arg(long, env = "PODPROF_KUBECONFIG")]
    kubeconfig: Option<String>,

    /// Kubeconfig context (overrides config file)
    #[arg(long, env = "PODPROF_CONTEXT")]
    context: Option<String>,

    /// Stop after this long instead of waiting for a signal (e.g. "10m")
    #[arg(long, value_parser = podprof::config::parse_duration)]
    duration: Option<Duration>,
}

/// Why the run phase ended.
enum Shutdown {
    Signal(&'static str),
    Elapsed,
    Fatal(String),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,podprof=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = AppConfig::load(&cli.config)?;

    // CLI > ENV > config file
    if let Some(kubeconfig) = cli.kubeconfig {
        config.cluster.kubeconfig = Some(kubeconfig.into());
    }
    if let Some(context) = cli.context {
        config.cluster.context = Some(context);
    }

    tracing::info!(
        kubectl = %config.cluster.kubectl,
        context = config.cluster.context.as_deref().unwrap_or("<current>"),
        measurements = config.measurements.len(),
        "Configuration loaded"
    );

    let cluster = Cluster::from_client(KubectlClient::from_config(&config.cluster));
    let catalog = Catalog::builtin();
    let registry = MeasurementRegistry::build(&config.measurements, &catalog, &cluster);
    if registry.is_empty() {
        tracing::warn!("No measurements registered");
    }

    let reports = registry.start_all();
    let shutdown = wait_for_shutdown(reports, cli.duration).await;

    let rc = registry.stop_all().await;
    let rc = match shutdown {
        Shutdown::Signal(name) => {
            tracing::info!(signal = name, "Shutdown complete");
            rc
        }
        Shutdown::Elapsed => {
            tracing::info!("Run duration elapsed, shutdown complete");
            rc
        }
        Shutdown::Fatal(name) => {
            tracing::error!(measurement = %name, "Aborting after fatal measurement error");
            FATAL_EXIT_CODE
        }
    };

    std::process::exit(rc);
}

/// Wait for a signal, the run duration, or a fatal start failure.
async fn wait_for_shutdown(mut reports: StartReports, duration: Option<Duration>) -> Shutdown {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let elapsed = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };

    let fatal = async {
        while let Some(report) = reports.next().await {
            if report.is_fatal() {
                return report.name;
            }
        }
        std::future::pending::<String>().await
    };

    tracing::info!("Press Ctrl+C to stop");
    tokio::select! {
        _ = ctrl_c => Shutdown::Signal("SIGINT"),
        _ = terminate => Shutdown::Signal("SIGTERM"),
        _ = elapsed => Shutdown::Elapsed,
        name = fatal => Shutdown::Fatal(name),
    }
}
