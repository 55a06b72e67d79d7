//! Command-line front end.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vitalwatch_adapter_http::HttpGateway;
use vitalwatch_adapter_notification::NotificationService;
use vitalwatch_application::{
    AckOutcome, AcknowledgmentWorkflow, AlertRelay, EntityDetailSync, RefreshOutcome,
    SyncController, SyncSettings, SyncState,
};
use vitalwatch_domain::WatchConfig;
use vitalwatch_domain::config::ENV_CONFIG_PATH;
use vitalwatch_ports::{PortSet, RemoteGateway};

use crate::format;

#[derive(Parser, Debug)]
#[command(name = "vitalwatch")]
#[command(about = "Live patient vital-sign dashboard client")]
pub struct Cli {
    /// YAML config file; defaults to ~/.vitalwatch/config.yaml when present
    #[arg(long, global = true, env = ENV_CONFIG_PATH)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Follow the dashboard until interrupted
    Watch {
        /// Rely on polling only
        #[arg(long)]
        no_push: bool,
        /// Show desktop notifications for anomaly alerts
        #[arg(long)]
        notify: bool,
    },
    /// Show one patient's profile, recent readings and anomalies
    Patient {
        patient_id: String,
        /// History window in hours
        #[arg(long)]
        hours: Option<u32>,
        /// Keep following the patient until interrupted
        #[arg(long)]
        follow: bool,
    },
    /// Acknowledge an anomaly
    Ack {
        anomaly_id: String,
        /// Name recorded as the acknowledging operator
        #[arg(long)]
        by: Option<String>,
    },
    /// List patients
    Patients,
    /// List unacknowledged anomalies
    Anomalies,
    /// Show the alert audit log
    Alerts {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Check backend health
    Health,
}

/// Load `.env`, then install the fmt subscriber. `RUST_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) {
    dotenv::dotenv().ok();
    let fallback = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Parse arguments, set up logging and run the selected command.
pub async fn entrypoint() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli).await
}

fn load_config(path: Option<&PathBuf>) -> Result<WatchConfig> {
    let config = match path {
        Some(path) => {
            let mut config = WatchConfig::load_from_path(path)?;
            config.apply_overrides(|key| std::env::var(key).ok())?;
            config.validate()?;
            config
        }
        None => WatchConfig::from_env()?,
    };
    Ok(config)
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref()).context("failed to load configuration")?;
    let gateway = Arc::new(HttpGateway::from_config(&config)?);
    info!(api = %gateway.base(), "Using monitoring backend");

    match cli.command {
        Command::Watch { no_push, notify } => {
            watch_dashboard(&config, gateway, no_push, notify).await
        }
        Command::Patient {
            patient_id,
            hours,
            follow,
        } => {
            let hours = hours.unwrap_or(config.history_hours);
            show_patient(&config, gateway, patient_id, hours, follow).await
        }
        Command::Ack { anomaly_id, by } => {
            let by = by.unwrap_or_else(|| config.acknowledged_by.clone());
            acknowledge(&config, gateway, &anomaly_id, by).await
        }
        Command::Patients => {
            for profile in gateway.fetch_patients().await? {
                println!("{}", format::patient_header(&profile));
            }
            Ok(())
        }
        Command::Anomalies => {
            let anomalies = gateway.fetch_active_anomalies().await?;
            if anomalies.is_empty() {
                println!("No active anomalies");
            }
            for anomaly in &anomalies {
                println!("{}", format::anomaly_line(anomaly));
            }
            Ok(())
        }
        Command::Alerts { days } => {
            for entry in gateway.fetch_alert_history(days).await? {
                println!("{}", format::alert_log_line(&entry));
            }
            Ok(())
        }
        Command::Health => {
            let health = gateway.check_health().await?;
            println!("{} at {}", health.status, health.timestamp.to_rfc3339());
            if !health.is_ok() {
                bail!("backend reported status `{}`", health.status);
            }
            Ok(())
        }
    }
}

fn settings(config: &WatchConfig) -> SyncSettings {
    SyncSettings {
        poll_interval: config.poll_interval(),
    }
}

/// Print `render(state)` on every state change until Ctrl-C.
async fn follow<D, F>(mut rx: watch::Receiver<SyncState<D>>, render: F) -> Result<()>
where
    D: Clone,
    F: Fn(&SyncState<D>) -> String,
{
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let state = rx.borrow_and_update().clone();
                println!("{}", render(&state));
            }
            signal = &mut interrupted => {
                signal.context("failed to listen for Ctrl-C")?;
                info!("Interrupted");
                return Ok(());
            }
        }
    }
}

async fn watch_dashboard(
    config: &WatchConfig,
    gateway: Arc<HttpGateway>,
    no_push: bool,
    notify: bool,
) -> Result<()> {
    let notifier = Arc::new(NotificationService::new(config.desktop_notifications || notify));
    let mut ports = PortSet::new(gateway).with_notifications(notifier);
    if !no_push {
        ports = ports.with_push(vitalwatch_adapter_push::acquire(config)?);
    }

    let relay = AlertRelay::start(&ports);
    let controller = SyncController::dashboard(&ports, settings(config));
    let rx = controller.subscribe();
    controller.start();
    let result = follow(rx, format::dashboard_line).await;

    controller.stop();
    relay.stop();
    vitalwatch_adapter_push::disconnect();
    result
}

async fn show_patient(
    config: &WatchConfig,
    gateway: Arc<HttpGateway>,
    patient_id: String,
    hours: u32,
    keep_following: bool,
) -> Result<()> {
    let mut ports = PortSet::new(gateway);
    if keep_following {
        ports = ports.with_push(vitalwatch_adapter_push::acquire(config)?);
    }
    let detail = EntityDetailSync::patient(patient_id, hours, &ports, settings(config));

    if let RefreshOutcome::Failed(failure) = detail.refresh().await {
        bail!("{failure}");
    }
    if let Some(snapshot) = detail.state().data {
        println!("{}", format::patient_header(&snapshot.profile));
        for reading in snapshot.latest(10) {
            println!("  {}", format::reading_line(reading));
        }
        for anomaly in &snapshot.anomalies {
            println!("  {}", format::anomaly_line(anomaly));
        }
    }

    if keep_following {
        let rx = detail.subscribe();
        detail.start();
        let result = follow(rx, format::patient_line).await;
        detail.stop();
        vitalwatch_adapter_push::disconnect();
        return result;
    }
    Ok(())
}

async fn acknowledge(
    config: &WatchConfig,
    gateway: Arc<HttpGateway>,
    anomaly_id: &str,
    by: String,
) -> Result<()> {
    let ports = PortSet::new(gateway.clone());
    let controller = SyncController::dashboard(&ports, settings(config));
    let workflow = AcknowledgmentWorkflow::new(gateway, controller.clone()).acknowledged_by(by);

    match workflow.acknowledge(anomaly_id).await {
        AckOutcome::Submitted(refresh) => {
            println!("Acknowledged {anomaly_id} as {}", workflow.actor());
            match refresh.settled().await {
                RefreshOutcome::Committed => {
                    println!("{}", format::dashboard_line(&controller.state()));
                }
                RefreshOutcome::Failed(failure) => {
                    warn!(error = %failure, "Dashboard refresh failed");
                }
                RefreshOutcome::Discarded => {}
            }
            Ok(())
        }
        AckOutcome::Rejected(err) => bail!("failed to acknowledge {anomaly_id}: {err}"),
    }
}
