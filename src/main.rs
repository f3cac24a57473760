use color_eyre::eyre::Result;
use sensorbridge::channel::{ScalarChannel, SensorChannel};
use sensorbridge::config::BridgeConfig;
use sensorbridge::mqtt::{ConnectionManager, ManagerSettings};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Reads sensor lines from stdin and publishes them to the configured
/// broker. A line with three whitespace-separated numbers feeds the
/// vector channel, a single number feeds the scalar channel.
#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sensorbridge.toml".to_string());
    let config = BridgeConfig::load(&config_path)?;
    info!("loaded configuration from {config_path}");

    let (status_tx, mut status_rx) = mpsc::channel(32);
    let settings = ManagerSettings {
        log_path: config.diagnostic_log.clone(),
        ca_cert_path: config.broker.ca_cert.clone(),
    };
    let (manager, worker) = ConnectionManager::spawn(settings, status_tx);

    let status_task = tokio::spawn(async move {
        while let Some(event) = status_rx.recv().await {
            info!("broker status: {event}");
        }
    });

    manager.connect(
        &config.broker.url,
        &config.broker.client_id,
        &config.broker.username,
        &config.broker.password,
    );

    let mut vector = SensorChannel::new(manager.clone(), &config.vector_channel.topic);
    vector.update_settings(
        config.vector_channel.multipliers,
        config.vector_channel.rounding,
    );
    let mut scalar = ScalarChannel::new(manager.clone(), &config.scalar_channel.topic);
    scalar.update_settings(config.scalar_channel.rounding);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let fields: Vec<f32> = line
            .split_whitespace()
            .filter_map(|field| field.parse().ok())
            .collect();
        match fields.as_slice() {
            [x, y, z] => {
                vector.process(*x, *y, *z);
            }
            [value] => {
                scalar.process(*value);
            }
            [] if line.trim().is_empty() => {}
            _ => warn!("unparseable sensor line: {line:?}"),
        }
    }

    info!("input closed, shutting down");
    manager.disconnect();
    drop(vector);
    drop(scalar);
    drop(manager);
    if let Err(err) = worker.await {
        error!("connection worker panicked: {err}");
    }
    status_task.abort();
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "1")
    }
    color_eyre::install()?;

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
