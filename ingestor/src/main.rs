use anyhow::{Context as _, Result};
use clap::Parser as _;
use dht_ingestor::{config::Args, db::Store, metrics, mqtt::Subscriber, rest};
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        error!("{:#}", e);
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

async fn run() -> Result<()> {
    let args = Args::parse();

    info!("Starting DHT ingestor");
    info!("MQTT broker: {}:{}", args.mqtt_broker, args.mqtt_port);
    info!("MQTT topic: {}", args.mqtt_topic);
    info!("HTTP server: {}", args.http_addr);
    info!("Database: {}", args.database_url);

    if let Err(e) = metrics::init_metrics() {
        warn!("Failed to register metrics: {}", e);
    }

    // Without a store there is nothing to subscribe for
    let store = Store::open(&args.store_config())
        .await
        .context("failed to open database")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let subscriber = Subscriber::new(args.subscriber_config(), store.clone());
    let mut subscriber_handle = tokio::spawn(subscriber.run(shutdown_rx.clone()));

    let listener = tokio::net::TcpListener::bind(&args.http_addr)
        .await
        .with_context(|| format!("failed to bind to {}", args.http_addr))?;
    info!("HTTP server listening on {}", args.http_addr);

    let app = rest::create_router(store.clone());
    let mut server_shutdown = shutdown_rx;
    let mut server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    });

    let mut subscriber_done = false;
    let mut server_done = false;
    tokio::select! {
        result = &mut subscriber_handle => {
            subscriber_done = true;
            match result {
                Ok(Ok(())) => warn!("Subscriber stopped"),
                Ok(Err(e)) => error!("Subscriber failed: {}", e),
                Err(e) => error!("Subscriber task panicked: {}", e),
            }
        }
        result = &mut server_handle => {
            server_done = true;
            match result {
                Ok(Ok(())) => warn!("HTTP server stopped"),
                Ok(Err(e)) => error!("HTTP server error: {}", e),
                Err(e) => error!("HTTP server task panicked: {}", e),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Subscriber stopped by user");
        }
    }

    info!("Shutting down");
    let _ = shutdown_tx.send(true);

    if !subscriber_done {
        if let Ok(Err(e)) = subscriber_handle.await {
            error!("Subscriber failed during shutdown: {}", e);
        }
    }
    if !server_done {
        if let Ok(Err(e)) = server_handle.await {
            error!("HTTP server error during shutdown: {}", e);
        }
    }

    store.close().await;
    Ok(())
}
