use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod analytics;
mod cache;
mod config;
mod error;
mod logging;
mod models;
mod poller;
mod rest;
mod upstream;

use crate::cache::StatusCache;
use crate::config::Config;
use crate::error::StartupError;
use crate::poller::Poller;
use crate::upstream::HttpUpstream;

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    dotenv::dotenv().ok();
    logging::init();
    info!("Starting biodome v{}", biodome_core::CORE_VERSION);

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    let db_conn = models::establish_db_connection(&config)?;
    let health = models::health_check(&db_conn).await;
    match health.error.as_deref() {
        None => info!("Connected to database"),
        Some(e) => warn!("Database unreachable, starting degraded: {}", e),
    }
    models::schema::initialize(&db_conn).await;

    let started = Instant::now();
    let cache = Arc::new(StatusCache::new(config.cache_ttl()));
    let upstream = Arc::new(HttpUpstream::new(&config)?);
    let poller = Arc::new(Poller::new(
        upstream.clone(),
        Arc::new(db_conn.clone()),
        cache.clone(),
        config.sensor_poll(),
        config.token_poll(),
    ));

    let cancel = CancellationToken::new();
    let sensor_loop = tokio::spawn(poller.clone().dispatch_sensor_loop(cancel.clone()));
    let token_loop = tokio::spawn(poller.clone().dispatch_token_loop(cancel.clone()));

    let state = rest::ApiState {
        db_conn: db_conn.clone(),
        upstream,
        cache,
        started,
    };
    let mut server = tokio::spawn(rest::dispatch_server(
        state,
        PathBuf::from(config.static_dir()),
        config.server_port(),
        cancel.clone(),
    ));

    tokio::select! {
        _ = shutdown_signal() => info!("Shutdown requested"),
        res = &mut server => {
            // the server only returns on its own if binding failed
            cancel.cancel();
            db_conn.close().await;
            logging::shutdown();
            return match res {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    error!("Webserver failed: {}", e);
                    Err(e.into())
                }
                Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e).into()),
            };
        }
    }

    cancel.cancel();
    let joined = tokio::time::timeout(config.shutdown_timeout(), async {
        let _ = tokio::join!(server, sensor_loop, token_loop);
    })
    .await;
    if joined.is_err() {
        warn!(
            "Shutdown timed out after {:?}, abandoning in-flight work",
            config.shutdown_timeout()
        );
    }

    db_conn.close().await;
    info!("Database pool closed");
    logging::shutdown();
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed listening for ctrl-c: {}", e);
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
                error!("Failed listening for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
