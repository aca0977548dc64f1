use super::messages::MAX_MESSAGE_SIZE;
use crate::router::RouterEngine;
use anyhow::Context;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Running router: the reload timer and the receive loop.
pub struct RouterHandle {
    engine: Arc<RouterEngine>,
    shutdown_tx: broadcast::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

impl RouterHandle {
    pub fn engine(&self) -> &Arc<RouterEngine> {
        &self.engine
    }

    /// Signal both tasks and wait for them to finish. A reload or a
    /// datagram already being processed completes first.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Router task ended abnormally: {}", e);
            }
        }
        info!("Router tasks stopped");
    }
}

/// Load the config once, then start the periodic reload and the receive
/// loop. A config that cannot be loaded here is fatal; later reload
/// failures only keep the previous link state.
pub async fn start_tasks(engine: Arc<RouterEngine>) -> anyhow::Result<RouterHandle> {
    let interval = engine.settings().reload_interval()?;
    let outcome = engine
        .reload_config()
        .await
        .context("initial config load failed")?;
    info!("Router {} started", outcome.router_id);

    if let Err(e) = engine.write_status().await {
        warn!("{:#}", e);
    }

    let (shutdown_tx, _) = broadcast::channel(1);

    let reload_handle = {
        let engine = engine.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            reload_task(engine, interval, &mut shutdown_rx).await;
        })
    };

    let listen_handle = {
        let engine = engine.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            listen_task(engine, &mut shutdown_rx).await;
        })
    };

    Ok(RouterHandle {
        engine,
        shutdown_tx,
        handles: vec![reload_handle, listen_handle],
    })
}

async fn reload_task(
    engine: Arc<RouterEngine>,
    interval: Duration,
    shutdown_rx: &mut broadcast::Receiver<()>,
) {
    loop {
        // Sleep after each reload rather than on a fixed clock, so a slow
        // reload pushes the next one back.
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Reload task shutting down");
                break;
            }
            _ = tokio::time::sleep(interval) => {
                if let Err(e) = engine.reload_config().await {
                    warn!("Config reload failed, keeping previous link state: {:#}", e);
                }
                if let Err(e) = engine.write_status().await {
                    warn!("{:#}", e);
                }
            }
        }
    }
}

async fn listen_task(engine: Arc<RouterEngine>, shutdown_rx: &mut broadcast::Receiver<()>) {
    // One byte over the limit, so oversized datagrams are seen as oversized
    // instead of arriving cut down to a valid length.
    let mut buffer = vec![0u8; MAX_MESSAGE_SIZE + 1];

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Listen task shutting down");
                break;
            }
            result = engine.transport().recv_from(&mut buffer) => {
                match result {
                    Ok((len, addr)) => {
                        if let Err(e) = engine.handle_datagram(&buffer[..len], addr).await {
                            warn!("Discarding datagram from {}: {:#}", addr, e);
                        }
                    }
                    Err(e) => {
                        error!("Failed to receive datagram: {}", e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        }
    }
}
