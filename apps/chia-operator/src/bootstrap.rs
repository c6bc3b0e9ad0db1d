use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use chia_api::{
    ChiaCA, ChiaCrawler, ChiaFarmer, ChiaHarvester, ChiaIntroducer, ChiaNetwork, ChiaNode,
    ChiaSeeder, ChiaTimelord, ChiaWallet,
};
use chia_core::cluster::FIELD_MANAGER;
use chia_core::{EventPublisher, KubeCluster, KubeEventPublisher, NoopEventPublisher, OperatorMetrics};
use futures_util::future::join_all;
use kube::Client;
use tracing::{error, info, warn};

use crate::config::OperatorConfig;
use crate::context::Context;
use crate::http::{self, HttpState};
use crate::reconciler::run_controller;

/// One task per kind, each running [`run_controller`] with shared settings.
macro_rules! spawn_controllers {
    ($ctx:expr, $namespace:expr, $concurrency:expr; $($kind:ty),+ $(,)?) => {
        vec![$(
            tokio::spawn(run_controller::<$kind>($ctx.clone(), $namespace.clone(), $concurrency))
        ),+]
    };
}

/// Start every controller and the HTTP endpoint; returns after SIGINT/SIGTERM.
pub(crate) async fn run(cfg: OperatorConfig) -> Result<()> {
    let client = Client::try_default()
        .await
        .context("building kubernetes client")?;
    let metrics = Arc::new(OperatorMetrics::new());
    let events: Arc<dyn EventPublisher> = if cfg.reconcile.publish_events {
        Arc::new(KubeEventPublisher::new(client.clone(), FIELD_MANAGER))
    } else {
        info!("event publishing disabled");
        Arc::new(NoopEventPublisher)
    };
    let ctx = Arc::new(Context::new(
        KubeCluster::new(client),
        events,
        metrics.clone(),
        &cfg,
    ));

    let addr: SocketAddr = cfg
        .http
        .bind
        .parse()
        .with_context(|| format!("invalid http.bind: {}", cfg.http.bind))?;
    let ready = Arc::new(AtomicBool::new(false));
    let server = tokio::spawn(http::serve(
        addr,
        HttpState {
            metrics,
            ready: ready.clone(),
        },
        shutdown_signal(),
    ));

    let namespace = cfg.watch_namespace.clone();
    let concurrency = cfg.reconcile.concurrency;
    let controllers = spawn_controllers!(ctx, namespace, concurrency;
        ChiaCA,
        ChiaNetwork,
        ChiaNode,
        ChiaFarmer,
        ChiaHarvester,
        ChiaTimelord,
        ChiaIntroducer,
        ChiaCrawler,
        ChiaSeeder,
        ChiaWallet,
    );
    ready.store(true, Ordering::Relaxed);
    info!(
        namespace = namespace.as_deref().unwrap_or("<all>"),
        controllers = controllers.len(),
        "operator started"
    );

    for joined in join_all(controllers).await {
        if let Err(err) = joined {
            error!(error = %err, "controller task panicked");
        }
    }
    ready.store(false, Ordering::Relaxed);
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!("http server exited with error: {err}"),
        Err(err) => error!(error = %err, "http server task panicked"),
    }
    info!("operator stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "SIGTERM handler unavailable; waiting for ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown signal received");
}
