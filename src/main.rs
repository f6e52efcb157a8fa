// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::Parser;
use k8s_openapi::api::networking::v1::Ingress;
use kube::{api::ListParams, Api, Client};
use kube_namesilo_dns::{
    config::{Cli, Command, UpdateArgs, WatchArgs},
    constants::TOKIO_WORKER_THREADS,
    leader::run_with_lease,
    manager::RefreshTrigger,
    metrics::serve_metrics,
    watch::{run_periodic_refresh, run_watch_loop},
};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("nsdns")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    init_logging();

    // Pin the process-wide rustls provider to ring.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    match cli.command {
        Command::Watch(args) => run_watch(args).await,
        Command::Update(args) => run_update(args).await,
    }
}

/// Initialize logging.
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT` (`json` or text).
fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    debug!("Logging initialized with file and line number tracking");
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Watch ingresses until SIGINT/SIGTERM or a failed periodic refresh.
async fn run_watch(args: WatchArgs) -> Result<()> {
    let config = args.common.validate(env_var)?;
    let lease = args.lease_settings(env_var)?;
    let interval = args.refresh_interval()?;
    let resync = args.resync_interval()?;

    info!(
        domain = %config.domain,
        ingress_class = %config.ingress_class,
        refresh_on_mutation = args.refresh_on_mutation,
        "Starting Namesilo ingress DNS controller"
    );

    let manager = Arc::new(config.dns_manager(args.refresh_on_mutation)?);
    manager
        .refresh_cache(RefreshTrigger::Startup)
        .await
        .context("initial cache refresh failed")?;

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    let shutdown = create_shutdown_token();

    if let Some(bind_address) = args.metrics_bind_address {
        let token = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_metrics(bind_address, token).await {
                error!(error = %e, "Metrics server failed");
            }
        });
    }

    let refresh_task = tokio::spawn({
        let manager = manager.clone();
        let shutdown = shutdown.clone();
        async move {
            let result = run_periodic_refresh(manager, interval, shutdown.clone()).await;
            // A failed refresh takes the whole process down.
            shutdown.cancel();
            result
        }
    });

    let watch_result = match &lease {
        Some(lease) => {
            run_with_lease(client.clone(), lease, shutdown.clone(), |token| {
                run_watch_loop(client.clone(), manager.clone(), resync, token)
            })
            .await
        }
        None => {
            run_watch_loop(client.clone(), manager.clone(), resync, shutdown.clone()).await;
            Ok(())
        }
    };

    shutdown.cancel();
    refresh_task
        .await
        .context("periodic refresh task panicked")?
        .context("periodic cache refresh failed")?;
    watch_result?;

    info!("Shutdown complete");
    Ok(())
}

/// Reconcile every matching ingress once.
async fn run_update(args: UpdateArgs) -> Result<()> {
    let config = args.common.validate(env_var)?;
    let manager = config.dns_manager(false)?;

    let client = Client::try_default().await?;
    let api: Api<Ingress> = match args.namespace.as_deref() {
        Some(namespace) => Api::namespaced(client, namespace),
        None => Api::all(client),
    };

    let ingresses = api
        .list(&ListParams::default())
        .await
        .context("failed to list ingresses")?;
    debug!(count = ingresses.items.len(), "Received ingresses");

    let summary = manager.sync_ingresses(&ingresses.items).await?;

    info!(
        added = summary.added,
        updated = summary.updated,
        unchanged = summary.no_op,
        malformed = summary.malformed,
        "DNS update complete"
    );
    Ok(())
}

/// Token cancelled on SIGINT or SIGTERM.
fn create_shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        token_clone.cancel();
    });

    token
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
