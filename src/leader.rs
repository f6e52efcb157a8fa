// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Leader-election gate for the watch loop.
//!
//! Only the replica holding the Kubernetes `Lease` may mutate DNS. The
//! [`LeaderGate`] state machine starts a fresh loop, under a child
//! [`CancellationToken`], each time leadership is acquired. When leadership
//! is lost it cancels that token and waits for the loop task to finish
//! before reporting [`LeaderState::Idle`], so two replicas never mutate
//! concurrently.
//!
//! ```text
//!          acquired               lost
//!   Idle ───────────▶ Leading ───────────▶ Stopping
//!    ▲                                        │
//!    └──────────── loop task joined ──────────┘
//! ```
//!
//! [`run_with_lease`] drives the gate from `kube-lease-manager`.

use crate::config::LeaseSettings;
use crate::metrics;
use anyhow::{Context, Result};
use kube::Client;
use kube_lease_manager::LeaseManagerBuilder;
use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Where the gate is in the leadership cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaderState {
    /// Not leading; no loop is running
    Idle,
    /// Leading; the loop is running
    Leading,
    /// Leadership lost; waiting for the loop to stop
    Stopping,
}

/// Starts and stops a restartable loop as leadership comes and goes.
pub struct LeaderGate<F> {
    identity: String,
    shutdown: CancellationToken,
    start: F,
    state: LeaderState,
    running: Option<(CancellationToken, JoinHandle<()>)>,
}

impl<F, Fut> LeaderGate<F>
where
    F: Fn(CancellationToken) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    /// Create an idle gate.
    ///
    /// `start` is called with a fresh child of `shutdown` every time
    /// leadership is acquired, and must return once that token is cancelled.
    pub fn new(identity: &str, shutdown: CancellationToken, start: F) -> Self {
        Self {
            identity: identity.to_string(),
            shutdown,
            start,
            state: LeaderState::Idle,
            running: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LeaderState {
        self.state
    }

    /// React to a leadership report; repeated reports of the same value are ignored.
    pub async fn set_leader(&mut self, is_leader: bool) {
        match (self.state, is_leader) {
            (LeaderState::Idle, true) => self.start_loop(),
            (LeaderState::Leading, false) => self.stop().await,
            _ => {}
        }
    }

    /// Stop the loop if it is running and wait for it to finish.
    pub async fn stop(&mut self) {
        let Some((token, handle)) = self.running.take() else {
            self.state = LeaderState::Idle;
            return;
        };

        self.state = LeaderState::Stopping;
        info!(identity = %self.identity, "Stopping ingress watch");
        token.cancel();

        if let Err(e) = handle.await {
            error!(identity = %self.identity, error = %e, "Ingress watch task failed");
        }

        metrics::record_leader_lost(&self.identity);
        self.state = LeaderState::Idle;
    }

    fn start_loop(&mut self) {
        info!(identity = %self.identity, "Acquired leadership, starting ingress watch");
        metrics::record_leader_elected(&self.identity);

        let token = self.shutdown.child_token();
        let handle = tokio::spawn((self.start)(token.clone()));
        self.running = Some((token, handle));
        self.state = LeaderState::Leading;
    }
}

/// Run `start` only while this replica holds the lease, until `shutdown` is cancelled.
///
/// The lease is released on the way out.
///
/// # Errors
///
/// Returns an error if the lease manager cannot be built or stops on its own.
pub async fn run_with_lease<F, Fut>(
    client: Client,
    lease: &LeaseSettings,
    shutdown: CancellationToken,
    start: F,
) -> Result<()>
where
    F: Fn(CancellationToken) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    info!(
        lease = %lease.name,
        namespace = %lease.namespace,
        identity = %lease.identity,
        "Waiting for leadership"
    );

    let manager = LeaseManagerBuilder::new(client, &lease.name)
        .with_namespace(&lease.namespace)
        .with_identity(&lease.identity)
        .with_duration(lease.duration_secs)
        .with_grace(lease.grace_secs)
        .build()
        .await
        .context("failed to create lease manager")?;

    let (mut leadership, lease_task) = manager.watch().await;
    let mut gate = LeaderGate::new(&lease.identity, shutdown.clone(), start);

    let is_leader = *leadership.borrow_and_update();
    gate.set_leader(is_leader).await;

    let lease_lost = loop {
        tokio::select! {
            () = shutdown.cancelled() => break false,
            changed = leadership.changed() => {
                if changed.is_err() {
                    break true;
                }
                let is_leader = *leadership.borrow_and_update();
                gate.set_leader(is_leader).await;
            }
        }
    };

    gate.stop().await;

    // Dropping the receiver makes the lease manager release the lease.
    drop(leadership);
    lease_task
        .await
        .context("lease manager task panicked")?
        .context("lease manager failed")?;

    if lease_lost {
        warn!(lease = %lease.name, "Lease manager stopped unexpectedly");
        anyhow::bail!("lease manager for {} stopped unexpectedly", lease.name);
    }

    info!(lease = %lease.name, "Released lease");
    Ok(())
}

#[cfg(test)]
#[path = "leader_tests.rs"]
mod leader_tests;
