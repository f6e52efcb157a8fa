// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ingress watch driver.
//!
//! A kube [`watcher`] feeds [`IngressEvent`]s into a bounded channel and a
//! single consumer hands them to the [`DnsManager`] one at a time, so at most
//! one event is in flight. Handler errors are logged and the event is dropped;
//! the next resync or the next event for the same ingress gets another go.
//!
//! The watch is mirrored into a reflector [`Store`]. It serves two purposes:
//!
//! - **Resync**: every known ingress is replayed as [`IngressEvent::Exists`]
//!   on a fixed interval, so records follow a changed public IP and failed
//!   events are retried.
//! - **Re-list**: when the watcher lists again after losing its place,
//!   ingresses that vanished in the meantime are reported as
//!   [`IngressEvent::Deleted`].
//!
//! Every start of [`run_watch_loop`] opens a fresh watch, which re-lists all
//! ingresses before streaming changes. The periodic refresh runs beside the
//! loop and a failure there is fatal.

use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::derive::ingress_ref;
use crate::dns_errors::{DnsError, RefreshError};
use crate::manager::{DnsManager, IngressOutcome, RefreshTrigger};
use crate::metrics;
use futures::{Stream, StreamExt};
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::reflector::{self, ObjectRef, Store};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Client};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle event for one ingress.
#[derive(Clone, Debug)]
pub enum IngressEvent {
    /// The ingress was listed, added, or updated
    Exists(Ingress),
    /// The ingress was deleted
    Deleted(Ingress),
}

impl IngressEvent {
    /// Label value for this event kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Exists(_) => "exists",
            Self::Deleted(_) => "deleted",
        }
    }

    /// The ingress the event is about.
    #[must_use]
    pub fn ingress(&self) -> &Ingress {
        match self {
            Self::Exists(ingress) | Self::Deleted(ingress) => ingress,
        }
    }
}

/// Route one event to the matching manager handler.
///
/// # Errors
///
/// Returns whatever the handler returns.
pub async fn dispatch_event(
    manager: &DnsManager,
    event: &IngressEvent,
) -> Result<IngressOutcome, DnsError> {
    match event {
        IngressEvent::Exists(ingress) => manager.handle_ingress_exists(ingress).await,
        IngressEvent::Deleted(ingress) => manager.handle_ingress_deleted(ingress).await,
    }
}

/// Ingresses known when a re-list started, and those listed since.
struct Relist {
    previous: Vec<Arc<Ingress>>,
    listed: HashSet<ObjectRef<Ingress>>,
}

impl Relist {
    fn begin(store: &Store<Ingress>) -> Self {
        Self {
            previous: store.state(),
            listed: HashSet::new(),
        }
    }

    /// Ingresses known before the re-list that it did not return.
    fn vanished(self) -> Vec<Ingress> {
        let Self { previous, listed } = self;
        previous
            .into_iter()
            .filter(|ingress| !listed.contains(&ObjectRef::<Ingress>::from_obj(ingress)))
            .map(|ingress| Ingress::clone(&ingress))
            .collect()
    }
}

/// Translate a watcher stream into [`IngressEvent`]s on `tx`.
///
/// `store` must be the reflector store fed by `stream`. When the watcher
/// re-lists, ingresses that were in the store before the listing but are
/// missing from it are sent as [`IngressEvent::Deleted`] once the listing
/// completes.
///
/// Returns when the stream ends, the receiver is dropped, or `token` is
/// cancelled. Watcher errors are logged; the stream recovers on its own.
pub async fn forward_watch_events<S>(
    stream: S,
    store: Store<Ingress>,
    tx: mpsc::Sender<IngressEvent>,
    token: CancellationToken,
) where
    S: Stream<Item = Result<watcher::Event<Ingress>, watcher::Error>>,
{
    futures::pin_mut!(stream);
    let mut relist: Option<Relist> = None;

    loop {
        let next = tokio::select! {
            () = token.cancelled() => break,
            next = stream.next() => next,
        };

        let events = match next {
            None => {
                warn!("Ingress watch stream ended");
                break;
            }
            Some(Ok(watcher::Event::Apply(ingress))) => vec![IngressEvent::Exists(ingress)],
            Some(Ok(watcher::Event::InitApply(ingress))) => {
                if let Some(relist) = relist.as_mut() {
                    relist.listed.insert(ObjectRef::from_obj(&ingress));
                }
                vec![IngressEvent::Exists(ingress)]
            }
            Some(Ok(watcher::Event::Delete(ingress))) => vec![IngressEvent::Deleted(ingress)],
            Some(Ok(watcher::Event::Init)) => {
                debug!("Ingress watch (re)listing");
                relist = Some(Relist::begin(&store));
                continue;
            }
            Some(Ok(watcher::Event::InitDone)) => {
                let vanished = relist.take().map(Relist::vanished).unwrap_or_default();
                info!(vanished = vanished.len(), "Ingress watch listing complete");
                vanished.into_iter().map(IngressEvent::Deleted).collect()
            }
            Some(Err(e)) => {
                warn!(error = %e, "Ingress watch error");
                continue;
            }
        };

        for event in events {
            if tx.send(event).await.is_err() {
                debug!("Ingress event receiver closed");
                return;
            }
        }
    }
}

/// Replay every ingress in `store` as [`IngressEvent::Exists`] every `interval`.
///
/// The first replay happens one interval after the call. Returns when `token`
/// is cancelled or the receiver is dropped.
pub async fn run_resync(
    store: Store<Ingress>,
    tx: mpsc::Sender<IngressEvent>,
    interval: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = token.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let ingresses = store.state();
        debug!(count = ingresses.len(), "Resyncing ingresses");

        for ingress in ingresses {
            if tx.send(IngressEvent::Exists(Ingress::clone(&ingress))).await.is_err() {
                debug!("Ingress event receiver closed");
                return;
            }
        }
    }
}

/// Consume events sequentially until the channel closes or `token` is cancelled.
///
/// Cancellation also abandons the event being handled, including any
/// provider call or retry it is waiting on. The cache is only replaced by a
/// completed refresh, so it is never left half-written.
pub async fn run_event_loop(
    manager: Arc<DnsManager>,
    mut rx: mpsc::Receiver<IngressEvent>,
    token: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!("Ingress event loop cancelled");
                break;
            }
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let kind = event.kind();
        let result = tokio::select! {
            biased;
            () = token.cancelled() => {
                warn!(
                    ingress = %ingress_ref(event.ingress()),
                    event = kind,
                    "Abandoning in-flight ingress event"
                );
                break;
            }
            result = dispatch_event(&manager, &event) => result,
        };

        match result {
            Ok(outcome) => metrics::record_ingress_event(kind, outcome.as_str()),
            Err(e) => {
                metrics::record_ingress_event(kind, "error");
                metrics::record_error(e.error_type());
                error!(
                    ingress = %ingress_ref(event.ingress()),
                    event = kind,
                    error = %e,
                    "Failed to handle ingress event"
                );
            }
        }
    }
}

/// Watch every ingress in the cluster and reconcile it until `token` is cancelled.
///
/// Known ingresses are replayed every `resync_interval`. Can be called again
/// after it returns; each call starts a fresh watch and store.
pub async fn run_watch_loop(
    client: Client,
    manager: Arc<DnsManager>,
    resync_interval: Duration,
    token: CancellationToken,
) {
    info!(
        domain = %manager.bare_domain(),
        ingress_class = %manager.ingress_class(),
        resync_interval = ?resync_interval,
        "Starting ingress watch"
    );

    let api: Api<Ingress> = Api::all(client);
    let (store, writer) = reflector::store();
    let stream = watcher(api, watcher::Config::default())
        .default_backoff()
        .reflect(writer);
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

    // The resync stops with the watch so the event loop sees the channel close.
    let resync_token = token.child_token();
    let watch = {
        let tx = tx.clone();
        let store = store.clone();
        let token = token.clone();
        let resync_token = resync_token.clone();
        async move {
            forward_watch_events(stream, store, tx, token).await;
            resync_token.cancel();
        }
    };

    tokio::join!(
        watch,
        run_resync(store, tx, resync_interval, resync_token),
        run_event_loop(manager, rx, token),
    );

    info!("Ingress watch stopped");
}

/// Refresh the cache every `interval` until `token` is cancelled.
///
/// The first refresh happens one interval after the call.
///
/// # Errors
///
/// Returns the first [`RefreshError`]; callers treat it as fatal.
pub async fn run_periodic_refresh(
    manager: Arc<DnsManager>,
    interval: Duration,
    token: CancellationToken,
) -> Result<(), RefreshError> {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = token.cancelled() => return Ok(()),
            _ = ticker.tick() => {}
        }

        if let Err(e) = manager.refresh_cache(RefreshTrigger::Periodic).await {
            metrics::record_error("RefreshError");
            error!(error = %e, "Periodic cache refresh failed");
            return Err(e);
        }
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod watch_tests;
