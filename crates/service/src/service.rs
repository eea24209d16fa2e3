//! The background service task.
//!
//! One task owns the request channel. Storage mutations are handled
//! inline, so they complete in exactly the order their requests
//! arrived; summarization is spawned off because it can sit on the
//! network for seconds and must not stall storage traffic.

use std::sync::Arc;

use litmark_core::{AppConfig, Error, StoreDb};
use litmark_client::SummaryBackend;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::coordinator::Coordinator;
use crate::gateway::SummaryGateway;
use crate::rpc::{Envelope, Notification, Request, Response, ServiceHandle};
use crate::sweeper::spawn_sweeper;

/// Depth of the request channel before senders back-pressure.
const REQUEST_QUEUE_DEPTH: usize = 64;

/// Depth of the notification broadcast ring.
const NOTIFY_QUEUE_DEPTH: usize = 32;

/// Spawn the service over a store, returning the page-facing handle.
pub async fn spawn(db: StoreDb, config: AppConfig) -> (ServiceHandle, JoinHandle<()>) {
    spawn_inner(db, config, None).await
}

/// Spawn with an injected summarization backend.
pub async fn spawn_with_backend(
    db: StoreDb, config: AppConfig, backend: Arc<dyn SummaryBackend>,
) -> (ServiceHandle, JoinHandle<()>) {
    spawn_inner(db, config, Some(backend)).await
}

async fn spawn_inner(
    db: StoreDb, config: AppConfig, backend: Option<Arc<dyn SummaryBackend>>,
) -> (ServiceHandle, JoinHandle<()>) {
    if let Err(e) = db.check_version().await {
        tracing::warn!("store version check failed: {e}");
    }

    let (tx, rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
    let (notify, _) = broadcast::channel::<Notification>(NOTIFY_QUEUE_DEPTH);

    let coordinator = Arc::new(Coordinator::new(db, config, notify.clone()));
    let gateway = Arc::new(match backend {
        Some(backend) => SummaryGateway::with_backend(coordinator.clone(), backend),
        None => SummaryGateway::new(coordinator.clone()),
    });

    let handle = ServiceHandle::new(tx, notify);
    let task = tokio::spawn(run(rx, coordinator, gateway));

    (handle, task)
}

async fn run(mut rx: mpsc::Receiver<Envelope>, coordinator: Arc<Coordinator>, gateway: Arc<SummaryGateway>) {
    let sweeper = spawn_sweeper(coordinator.clone());

    while let Some(Envelope { request, respond }) = rx.recv().await {
        match request {
            Request::SummarizeHighlight { highlight } => {
                let gateway = gateway.clone();
                tokio::spawn(async move {
                    let result = gateway
                        .summarize(&highlight)
                        .await
                        .map(|summary| Response::Summary { summary });
                    let _ = respond.send(result);
                });
            }
            other => {
                let result = handle_request(&coordinator, other).await;
                let _ = respond.send(result);
            }
        }
    }

    sweeper.abort();
    tracing::debug!("service task stopped");
}

async fn handle_request(coordinator: &Coordinator, request: Request) -> Result<Response, Error> {
    match request {
        Request::SaveHighlight { highlight } => {
            let highlight = coordinator.save(highlight).await?;
            Ok(Response::Saved { highlight })
        }
        Request::GetHighlights => {
            let highlights = coordinator.get_all().await?;
            Ok(Response::Highlights { highlights })
        }
        Request::DeleteHighlight { id } => {
            coordinator.delete(&id).await?;
            Ok(Response::Deleted)
        }
        Request::ClearAllHighlights => {
            coordinator.clear().await?;
            Ok(Response::Cleared)
        }
        Request::ExportHighlights => {
            let payload = coordinator.export().await?;
            Ok(Response::Exported { payload })
        }
        Request::ImportHighlights { highlights, merge } => {
            let report = coordinator.import(&highlights, merge).await?;
            Ok(Response::Imported { report })
        }
        Request::GetConfig => {
            let config = coordinator.get_config().await?;
            Ok(Response::Config { config })
        }
        Request::SaveConfig { config } => {
            coordinator.save_config(config).await?;
            Ok(Response::ConfigSaved)
        }
        Request::SummarizeHighlight { .. } => {
            unreachable!("summarize requests are dispatched before handle_request")
        }
    }
}
