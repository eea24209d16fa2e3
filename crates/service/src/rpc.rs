//! Page-to-service messaging contract.
//!
//! Requests are action-tagged so they serialize to the same wire shape
//! page contexts exchange with the background service; in process they
//! ride an mpsc channel with a oneshot reply per request. Every round
//! trip is bounded by [`limits::RPC_TIMEOUT`]; an unreachable service
//! is an error, never a silent no-op. Update notifications ride a
//! separate broadcast channel and are fire-and-forget.

use std::collections::BTreeMap;

use litmark_core::{Error, ExportPayload, Highlight, ImportReport, limits};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};

/// A request from a page context to the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    SaveHighlight { highlight: Highlight },
    GetHighlights,
    DeleteHighlight { id: String },
    ClearAllHighlights,
    ExportHighlights,
    ImportHighlights { highlights: Vec<serde_json::Value>, merge: bool },
    SummarizeHighlight { highlight: Highlight },
    GetConfig,
    SaveConfig { config: BTreeMap<String, String> },
}

/// A successful service response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Response {
    Saved { highlight: Highlight },
    Highlights { highlights: Vec<Highlight> },
    Deleted,
    Cleared,
    Exported { payload: ExportPayload },
    Imported { report: ImportReport },
    Summary { summary: String },
    Config { config: BTreeMap<String, String> },
    ConfigSaved,
}

/// One-way notification broadcast to all page contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// The persisted highlight set changed; re-run the mark pass.
    HighlightsUpdated,
}

/// A request paired with its reply slot.
#[derive(Debug)]
pub struct Envelope {
    pub request: Request,
    pub respond: oneshot::Sender<Result<Response, Error>>,
}

/// Handle a page context uses to talk to the service.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Envelope>,
    notify: broadcast::Sender<Notification>,
}

impl ServiceHandle {
    pub(crate) fn new(tx: mpsc::Sender<Envelope>, notify: broadcast::Sender<Notification>) -> Self {
        Self { tx, notify }
    }

    /// Subscribe to update notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notify.subscribe()
    }

    /// Send one request and await its reply, bounded by the RPC timeout.
    ///
    /// # Errors
    ///
    /// `ServiceUnavailable` if the service task is gone, `Timeout` if
    /// the round trip exceeds its bound, or whatever error the service
    /// produced for the request.
    pub async fn request(&self, request: Request) -> Result<Response, Error> {
        let (respond, rx) = oneshot::channel();
        self.tx
            .send(Envelope { request, respond })
            .await
            .map_err(|_| Error::ServiceUnavailable("service task is not running".into()))?;

        match tokio::time::timeout(limits::RPC_TIMEOUT, rx).await {
            Err(_) => Err(Error::Timeout(format!(
                "service round trip exceeded {}s",
                limits::RPC_TIMEOUT.as_secs()
            ))),
            Ok(Err(_)) => Err(Error::ServiceUnavailable("service dropped the request".into())),
            Ok(Ok(result)) => result,
        }
    }

    /// Persist a highlight; returns the stored record.
    pub async fn save_highlight(&self, highlight: Highlight) -> Result<Highlight, Error> {
        match self.request(Request::SaveHighlight { highlight }).await? {
            Response::Saved { highlight } => Ok(highlight),
            other => Err(unexpected(other)),
        }
    }

    /// Fetch the full highlight list, newest first.
    pub async fn get_highlights(&self) -> Result<Vec<Highlight>, Error> {
        match self.request(Request::GetHighlights).await? {
            Response::Highlights { highlights } => Ok(highlights),
            other => Err(unexpected(other)),
        }
    }

    /// Delete by id; deleting a missing id is a success.
    pub async fn delete_highlight(&self, id: &str) -> Result<(), Error> {
        match self.request(Request::DeleteHighlight { id: id.to_string() }).await? {
            Response::Deleted => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Remove every stored highlight.
    pub async fn clear_all(&self) -> Result<(), Error> {
        match self.request(Request::ClearAllHighlights).await? {
            Response::Cleared => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Export the list as a versioned payload.
    pub async fn export_highlights(&self) -> Result<ExportPayload, Error> {
        match self.request(Request::ExportHighlights).await? {
            Response::Exported { payload } => Ok(payload),
            other => Err(unexpected(other)),
        }
    }

    /// Import untrusted records, merging or replacing.
    pub async fn import_highlights(
        &self, highlights: Vec<serde_json::Value>, merge: bool,
    ) -> Result<ImportReport, Error> {
        match self.request(Request::ImportHighlights { highlights, merge }).await? {
            Response::Imported { report } => Ok(report),
            other => Err(unexpected(other)),
        }
    }

    /// Summarize one highlight through the gateway.
    pub async fn summarize_highlight(&self, highlight: Highlight) -> Result<String, Error> {
        match self.request(Request::SummarizeHighlight { highlight }).await? {
            Response::Summary { summary } => Ok(summary),
            other => Err(unexpected(other)),
        }
    }

    /// Read the persisted option set.
    pub async fn get_config(&self) -> Result<BTreeMap<String, String>, Error> {
        match self.request(Request::GetConfig).await? {
            Response::Config { config } => Ok(config),
            other => Err(unexpected(other)),
        }
    }

    /// Persist the recognized option set.
    pub async fn save_config(&self, config: BTreeMap<String, String>) -> Result<(), Error> {
        match self.request(Request::SaveConfig { config }).await? {
            Response::ConfigSaved => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: Response) -> Error {
    Error::ServiceUnavailable(format!("unexpected response variant: {response:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_action_tags() {
        let req = Request::DeleteHighlight { id: "abc".into() };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["action"], "deleteHighlight");
        assert_eq!(json["id"], "abc");

        let req = Request::GetHighlights;
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["action"], "getHighlights");
    }

    #[test]
    fn test_request_round_trip() {
        let req = Request::ImportHighlights { highlights: vec![serde_json::json!({"id": "x"})], merge: true };
        let json = serde_json::to_string(&req).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, Request::ImportHighlights { merge: true, .. }));
    }

    #[tokio::test]
    async fn test_request_against_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        let (notify, _) = broadcast::channel(1);
        drop(rx);
        let handle = ServiceHandle::new(tx, notify);
        let result = handle.request(Request::GetHighlights).await;
        assert!(matches!(result, Err(Error::ServiceUnavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout() {
        let (tx, mut rx) = mpsc::channel(1);
        let (notify, _) = broadcast::channel(1);
        let handle = ServiceHandle::new(tx, notify);

        // A receiver that holds the envelope without ever replying.
        let hold = tokio::spawn(async move {
            let envelope = rx.recv().await;
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            drop(envelope);
        });

        let result = handle.request(Request::GetHighlights).await;
        assert!(matches!(result, Err(Error::Timeout(_))));
        hold.abort();
    }
}
