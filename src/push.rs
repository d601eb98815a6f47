//! Push-based status source for the lock gate.
//!
//! Holds a WebSocket open against the backend's status feed and forwards
//! in-scope lock updates to the gate's reconciler. The feed is shared by
//! multiple consoles, so every message carries an `appId` and messages
//! scoped to another identity are ignored.
//!
//! Unlike log streams, this channel reconnects forever: it is a standing
//! control signal, not a one-operation observation. Reconnection follows the
//! configured [`RetryPolicy`] (fixed interval, unbounded) and only shutdown
//! stops the loop.

use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::gate::{Source, StatusUpdate};
use crate::retry::RetryPolicy;

/// One message on the shared status feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatusMessage {
    /// Which console this message is for.
    pub app_id: String,
    /// `true` means access is allowed (unlocked), mirroring the `allowed`
    /// field of the polled status endpoint.
    pub status: bool,
}

/// Run the push source until shutdown.
///
/// # Arguments
///
/// * `url` - WebSocket URL of the status feed.
/// * `app_id` - This console's identity; other messages are dropped.
/// * `policy` - Reconnect cadence after close, error, or failed connect.
/// * `updates` - Channel into the gate's reconciler.
/// * `shutdown_rx` - Signals the loop to stop; also honoured mid-wait.
pub(crate) async fn run_push_source(
    url: String,
    app_id: String,
    policy: RetryPolicy,
    updates: mpsc::Sender<StatusUpdate>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut attempt: u64 = 0;
    loop {
        if *shutdown_rx.borrow() {
            return;
        }

        match connect_async(url.as_str()).await {
            Ok((mut socket, _response)) => {
                tracing::info!(%url, "push channel: connected");
                loop {
                    tokio::select! {
                        message = socket.next() => match message {
                            Some(Ok(Message::Text(text))) => {
                                forward_in_scope(&text, &app_id, &updates).await;
                            }
                            // Control frames keep the connection alive but
                            // carry no status.
                            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_))) => {}
                            Some(Ok(Message::Close(_))) | None => {
                                tracing::info!("push channel: closed by server, will reconnect");
                                break;
                            }
                            Some(Err(error)) => {
                                tracing::warn!(error = %error, "push channel: transport error, will reconnect");
                                break;
                            }
                        },
                        changed = shutdown_rx.changed() => {
                            if changed.is_err() || *shutdown_rx.borrow() {
                                return;
                            }
                        }
                    }
                }
            }
            Err(error) => {
                tracing::warn!(%url, error = %error, "push channel: connect failed, will retry");
            }
        }

        // Fixed-interval, unbounded retry; only shutdown breaks the cycle.
        tokio::select! {
            _ = policy.wait(attempt) => {}
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    return;
                }
            }
        }
        attempt += 1;
    }
}

/// Decode one text frame and forward it if it is scoped to this console.
///
/// Malformed frames are logged and dropped; the previous lock state simply
/// stands until a well-formed update arrives.
async fn forward_in_scope(text: &str, app_id: &str, updates: &mpsc::Sender<StatusUpdate>) {
    let message: StatusMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(error) => {
            tracing::debug!(error = %error, "push channel: ignoring malformed message");
            return;
        }
    };
    if message.app_id != app_id {
        return;
    }
    let update = StatusUpdate {
        locked: !message.status,
        source: Source::Push,
    };
    // A closed receiver means the reconciler is shutting down; the shutdown
    // signal will stop this loop momentarily.
    let _ = updates.send(update).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_message_decodes_camel_case() {
        let message: StatusMessage =
            serde_json::from_str(r#"{"appId": "console-a", "status": true}"#).expect("decode");
        assert_eq!(message.app_id, "console-a");
        assert!(message.status);
    }

    #[tokio::test]
    async fn in_scope_messages_are_forwarded_as_lock_updates() {
        let (tx, mut rx) = mpsc::channel(4);
        forward_in_scope(r#"{"appId": "mine", "status": false}"#, "mine", &tx).await;
        let update = rx.recv().await.expect("update");
        assert!(update.locked);
        assert_eq!(update.source, Source::Push);

        forward_in_scope(r#"{"appId": "mine", "status": true}"#, "mine", &tx).await;
        let update = rx.recv().await.expect("update");
        assert!(!update.locked);
    }

    #[tokio::test]
    async fn out_of_scope_and_malformed_messages_are_dropped() {
        let (tx, mut rx) = mpsc::channel(4);
        forward_in_scope(r#"{"appId": "other", "status": false}"#, "mine", &tx).await;
        forward_in_scope("not json at all", "mine", &tx).await;
        forward_in_scope(r#"{"status": false}"#, "mine", &tx).await;
        drop(tx);
        assert!(rx.recv().await.is_none());
    }
}
