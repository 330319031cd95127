use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use axum::{
    extract::State,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
};
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use quill_core::Parts;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::AppState;

/// Name under which [`inject_script`] can be listed in `part_processors`.
pub const PROCESSOR_NAME: &str = "livereload";

const RELOAD_MESSAGE: &str = "reload";

const SCRIPT: &str = r#"<script>
(function() {
    const socket = new WebSocket('ws://' + location.host + '/__livereload');
    socket.onmessage = function(event) {
        if (event.data === 'reload') {
            location.reload();
        }
    };
    socket.onclose = function() {
        console.log('Live reload disconnected');
    };
})();
</script>"#;

/// Part processor that adds the live reload client to `{extra}`.
pub fn inject_script(parts: &mut Parts) {
    parts.append("{extra}", SCRIPT);
}

pub(crate) async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // Subscribe before the upgrade so a change made meanwhile is not lost.
    let reloads = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| websocket_connection(socket, reloads))
}

/// Forwards reload messages to one browser tab until either side goes away.
async fn websocket_connection(mut socket: WebSocket, mut reloads: broadcast::Receiver<String>) {
    tracing::debug!("live reload client connected");

    loop {
        tokio::select! {
            reload = reloads.recv() => match reload {
                Ok(message) => {
                    if socket.send(Message::Text(message.into())).await.is_err() {
                        break;
                    }
                }
                // Missed messages are all the same reload.
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "live reload client lagged behind");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => {
                if client_gone(&incoming) {
                    break;
                }
            }
        }
    }

    tracing::debug!("live reload client disconnected");
}

/// The client script never sends anything, so only closing matters.
fn client_gone(incoming: &Option<Result<Message, axum::Error>>) -> bool {
    !matches!(incoming, Some(Ok(message)) if !matches!(message, Message::Close(_)))
}

fn is_ignored(path: &str, ignore_patterns: &[String]) -> bool {
    ignore_patterns.iter().any(|pattern| path.contains(pattern))
}

/// Watches `watch_paths` and tells every connected page to reload when
/// something changes. Reloads are sent at most once a second.
pub async fn start_file_watcher(
    watch_paths: Vec<PathBuf>,
    reload_tx: broadcast::Sender<String>,
    ignore_patterns: Vec<String>,
) -> Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(100);

    let mut debouncer = new_debouncer(
        Duration::from_millis(500),
        move |res: DebounceEventResult| match res {
            Ok(events) => {
                for event in events {
                    let path = event.path.to_string_lossy();
                    if !is_ignored(&path, &ignore_patterns) {
                        let _ = tx.blocking_send(event.path);
                    }
                }
            }
            Err(e) => tracing::warn!("watch error: {}", e),
        },
    )?;

    for path in &watch_paths {
        debouncer
            .watcher()
            .watch(path, notify::RecursiveMode::Recursive)?;
        tracing::info!("Watching: {}", path.display());
    }

    let mut last_reload = std::time::Instant::now();
    while let Some(path) = rx.recv().await {
        tracing::debug!("File changed: {}", path.display());

        let now = std::time::Instant::now();
        if now.duration_since(last_reload) > Duration::from_millis(1000) {
            // No receivers just means no page is open.
            let _ = reload_tx.send(RELOAD_MESSAGE.to_string());
            last_reload = now;
            tracing::info!("Reloading pages after change to {}", path.display());
        } else {
            tracing::debug!("Skipping reload (too soon)");
        }
    }

    Ok(())
}
