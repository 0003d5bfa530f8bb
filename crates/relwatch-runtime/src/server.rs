//! UDS JSON-RPC server: minimal hand-rolled implementation.
//! Connection-per-request, newline-delimited JSON. This is the control
//! plane for the CLI: watchlist mutations, credentials, manual polls.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::Mutex;

use relwatch_core::ledger::SeenLedger;
use relwatch_core::types::{Credentials, CycleState, TrackedItem};
use relwatch_daemon::store::StateStore;
use relwatch_daemon::watchlist::{self, AddOutcome, RenameOutcome};

use crate::poll_loop::DaemonState;

/// Run the UDS JSON-RPC server.
pub async fn run_server(socket_path: &str, state: Arc<Mutex<DaemonState>>) -> anyhow::Result<()> {
    // Create socket directory with mode 0700
    let socket_dir = std::path::Path::new(socket_path)
        .parent()
        .ok_or_else(|| anyhow::anyhow!("invalid socket path"))?;

    std::fs::create_dir_all(socket_dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_dir, std::fs::Permissions::from_mode(0o700))?;
    }

    // Check for stale socket
    if std::path::Path::new(socket_path).exists() {
        if tokio::net::UnixStream::connect(socket_path).await.is_err() {
            std::fs::remove_file(socket_path)?;
            tracing::info!("removed stale socket at {socket_path}");
        } else {
            anyhow::bail!("another daemon is already running at {socket_path}");
        }
    }

    let listener = UnixListener::bind(socket_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!("UDS server listening on {socket_path}");

    loop {
        let (stream, _) = listener.accept().await?;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                tracing::debug!("connection error: {e}");
            }
        });
    }
}

async fn handle_connection(
    stream: tokio::net::UnixStream,
    state: Arc<Mutex<DaemonState>>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let request: serde_json::Value = serde_json::from_str(line.trim())?;
    let method = request["method"].as_str().unwrap_or("");
    let id = request["id"].clone();

    let response = match dispatch(method, &request["params"], &state).await {
        Ok(Some(result)) => serde_json::json!({
            "jsonrpc": "2.0",
            "result": result,
            "id": id,
        }),
        Ok(None) => serde_json::json!({
            "jsonrpc": "2.0",
            "error": {"code": -32601, "message": "method not found"},
            "id": id,
        }),
        Err(e) => serde_json::json!({
            "jsonrpc": "2.0",
            "error": {"code": -32000, "message": e.to_string()},
            "id": id,
        }),
    };

    let mut resp = serde_json::to_string(&response)?;
    resp.push('\n');
    writer.write_all(resp.as_bytes()).await?;

    Ok(())
}

/// Dispatch one request. `Ok(None)` means method-not-found.
async fn dispatch(
    method: &str,
    params: &serde_json::Value,
    state: &Arc<Mutex<DaemonState>>,
) -> anyhow::Result<Option<serde_json::Value>> {
    let result = match method {
        "status" => {
            let st = state.lock().await;
            let store = st.scheduler.store();
            build_status(
                &store.load_items()?,
                &store.load_ledger()?,
                &store.load_cycle()?,
                store.load_last_check()?,
                store.load_credentials()?.is_some(),
            )
        }
        "list_items" => {
            let st = state.lock().await;
            let store = st.scheduler.store();
            build_watchlist(&store.load_items()?, &store.load_ledger()?)
        }
        "add_item" => {
            let name = params["name"].as_str().unwrap_or("");
            let strict = params["strict"].as_bool().unwrap_or(false);
            let outcome = {
                let mut st = state.lock().await;
                watchlist::add(st.scheduler.store_mut(), name, strict, Utc::now())?
            };
            match outcome {
                AddOutcome::Added => {
                    spawn_full_poll(Arc::clone(state), "item added");
                    serde_json::json!({"added": true})
                }
                AddOutcome::Duplicate => {
                    serde_json::json!({"added": false, "reason": "already watched"})
                }
                AddOutcome::InvalidName => {
                    serde_json::json!({"added": false, "reason": "empty name"})
                }
            }
        }
        "remove_item" => {
            let name = params["name"].as_str().unwrap_or("");
            let mut st = state.lock().await;
            let removed = watchlist::remove(st.scheduler.store_mut(), name)?;
            serde_json::json!({"removed": removed})
        }
        "rename_item" => {
            let old = params["old"].as_str().unwrap_or("");
            let new = params["new"].as_str().unwrap_or("");
            let mut st = state.lock().await;
            match watchlist::rename(st.scheduler.store_mut(), old, new)? {
                RenameOutcome::Renamed => serde_json::json!({"renamed": true}),
                RenameOutcome::NotFound => {
                    serde_json::json!({"renamed": false, "reason": "not found"})
                }
                RenameOutcome::Duplicate => {
                    serde_json::json!({"renamed": false, "reason": "name already watched"})
                }
                RenameOutcome::InvalidName => {
                    serde_json::json!({"renamed": false, "reason": "empty name"})
                }
            }
        }
        "set_strict" => {
            let name = params["name"].as_str().unwrap_or("");
            let strict = params["strict"].as_bool().unwrap_or(false);
            let mut st = state.lock().await;
            let updated = watchlist::set_strict(st.scheduler.store_mut(), name, strict)?;
            serde_json::json!({"updated": updated})
        }
        "set_credentials" => {
            let creds = Credentials {
                username: params["username"].as_str().unwrap_or("").to_owned(),
                passkey: params["passkey"].as_str().unwrap_or("").to_owned(),
            };
            if creds.username.is_empty() || creds.passkey.is_empty() {
                anyhow::bail!("username and passkey must be non-empty");
            }
            {
                let mut st = state.lock().await;
                st.scheduler.store_mut().save_credentials(&creds)?;
            }
            spawn_full_poll(Arc::clone(state), "credentials updated");
            serde_json::json!({"saved": true})
        }
        "poll_now" => {
            let mut st = state.lock().await;
            let outcome = st.scheduler.full_poll(Utc::now()).await?;
            serde_json::to_value(outcome)?
        }
        _ => return Ok(None),
    };

    Ok(Some(result))
}

/// Kick off a full poll without holding up the RPC response.
fn spawn_full_poll(state: Arc<Mutex<DaemonState>>, reason: &'static str) {
    tokio::spawn(async move {
        let mut st = state.lock().await;
        match st.scheduler.full_poll(Utc::now()).await {
            Ok(outcome) => tracing::debug!(?outcome, reason, "triggered full poll done"),
            Err(e) => tracing::error!("triggered full poll failed ({reason}): {e}"),
        }
    });
}

/// Build the `status` response.
pub(crate) fn build_status(
    items: &[TrackedItem],
    ledger: &SeenLedger,
    cycle: &CycleState,
    last_check: Option<DateTime<Utc>>,
    has_credentials: bool,
) -> serde_json::Value {
    let matched = items
        .iter()
        .filter(|item| ledger.has_matches(&item.key()))
        .count();

    serde_json::json!({
        "items": items.len(),
        "matched": matched,
        "cursor": cycle.cursor,
        "next_cycle_at": cycle.next_cycle_at,
        "last_check": last_check,
        "has_credentials": has_credentials,
    })
}

/// Build the `list_items` response: one entry per item, watchlist order.
pub(crate) fn build_watchlist(items: &[TrackedItem], ledger: &SeenLedger) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = items
        .iter()
        .map(|item| {
            let key = item.key();
            serde_json::json!({
                "name": item.name,
                "strict": item.strict,
                "added_at": item.added_at,
                "matched": ledger.has_matches(&key),
                "seen_count": ledger.seen_count(&key),
                "latest_seen": ledger.latest_seen(&key),
            })
        })
        .collect();
    serde_json::Value::Array(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relwatch_core::types::item_key;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).expect("valid timestamp")
    }

    fn sample() -> (Vec<TrackedItem>, SeenLedger) {
        let items = vec![
            TrackedItem::new("The Wire", ts(0), false),
            TrackedItem::new("Severance", ts(0), true),
        ];
        let mut ledger = SeenLedger::new();
        ledger.merge(&item_key("The Wire"), ["42", "43"], ts(500));
        (items, ledger)
    }

    #[test]
    fn status_counts_matched_items() {
        let (items, ledger) = sample();
        let status = build_status(&items, &ledger, &CycleState::default(), None, true);
        assert_eq!(status["items"], 2);
        assert_eq!(status["matched"], 1);
        assert_eq!(status["cursor"], 0);
        assert_eq!(status["has_credentials"], true);
        assert!(status["last_check"].is_null());
    }

    #[test]
    fn status_reports_cycle_position() {
        let (items, ledger) = sample();
        let cycle = CycleState {
            cursor: 1,
            next_cycle_at: ts(9000),
        };
        let status = build_status(&items, &ledger, &cycle, Some(ts(8000)), false);
        assert_eq!(status["cursor"], 1);
        assert_eq!(status["has_credentials"], false);
        assert!(!status["last_check"].is_null());
    }

    #[test]
    fn watchlist_preserves_order_and_marks_matches() {
        let (items, ledger) = sample();
        let list = build_watchlist(&items, &ledger);
        let arr = list.as_array().expect("array");
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0]["name"], "The Wire");
        assert_eq!(arr[0]["matched"], true);
        assert_eq!(arr[0]["seen_count"], 2);
        assert_eq!(arr[1]["name"], "Severance");
        assert_eq!(arr[1]["matched"], false);
        assert_eq!(arr[1]["strict"], true);
        assert!(arr[1]["latest_seen"].is_null());
    }

    #[test]
    fn watchlist_empty_is_empty_array() {
        let list = build_watchlist(&[], &SeenLedger::new());
        assert_eq!(list, serde_json::Value::Array(vec![]));
    }
}
