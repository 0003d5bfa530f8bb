//! UDS JSON-RPC client for CLI subcommands.

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

pub(crate) async fn rpc_call(
    socket_path: &str,
    method: &str,
    params: serde_json::Value,
) -> anyhow::Result<serde_json::Value> {
    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| anyhow::anyhow!("cannot connect to daemon at {socket_path}: {e}"))?;

    let (reader, mut writer) = stream.into_split();

    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1,
    });
    let mut req = serde_json::to_string(&request)?;
    req.push('\n');
    writer.write_all(req.as_bytes()).await?;
    writer.shutdown().await?;

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let response: serde_json::Value = serde_json::from_str(line.trim())?;

    if let Some(error) = response.get("error") {
        anyhow::bail!("RPC error: {error}");
    }

    Ok(response["result"].clone())
}

/// `relwatch ls`: watchlist with match markers.
pub async fn cmd_ls(socket_path: &str) -> anyhow::Result<()> {
    let items = rpc_call(socket_path, "list_items", serde_json::json!({})).await?;
    print!("{}", format_watchlist(&items, Utc::now()));
    Ok(())
}

pub async fn cmd_add(socket_path: &str, name: &str, strict: bool) -> anyhow::Result<()> {
    let result = rpc_call(
        socket_path,
        "add_item",
        serde_json::json!({"name": name, "strict": strict}),
    )
    .await?;
    if result["added"].as_bool() == Some(true) {
        println!("added '{name}', polling now");
    } else {
        println!(
            "not added: {}",
            result["reason"].as_str().unwrap_or("unknown")
        );
    }
    Ok(())
}

pub async fn cmd_rm(socket_path: &str, name: &str) -> anyhow::Result<()> {
    let result = rpc_call(socket_path, "remove_item", serde_json::json!({"name": name})).await?;
    if result["removed"].as_bool() == Some(true) {
        println!("removed '{name}'");
    } else {
        println!("'{name}' is not on the watchlist");
    }
    Ok(())
}

pub async fn cmd_rename(socket_path: &str, old: &str, new: &str) -> anyhow::Result<()> {
    let result = rpc_call(
        socket_path,
        "rename_item",
        serde_json::json!({"old": old, "new": new}),
    )
    .await?;
    if result["renamed"].as_bool() == Some(true) {
        println!("renamed '{old}' to '{new}'");
    } else {
        println!(
            "not renamed: {}",
            result["reason"].as_str().unwrap_or("unknown")
        );
    }
    Ok(())
}

pub async fn cmd_strict(socket_path: &str, name: &str, strict: bool) -> anyhow::Result<()> {
    let result = rpc_call(
        socket_path,
        "set_strict",
        serde_json::json!({"name": name, "strict": strict}),
    )
    .await?;
    if result["updated"].as_bool() == Some(true) {
        println!(
            "'{name}' strict mode {}",
            if strict { "enabled" } else { "disabled" }
        );
    } else {
        println!("'{name}' is not on the watchlist");
    }
    Ok(())
}

pub async fn cmd_creds(socket_path: &str, username: &str, passkey: &str) -> anyhow::Result<()> {
    rpc_call(
        socket_path,
        "set_credentials",
        serde_json::json!({"username": username, "passkey": passkey}),
    )
    .await?;
    println!("credentials saved, polling now");
    Ok(())
}

pub async fn cmd_poll(socket_path: &str) -> anyhow::Result<()> {
    let outcome = rpc_call(socket_path, "poll_now", serde_json::json!({})).await?;
    match outcome["outcome"].as_str() {
        Some("completed") => println!(
            "polled {} items, {} new releases",
            outcome["polled"], outcome["fresh"]
        ),
        Some("no_credentials") => println!("no credentials; run 'relwatch creds' first"),
        Some("empty_watchlist") => println!("watchlist is empty"),
        _ => println!("{outcome}"),
    }
    Ok(())
}

pub async fn cmd_status(socket_path: &str) -> anyhow::Result<()> {
    let status = rpc_call(socket_path, "status", serde_json::json!({})).await?;
    print!("{}", format_status(&status, Utc::now()));
    Ok(())
}

// ─── Formatting ──────────────────────────────────────────────────
// Pure functions, separated for testability.

/// Render the watchlist: `●` items with at least one seen release, `○`
/// items that never matched.
pub(crate) fn format_watchlist(items: &serde_json::Value, now: DateTime<Utc>) -> String {
    let arr = match items.as_array() {
        Some(a) => a,
        None => return "--\n".to_string(),
    };
    if arr.is_empty() {
        return "watchlist is empty\n".to_string();
    }

    let width = arr
        .iter()
        .filter_map(|e| e["name"].as_str())
        .map(str::len)
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for entry in arr {
        let name = entry["name"].as_str().unwrap_or("?");
        let marker = if entry["matched"].as_bool() == Some(true) {
            '●'
        } else {
            '○'
        };
        let strict = if entry["strict"].as_bool() == Some(true) {
            " [strict]"
        } else {
            ""
        };
        let seen = entry["seen_count"].as_u64().unwrap_or(0);
        let tail = if seen == 0 {
            "never matched".to_string()
        } else {
            let age = entry["latest_seen"]
                .as_str()
                .and_then(|s| s.parse::<DateTime<Utc>>().ok())
                .map(|ts| format_age(now, ts))
                .unwrap_or_else(|| "?".to_string());
            format!("{seen} seen, last {age}")
        };
        out.push_str(&format!("{marker} {name:width$}{strict}  {tail}\n"));
    }
    out
}

/// Render the `status` response as a short summary block.
pub(crate) fn format_status(status: &serde_json::Value, now: DateTime<Utc>) -> String {
    let items = status["items"].as_u64().unwrap_or(0);
    let matched = status["matched"].as_u64().unwrap_or(0);
    let cursor = status["cursor"].as_u64().unwrap_or(0);
    let creds = if status["has_credentials"].as_bool() == Some(true) {
        "ok"
    } else {
        "missing"
    };
    let last_check = status["last_check"]
        .as_str()
        .and_then(|s| s.parse::<DateTime<Utc>>().ok())
        .map(|ts| format_age(now, ts))
        .unwrap_or_else(|| "never".to_string());

    format!(
        "watched:     {items} ({matched} matched)\n\
         cursor:      {cursor}\n\
         last check:  {last_check}\n\
         credentials: {creds}\n"
    )
}

/// Human age of a timestamp: "just now", "5m ago", "3h ago", "2d ago".
pub(crate) fn format_age(now: DateTime<Utc>, ts: DateTime<Utc>) -> String {
    let minutes = (now - ts).num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    format!("{}d ago", hours / 24)
}
