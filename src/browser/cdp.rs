// src/browser/cdp.rs
//
// Chrome DevTools Protocol over one page-target WebSocket: JSON-RPC commands
// with an incrementing id; events and stale replies are skipped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::PageDriver;
use crate::error::{Result, ScrapeError};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

pub struct CdpConnection {
    sink: Mutex<WsSink>,
    stream: Mutex<WsStream>,
    next_id: AtomicU64,
    command_timeout: Duration,
}

impl CdpConnection {
    /// Attach to a target's `webSocketDebuggerUrl`.
    pub async fn connect(ws_url: &str, command_timeout: Duration) -> Result<Self> {
        logd!(url = %ws_url, "attaching to devtools target");
        let (ws, _) = connect_async(ws_url)
            .await
            .map_err(|e| ScrapeError::Disconnected(format!("{ws_url}: {e}")))?;
        let (sink, stream) = ws.split();

        Ok(Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            next_id: AtomicU64::new(1),
            command_timeout,
        })
    }

    /// Send a command and wait for the reply carrying the same id.
    pub async fn send_command(&self, method: &str, params: Value) -> Result<Value> {
        match tokio::time::timeout(self.command_timeout, self.round_trip(method, params)).await {
            Ok(res) => res,
            Err(_) => Err(ScrapeError::Protocol(format!(
                "{method} got no reply within {:?}", self.command_timeout
            ))),
        }
    }

    async fn round_trip(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let message = json!({ "id": id, "method": method, "params": params });
        logd!(id, method, "cdp →");

        {
            let mut sink = self.sink.lock().await;
            sink.send(Message::Text(message.to_string().into()))
                .await
                .map_err(|e| ScrapeError::Disconnected(e.to_string()))?;
        }

        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    let Ok(resp) = serde_json::from_str::<Value>(text.as_str()) else { continue };
                    if let Some(reply) = match_reply(&resp, id)? {
                        return Ok(reply);
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    return Err(ScrapeError::Disconnected(format!("target closed: {frame:?}")));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(ScrapeError::Disconnected(e.to_string())),
                None => return Err(ScrapeError::Disconnected(s!("socket closed"))),
            }
        }
    }

    /// Detach without closing the browser tab.
    pub async fn close(&self) {
        let mut sink = self.sink.lock().await;
        let _ = sink.send(Message::Close(None)).await;
    }
}

/// `Ok(Some(result))` for our reply, `Ok(None)` for anything else on the wire.
fn match_reply(resp: &Value, id: u64) -> Result<Option<Value>> {
    if resp.get("method").and_then(Value::as_str) == Some("Inspector.detached") {
        let reason = resp["params"]["reason"].as_str().unwrap_or("unknown");
        return Err(ScrapeError::Disconnected(format!("inspector detached: {reason}")));
    }
    if resp.get("id").and_then(Value::as_u64) != Some(id) {
        return Ok(None);
    }
    if let Some(err) = resp.get("error") {
        let msg = err.get("message").and_then(Value::as_str).unwrap_or("unknown CDP error");
        return Err(ScrapeError::Protocol(s!(msg)));
    }
    Ok(Some(resp.get("result").cloned().unwrap_or_else(|| json!({}))))
}

/// Unwrap a `Runtime.evaluate` result into its by-value JSON.
fn evaluate_value(result: &Value) -> Result<Value> {
    if let Some(exc) = result.get("exceptionDetails") {
        let text = exc["exception"]["description"]
            .as_str()
            .or_else(|| exc["text"].as_str())
            .unwrap_or("script threw");
        return Err(ScrapeError::Protocol(format!("evaluate: {text}")));
    }
    Ok(result["result"].get("value").cloned().unwrap_or(Value::Null))
}

#[async_trait]
impl PageDriver for CdpConnection {
    async fn navigate(&self, url: &str) -> Result<()> {
        let res = self.send_command("Page.navigate", json!({ "url": url })).await?;
        match res.get("errorText").and_then(Value::as_str) {
            Some(err) if !err.is_empty() => Err(ScrapeError::Protocol(format!("navigate {url}: {err}"))),
            _ => Ok(()),
        }
    }

    async fn evaluate(&self, expression: &str) -> Result<Value> {
        let res = self
            .send_command(
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": true }),
            )
            .await?;
        evaluate_value(&res)
    }
}
