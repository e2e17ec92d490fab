//! JSON-lines development transport.
//!
//! Stands in for the message bus when running a node locally. Each input
//! line is one request:
//!
//! ```text
//! {"subject": "find-match", "payload": {"client_id": 1}, "reply_to": "inbox.7"}
//! ```
//!
//! Each output line is `{"topic": ..., "body": ...}`: either a reply (topic
//! is `reply_to`, or `<subject>.reply` when absent) or a forwarded
//! notification on its broadcast topic.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use arena_engine::Gateway;
use arena_types::{ArenaError, Notification, Result};

#[derive(Debug, Deserialize)]
pub struct Inbound {
    pub subject: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outbound {
    pub topic: String,
    pub body: Value,
}

impl Outbound {
    fn from_bytes(topic: String, bytes: &[u8]) -> Self {
        let body = serde_json::from_slice(bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()));
        Self { topic, body }
    }
}

/// Read requests from `input` until EOF, dispatching each on its own task.
/// Returns once every in-flight request has been answered.
pub async fn serve<R>(gateway: Gateway, input: R, out: mpsc::Sender<Outbound>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut inflight = JoinSet::new();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| ArenaError::Io(format!("transport read failed: {e}")))?
    {
        if line.trim().is_empty() {
            continue;
        }
        let inbound: Inbound = match serde_json::from_str(&line) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "unparseable transport line");
                continue;
            }
        };

        let (gateway, out) = (gateway.clone(), out.clone());
        inflight.spawn(async move {
            let payload = match &inbound.payload {
                Value::Null => Vec::new(),
                v => v.to_string().into_bytes(),
            };
            if let Some(reply) = gateway.handle(&inbound.subject, &payload).await {
                let topic = inbound
                    .reply_to
                    .unwrap_or_else(|| format!("{}.reply", inbound.subject));
                let _ = out.send(Outbound::from_bytes(topic, &reply)).await;
            }
        });
        while inflight.try_join_next().is_some() {}
    }

    while inflight.join_next().await.is_some() {}
    info!("transport input closed");
    Ok(())
}

/// Forward every notification to `out` until the notifier closes.
pub async fn forward_notifications(
    mut events: broadcast::Receiver<Notification>,
    out: mpsc::Sender<Outbound>,
) {
    loop {
        match events.recv().await {
            Ok(n) => match n.body() {
                Ok(body) => {
                    if out.send(Outbound::from_bytes(n.topic(), &body)).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(topic = %n.topic(), error = %e, "notification not encodable"),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "notification forwarder lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("notification forwarder stopped");
}

/// Drain `rx` into `writer`, one JSON object per line.
pub async fn write_lines<W>(mut rx: mpsc::Receiver<Outbound>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(msg) = rx.recv().await {
        let mut line =
            serde_json::to_vec(&msg).map_err(|e| ArenaError::Serialization(e.to_string()))?;
        line.push(b'\n');
        writer
            .write_all(&line)
            .await
            .map_err(|e| ArenaError::Io(format!("transport write failed: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| ArenaError::Io(format!("transport flush failed: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arena_engine::Engine;
    use arena_ledger::InMemoryLedger;
    use arena_types::EngineConfig;

    use super::*;

    fn gateway() -> Gateway {
        let config = EngineConfig {
            pack_card_count: 30,
            rng_seed: Some(3),
            ..EngineConfig::default()
        };
        let engine = Engine::new(config, Arc::new(InMemoryLedger::new())).unwrap();
        Gateway::new(Arc::new(engine))
    }

    async fn run(gateway: Gateway, input: &str) -> Vec<Outbound> {
        let (tx, mut rx) = mpsc::channel(64);
        serve(gateway, input.as_bytes(), tx).await.unwrap();
        let mut out = Vec::new();
        while let Some(m) = rx.recv().await {
            out.push(m);
        }
        out
    }

    #[tokio::test]
    async fn replies_are_routed_to_reply_to() {
        let out = run(
            gateway(),
            "{\"subject\": \"create-account\", \"reply_to\": \"inbox.1\"}\n",
        )
        .await;
        assert_eq!(
            out,
            vec![Outbound {
                topic: "inbox.1".to_string(),
                body: serde_json::json!({"player_id": 1}),
            }]
        );
    }

    #[tokio::test]
    async fn default_reply_topic_and_junk_lines() {
        let input = "not json\n\n{\"subject\": \"status\", \"payload\": {}}\n";
        let out = run(gateway(), input).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].topic, "status.reply");
        assert_eq!(out[0].body["node"], "Arena");
    }

    #[tokio::test]
    async fn play_card_produces_no_reply() {
        let input = format!(
            "{{\"subject\": \"play-card\", \"payload\": {{\"client_id\": 1, \"card_value\": 2, \"match_id\": \"{}\"}}}}\n",
            arena_types::MatchId::new()
        );
        assert!(run(gateway(), &input).await.is_empty());
    }

    #[tokio::test]
    async fn notifications_are_forwarded_on_their_topic() {
        let gw = gateway();
        let events = gw.engine().subscribe();
        let (tx, mut rx) = mpsc::channel(8);
        let forwarder = tokio::spawn(forward_notifications(events, tx));

        gw.engine()
            .notifier()
            .publish(Notification::Heartbeat { server_ping: 77 });
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.topic, "heartbeat");
        assert_eq!(msg.body, serde_json::json!({"server_ping": 77}));
        forwarder.abort();
    }

    #[tokio::test]
    async fn lines_are_newline_delimited() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(Outbound {
            topic: "a".to_string(),
            body: Value::Bool(true),
        })
        .await
        .unwrap();
        drop(tx);
        let mut buf = Vec::new();
        write_lines(rx, &mut buf).await.unwrap();
        assert_eq!(buf, b"{\"topic\":\"a\",\"body\":true}\n");
    }
}
