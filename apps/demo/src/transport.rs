//! Newline-delimited JSON transport.
//!
//! Each inbound line is one [`BridgeMessage`]; each reply and each registry
//! notice goes out as one line. Requests are answered concurrently, so a
//! slow command does not hold up later requests or notices.

use anyhow::Result;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::time::Instant;
use tether_core::{CommandBridge, FailureKind, RegistryEvent, notice_for};
use tether_protocol::{BridgeMessage, InvocationResponse};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::{debug, info, warn};

/// Serves bridge messages from a reader until it reaches end of input.
pub struct LineTransport<'a, R, W> {
    bridge: &'a CommandBridge,
    reader: R,
    outbox: Outbox<W>,
}

impl<'a, R, W> LineTransport<'a, R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(bridge: &'a CommandBridge, reader: R, writer: W) -> Self {
        Self { bridge, reader, outbox: Outbox::new(writer) }
    }

    /// Send the full command list.
    pub async fn announce(&mut self) -> Result<()> {
        let summaries = self.bridge.list_commands().await;
        debug!(commands = summaries.len(), "Announcing commands");
        self.outbox.send(BridgeMessage::listing(&summaries)?).await
    }

    /// Answer requests and forward notices until the reader is exhausted
    /// and every request has been answered.
    ///
    /// # Returns
    /// The number of inbound messages read.
    pub async fn serve(&mut self) -> Result<usize> {
        let bridge = self.bridge;
        let mut notices = bridge.notices();
        let mut notices_open = true;
        let mut input_open = true;
        let mut lines = (&mut self.reader).lines();
        let mut pending = FuturesUnordered::new();
        let mut handled = 0;

        while input_open || !pending.is_empty() {
            tokio::select! {
                line = lines.next_line(), if input_open => {
                    let Some(line) = line? else {
                        input_open = false;
                        continue;
                    };
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    handled += 1;
                    pending.push(reply_to(bridge, line.to_string()));
                }
                Some(reply) = pending.next(), if !pending.is_empty() => {
                    if let Some(reply) = reply? {
                        self.outbox.send(reply).await?;
                    }
                }
                notice = notices.recv(), if notices_open => match notice {
                    Ok(event) => self.outbox.send(notice_for(&event)?).await?,
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "Dropped registry notices"),
                    Err(RecvError::Closed) => notices_open = false,
                },
            }
        }

        info!(messages = handled, "Input closed");
        Ok(handled)
    }

    /// Write notices that are already queued on `notices`.
    pub async fn flush_notices(
        &mut self,
        notices: &mut broadcast::Receiver<RegistryEvent>,
    ) -> Result<()> {
        loop {
            match notices.try_recv() {
                Ok(event) => self.outbox.send(notice_for(&event)?).await?,
                Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "Dropped registry notices"),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return Ok(()),
            }
        }
    }
}

/// Writes messages one per line and stamps their `deltaTime`.
struct Outbox<W> {
    writer: W,
    last_sent: Instant,
}

impl<W: AsyncWrite + Unpin> Outbox<W> {
    fn new(writer: W) -> Self {
        Self { writer, last_sent: Instant::now() }
    }

    async fn send(&mut self, mut message: BridgeMessage) -> Result<()> {
        let now = Instant::now();
        let delta = now.duration_since(self.last_sent).as_millis();
        message.delta_time = u64::try_from(delta).unwrap_or(u64::MAX);
        self.last_sent = now;

        let mut line = serde_json::to_string(&message)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

async fn reply_to(bridge: &CommandBridge, line: String) -> Result<Option<BridgeMessage>> {
    match serde_json::from_str::<BridgeMessage>(&line) {
        Ok(message) => Ok(bridge.handle_message(&message).await?),
        Err(err) => {
            warn!(error = %err, "Unreadable message");
            let response = InvocationResponse::error(
                FailureKind::BadRequest.as_str(),
                format!("Malformed message: {}", err),
            );
            Ok(Some(BridgeMessage::response("", response)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::DemoCommands;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tether_core::{CommandRegistry, LifecycleChange};

    fn lines(output: &[u8]) -> Vec<Value> {
        String::from_utf8_lossy(output)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_serve_answers_each_line() {
        let bridge = CommandBridge::new(Arc::new(CommandRegistry::new()));
        let host = Arc::new(DemoCommands::new("demo", Duration::from_millis(1)));
        bridge.on_host_lifecycle_change(&host, LifecycleChange::Added).await.unwrap();

        let input = concat!(
            r#"{"type":"custom","payload":{"command":"multiply","args":{"x":"6","y":"7"}}}"#,
            "\n\n",
            "not json\n",
            r#"{"type":"customCommand.list"}"#,
            "\n",
            r#"{"type":"log","payload":"ignored"}"#,
            "\n",
        );
        let mut output = Vec::new();
        let mut transport = LineTransport::new(&bridge, input.as_bytes(), &mut output);
        let handled = transport.serve().await.unwrap();
        assert_eq!(handled, 4);

        let replies = lines(&output);
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["type"], "customCommand.response");
        assert_eq!(replies[0]["payload"]["payload"]["result"]["product"], 42);
        assert_eq!(replies[1]["payload"]["payload"]["kind"], "BadRequest");
        assert_eq!(replies[2]["type"], "customCommand.list");
        assert_eq!(replies[2]["payload"].as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_flush_notices_after_removal() {
        let bridge = CommandBridge::new(Arc::new(CommandRegistry::new()));
        let host = Arc::new(DemoCommands::new("demo", Duration::from_millis(1)));
        bridge.on_host_lifecycle_change(&host, LifecycleChange::Added).await.unwrap();

        let mut notices = bridge.notices();
        bridge.on_host_lifecycle_change(&host, LifecycleChange::Removed).await.unwrap();

        let mut output = Vec::new();
        let mut transport = LineTransport::new(&bridge, &b""[..], &mut output);
        transport.flush_notices(&mut notices).await.unwrap();

        let sent = lines(&output);
        assert_eq!(sent.len(), 7);
        assert!(sent.iter().all(|m| m["type"] == "customCommand.unregister"));
        assert!(sent.iter().all(|m| m["payload"]["command"].is_string()));
    }

    #[tokio::test]
    async fn test_slow_command_does_not_hold_up_later_requests() {
        let bridge = CommandBridge::new(Arc::new(CommandRegistry::new()));
        let host = Arc::new(DemoCommands::new("demo", Duration::from_millis(300)));
        bridge.on_host_lifecycle_change(&host, LifecycleChange::Added).await.unwrap();

        let input = concat!(
            r#"{"type":"custom","payload":{"command":"slowOp"}}"#,
            "\n",
            r#"{"type":"custom","payload":{"command":"getInfo"}}"#,
            "\n",
        );
        let mut output = Vec::new();
        let mut transport = LineTransport::new(&bridge, input.as_bytes(), &mut output);
        assert_eq!(transport.serve().await.unwrap(), 2);

        let order: Vec<Value> =
            lines(&output).iter().map(|m| m["payload"]["command"].clone()).collect();
        assert_eq!(order, vec![Value::from("getInfo"), Value::from("slowOp")]);
    }

    #[tokio::test]
    async fn test_delta_time_measures_gap_between_messages() {
        let bridge = CommandBridge::new(Arc::new(CommandRegistry::new()));
        let mut output = Vec::new();
        let mut transport = LineTransport::new(&bridge, &b""[..], &mut output);

        transport.announce().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        transport.announce().await.unwrap();
        drop(transport);

        let sent = lines(&output);
        assert!(sent[1]["deltaTime"].as_u64().unwrap() >= 50);
    }
}
