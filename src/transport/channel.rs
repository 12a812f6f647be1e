//! In-memory transport over a pair of bounded channels.

use crate::error::{ProtocolError, Result};
use crate::protocol::Message;
use crate::transport::{Inbound, Transport};
use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

/// Receives from one channel, sends on another.
///
/// Backs each push session on the server side, and doubles as an in-process
/// link between a client and a server.
pub struct ChannelTransport {
    inbound: Mutex<mpsc::Receiver<Message>>,
    outbound: mpsc::Sender<Message>,
}

impl ChannelTransport {
    pub fn new(inbound: mpsc::Receiver<Message>, outbound: mpsc::Sender<Message>) -> Self {
        Self {
            inbound: Mutex::new(inbound),
            outbound,
        }
    }

    /// Two transports wired back to back.
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (left_tx, left_rx) = mpsc::channel(capacity);
        let (right_tx, right_rx) = mpsc::channel(capacity);
        (Self::new(left_rx, right_tx), Self::new(right_rx, left_tx))
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn receive(&self) -> Result<Option<Inbound>> {
        Ok(self.inbound.lock().await.recv().await.map(Inbound::Message))
    }

    async fn send(&self, message: Message) -> Result<()> {
        self.outbound
            .send(message)
            .await
            .map_err(|_| ProtocolError::Transport("peer disconnected".into()))?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.inbound.lock().await.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::McpError;
    use crate::protocol::JsonRpcRequest;

    #[tokio::test]
    async fn test_pair_round_trip() {
        let (left, right) = ChannelTransport::pair(4);

        left.send(JsonRpcRequest::new("ping").with_id(1).into())
            .await
            .unwrap();
        match right.receive().await.unwrap() {
            Some(Inbound::Message(Message::Request(request))) => assert_eq!(request.method, "ping"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dropped_peer() {
        let (left, right) = ChannelTransport::pair(4);
        drop(right);

        assert!(left.receive().await.unwrap().is_none());
        let err = left
            .send(JsonRpcRequest::new("ping").with_id(1).into())
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Protocol(ProtocolError::Transport(_))));
    }
}
