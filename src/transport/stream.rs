//! Line-delimited transport: one JSON envelope per line.

use crate::error::{McpError, ProtocolError, Result};
use crate::protocol::codec::{Codec, salvage_id};
use crate::protocol::Message;
use crate::transport::{Inbound, Transport};
use async_trait::async_trait;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};
use tokio::sync::Mutex;
use tracing::{debug, error, trace, warn};

/// Stream transport over any reader/writer pair.
pub struct LineTransport<R, W> {
    reader: Mutex<FrameReader<R>>,
    writer: Mutex<W>,
    codec: Codec,
}

struct FrameReader<R> {
    inner: BufReader<R>,
    /// The tail of an oversized line is still pending and must be dropped.
    discarding: bool,
}

enum Frame {
    Line(Vec<u8>),
    Oversized,
}

/// The process's own stdin/stdout.
pub type StdioTransport = LineTransport<Stdin, Stdout>;

impl LineTransport<Stdin, Stdout> {
    pub fn stdio(codec: Codec) -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout(), codec)
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, codec: Codec) -> Self {
        Self {
            reader: Mutex::new(FrameReader {
                inner: BufReader::new(reader),
                discarding: false,
            }),
            writer: Mutex::new(writer),
            codec,
        }
    }

    /// Next non-blank line, or `None` on EOF. At most `max_message_bytes + 1`
    /// bytes of a line are ever buffered.
    async fn read_frame(&self) -> Result<Option<Frame>> {
        let limit = self.codec.max_message_bytes() as u64 + 1;
        let mut guard = self.reader.lock().await;
        let reader = &mut *guard;

        loop {
            if reader.discarding {
                if !skip_line(&mut reader.inner).await.map_err(read_error)? {
                    return Ok(None);
                }
                reader.discarding = false;
            }

            let mut line = Vec::new();
            let n = (&mut reader.inner)
                .take(limit)
                .read_until(b'\n', &mut line)
                .await
                .map_err(read_error)?;

            if n == 0 {
                return Ok(None);
            }
            if n as u64 == limit && line.last() != Some(&b'\n') {
                reader.discarding = true;
                return Ok(Some(Frame::Oversized));
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Some(Frame::Line(line)));
        }
    }

    async fn write_line(&self, content: &str) -> Result<()> {
        let mut writer = self.writer.lock().await;
        trace!("Sending line: {}", content);
        writer.write_all(content.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl<R, W> Transport for LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn receive(&self) -> Result<Option<Inbound>> {
        let bytes = match self.read_frame().await? {
            None => return Ok(None),
            Some(Frame::Line(bytes)) => bytes,
            Some(Frame::Oversized) => {
                warn!(
                    limit = self.codec.max_message_bytes(),
                    "Dropping oversized frame"
                );
                return Ok(Some(Inbound::Malformed {
                    id: None,
                    error: ProtocolError::InvalidRequest(
                        format!(
                            "message exceeds limit of {} bytes",
                            self.codec.max_message_bytes()
                        )
                        .into(),
                    ),
                }));
            }
        };

        let Ok(line) = String::from_utf8(bytes) else {
            return Ok(Some(Inbound::Malformed {
                id: None,
                error: ProtocolError::ParseError,
            }));
        };
        let line = line.trim();
        trace!("Received line: {}", line);

        match self.codec.decode(line) {
            Ok(message) => Ok(Some(Inbound::Message(message))),
            Err(error) => {
                debug!("Failed to decode frame: {}", error);
                Ok(Some(Inbound::Malformed {
                    id: salvage_id(line),
                    error,
                }))
            }
        }
    }

    async fn send(&self, message: Message) -> Result<()> {
        let line = self.codec.encode(&message)?;
        self.write_line(&line).await
    }

    async fn close(&self) -> Result<()> {
        self.writer.lock().await.shutdown().await?;
        Ok(())
    }
}

/// Drop input up to and including the next newline. `false` on EOF.
async fn skip_line<R: AsyncRead + Unpin>(reader: &mut BufReader<R>) -> std::io::Result<bool> {
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            return Ok(false);
        }
        let newline = buf.iter().position(|b| *b == b'\n');
        let len = buf.len();
        match newline {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(true);
            }
            None => reader.consume(len),
        }
    }
}

fn read_error(e: std::io::Error) -> McpError {
    error!("Error reading from stream: {}", e);
    McpError::Io(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{JsonRpcRequest, JsonRpcResponse, RequestId};
    use std::time::Duration;
    use tokio::io::duplex;

    fn receive_only(input: &'static [u8]) -> LineTransport<&'static [u8], tokio::io::Sink> {
        LineTransport::new(input, tokio::io::sink(), Codec::default())
    }

    #[tokio::test]
    async fn test_reads_one_message_per_line() {
        let transport = receive_only(
            b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n\n{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
        );

        match transport.receive().await.unwrap() {
            Some(Inbound::Message(Message::Request(request))) => {
                assert_eq!(request.method, "ping");
                assert_eq!(request.id, Some(RequestId::Number(1)));
            }
            other => panic!("unexpected: {other:?}"),
        }
        match transport.receive().await.unwrap() {
            Some(Inbound::Message(Message::Request(request))) => assert!(request.is_notification()),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(transport.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_line_keeps_stream_alive() {
        let transport = receive_only(
            b"{not json\n{\"jsonrpc\":\"1.0\",\"id\":9,\"method\":\"ping\"}\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n",
        );

        assert!(matches!(
            transport.receive().await.unwrap(),
            Some(Inbound::Malformed {
                id: None,
                error: ProtocolError::ParseError
            })
        ));
        match transport.receive().await.unwrap() {
            Some(Inbound::Malformed { id, error }) => {
                assert_eq!(id, Some(RequestId::Number(9)));
                assert_eq!(error.code(), -32600);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            transport.receive().await.unwrap(),
            Some(Inbound::Message(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_parse_error() {
        let transport = receive_only(b"\xff\xfe\n");
        assert!(matches!(
            transport.receive().await.unwrap(),
            Some(Inbound::Malformed {
                error: ProtocolError::ParseError,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_oversized_line_is_rejected_before_its_end_arrives() {
        let (mut peer, server_io) = duplex(64 * 1024);
        let transport = LineTransport::new(server_io, tokio::io::sink(), Codec::new(1024));

        // No newline yet: the frame must be refused from the first limit + 1 bytes.
        peer.write_all(&[b'x'; 8 * 1024]).await.unwrap();
        let inbound = tokio::time::timeout(Duration::from_secs(1), transport.receive())
            .await
            .expect("oversized frame was buffered whole")
            .unwrap();
        match inbound {
            Some(Inbound::Malformed { id, error }) => {
                assert_eq!(id, None);
                assert_eq!(error.code(), -32600);
            }
            other => panic!("unexpected: {other:?}"),
        }

        peer.write_all(b"xxxx\n{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}\n")
            .await
            .unwrap();
        match transport.receive().await.unwrap() {
            Some(Inbound::Message(Message::Request(request))) => {
                assert_eq!(request.id, Some(RequestId::Number(3)));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_line_at_limit_is_accepted() {
        let frame = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n";
        let transport = LineTransport::new(
            &frame[..],
            tokio::io::sink(),
            Codec::new(frame.len() - 1),
        );
        assert!(matches!(
            transport.receive().await.unwrap(),
            Some(Inbound::Message(_))
        ));
    }

    #[tokio::test]
    async fn test_send_writes_single_line() {
        let (writer, mut reader) = duplex(1024);
        let transport = LineTransport::new(tokio::io::empty(), writer, Codec::default());

        transport
            .send(JsonRpcResponse::success(Some(1.into()), serde_json::json!({"ok": true})).into())
            .await
            .unwrap();
        transport
            .send(JsonRpcRequest::new("ping").with_id(2).into())
            .await
            .unwrap();
        transport.close().await.unwrap();

        let mut output = String::new();
        reader.read_to_string(&mut output).await.unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"result\":{\"ok\":true}"));
        assert!(lines[1].contains("\"method\":\"ping\""));
    }
}
