//! JSON-RPC framing codec for container traffic.
//!
//! Every message is framed as `Content-Length: N\r\n\r\n{json}` on the TCP
//! stream. [`FrameReader`] decodes frames out of an owned receive buffer, so
//! a read abandoned halfway (a request timeout, a `select!` branch losing)
//! leaves the stream position intact for the next call. [`FrameWriter`]
//! encodes any `Serialize` message into a single write.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum body size (1 MiB). Container messages are a few dozen bytes.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Maximum size of a header block, terminator excluded.
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const READ_CHUNK: usize = 4 * 1024;

/// Reads JSON-RPC frames from an async reader.
pub struct FrameReader<R> {
    reader: R,
    /// Received bytes not yet handed out as a frame.
    buffer: Vec<u8>,
    /// Body length announced by a header block that has already been consumed.
    body_len: Option<usize>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(READ_CHUNK),
            body_len: None,
        }
    }

    /// Read the next frame and decode its body as `T`.
    ///
    /// Returns `Ok(None)` when the peer closes between frames. Cancel safe:
    /// bytes already received stay buffered.
    pub async fn read_frame<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        loop {
            if let Some(body) = self.next_body()? {
                let msg = serde_json::from_slice(&body).context("parsing JSON-RPC frame")?;
                return Ok(Some(msg));
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self
                .reader
                .read(&mut chunk)
                .await
                .context("reading from peer")?;
            if n == 0 {
                if self.buffer.is_empty() && self.body_len.is_none() {
                    return Ok(None);
                }
                bail!("unexpected EOF inside a frame");
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// Split one complete body off the front of the buffer, if one is there.
    fn next_body(&mut self) -> Result<Option<Vec<u8>>> {
        let len = match self.body_len {
            Some(len) => len,
            None => {
                let Some(end) = find_terminator(&self.buffer) else {
                    if self.buffer.len() > MAX_HEADER_BYTES {
                        bail!("header block exceeds {MAX_HEADER_BYTES} bytes");
                    }
                    return Ok(None);
                };
                if end > MAX_HEADER_BYTES {
                    bail!("header block exceeds {MAX_HEADER_BYTES} bytes");
                }
                let len = content_length(&self.buffer[..end])?;
                if len > MAX_FRAME_BYTES {
                    bail!("Content-Length {len} exceeds maximum {MAX_FRAME_BYTES}");
                }
                self.buffer.drain(..end + HEADER_TERMINATOR.len());
                self.body_len = Some(len);
                len
            }
        };

        if self.buffer.len() < len {
            return Ok(None);
        }
        self.body_len = None;
        Ok(Some(self.buffer.drain(..len).collect()))
    }
}

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
}

/// Pull `Content-Length` out of a header block. Other headers are ignored.
fn content_length(block: &[u8]) -> Result<usize> {
    let block = str::from_utf8(block).context("header block is not UTF-8")?;
    let mut length = None;
    for line in block.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            bail!("malformed header line {line:?}");
        };
        if name.trim().eq_ignore_ascii_case("Content-Length") {
            let value = value.trim();
            length = Some(
                value
                    .parse()
                    .with_context(|| format!("invalid Content-Length {value:?}"))?,
            );
        }
    }
    length.context("missing Content-Length header")
}

/// Writes JSON-RPC frames to an async writer.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Encode `msg`, write header and body together, then flush.
    pub async fn write_frame<T: Serialize + ?Sized>(&mut self, msg: &T) -> Result<()> {
        let body = serde_json::to_vec(msg).context("serializing JSON-RPC frame")?;
        let mut frame = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
        frame.extend_from_slice(&body);

        self.writer
            .write_all(&frame)
            .await
            .context("writing frame")?;
        self.writer.flush().await.context("flushing frame")
    }
}
