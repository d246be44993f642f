//! Bridge from blocking archive writes to an async response body.

use std::io::{self, Write};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio::sync::mpsc;

/// Bytes handed to the body per message.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Messages buffered between the archive writer and the response body.
/// Bounds memory at roughly `CHANNEL_DEPTH * CHUNK_SIZE` per download.
pub const CHANNEL_DEPTH: usize = 8;

/// A `Write` that forwards fixed-size chunks over a bounded channel.
///
/// Must be driven from a blocking thread: a full channel blocks the writer
/// until the client catches up. Once the receiver is gone every write fails
/// with `BrokenPipe`.
pub struct ChannelSink {
    tx: mpsc::Sender<io::Result<Bytes>>,
    buf: BytesMut,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self {
            tx,
            buf: BytesMut::with_capacity(CHUNK_SIZE),
        }
    }

    /// Create a sink together with the receiving half.
    pub fn channel(depth: usize) -> (Self, mpsc::Receiver<io::Result<Bytes>>) {
        let (tx, rx) = mpsc::channel(depth);
        (Self::new(tx), rx)
    }

    fn send(&self, chunk: Bytes) -> io::Result<()> {
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "archive receiver dropped"))
    }
}

impl Write for ChannelSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.tx.is_closed() {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "archive receiver dropped",
            ));
        }

        self.buf.extend_from_slice(data);
        while self.buf.len() >= CHUNK_SIZE {
            let chunk = self.buf.split_to(CHUNK_SIZE).freeze();
            self.send(chunk)?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = self.buf.split().freeze();
        self.send(chunk)
    }
}

/// Turn the receiving half into a body stream.
pub fn chunk_stream(
    rx: mpsc::Receiver<io::Result<Bytes>>,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    futures::stream::unfold(rx, |mut rx| async move {
        let chunk = rx.recv().await?;
        Some((chunk, rx))
    })
}
