//! Event sink backed by an HTTP response body.
//!
//! Writes accumulate in a buffer; each flush hands the buffered bytes to the
//! streaming body as one chunk. Once the client goes away the body is
//! dropped and every later write or flush fails with `Disconnected`.

use std::convert::Infallible;

use axum::body::Body;
use parking_lot::Mutex;
use pricecast_hub::{BoxFuture, EventSink, SinkError};
use tokio::sync::mpsc;

/// Chunks buffered between the sink and the response body.
const CHUNK_BUFFER: usize = 16;

pub struct ChannelSink {
    pending: Mutex<Vec<u8>>,
    tx: mpsc::Sender<Vec<u8>>,
}

impl ChannelSink {
    /// Create a sink and the response body it feeds.
    pub fn new() -> (Self, Body) {
        let (tx, rx) = mpsc::channel::<Vec<u8>>(CHUNK_BUFFER);
        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv()
                .await
                .map(|chunk| (Ok::<_, Infallible>(chunk), rx))
        });

        let sink = Self {
            pending: Mutex::new(Vec::new()),
            tx,
        };
        (sink, Body::from_stream(stream))
    }
}

impl EventSink for ChannelSink {
    fn write<'a>(&'a self, frame: &'a [u8]) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            if self.tx.is_closed() {
                return Err(SinkError::Disconnected);
            }
            self.pending.lock().extend_from_slice(frame);
            Ok(())
        })
    }

    fn flush(&self) -> BoxFuture<'_, Result<(), SinkError>> {
        Box::pin(async move {
            let chunk = std::mem::take(&mut *self.pending.lock());
            if chunk.is_empty() {
                return Ok(());
            }
            self.tx
                .send(chunk)
                .await
                .map_err(|_| SinkError::Disconnected)
        })
    }

    fn supports_flush(&self) -> bool {
        true
    }

    fn closed(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.tx.closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_flush_delivers_buffered_frames() {
        let (sink, body) = ChannelSink::new();
        sink.write(b"data: 1\n\n").await.unwrap();
        sink.write(b"data: 2\n\n").await.unwrap();
        sink.flush().await.unwrap();
        drop(sink);

        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"data: 1\n\ndata: 2\n\n");
    }

    #[tokio::test]
    async fn test_dropped_body_resolves_closed() {
        let (sink, body) = ChannelSink::new();
        let waiter = tokio::spawn(async move { sink.closed().await });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(body);
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_body_disconnects() {
        let (sink, body) = ChannelSink::new();
        drop(body);

        assert_eq!(
            sink.write(b"data: x\n\n").await,
            Err(SinkError::Disconnected)
        );
    }
}
