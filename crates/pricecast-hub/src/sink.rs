//! Event sink trait for subscriber transports.
//!
//! Abstracts the per-connection byte stream so subscribers can be driven by
//! the HTTP response body in production and by [`MockEventSink`] in tests.

use std::pin::Pin;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::SinkError;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Incremental byte sink for one streaming client.
pub trait EventSink: Send + Sync {
    /// Buffer `frame` for the next flush.
    fn write<'a>(&'a self, frame: &'a [u8]) -> BoxFuture<'a, Result<(), SinkError>>;

    /// Push buffered bytes to the client.
    fn flush(&self) -> BoxFuture<'_, Result<(), SinkError>>;

    /// Whether the transport can deliver partial responses.
    fn supports_flush(&self) -> bool;

    /// Resolves once the client has gone away, without needing a write.
    fn closed(&self) -> BoxFuture<'_, ()>;
}

/// In-memory sink recording flushed frames.
#[derive(Debug)]
pub struct MockEventSink {
    pending: Mutex<Vec<u8>>,
    flushed: Mutex<Vec<Vec<u8>>>,
    supports_flush: bool,
    disconnected: watch::Sender<bool>,
}

impl Default for MockEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEventSink {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            flushed: Mutex::new(Vec::new()),
            supports_flush: true,
            disconnected: watch::Sender::new(false),
        }
    }

    /// A sink that reports no flush support.
    pub fn without_flush() -> Self {
        Self {
            supports_flush: false,
            ..Self::new()
        }
    }

    /// Make every subsequent write and flush fail and resolve `closed()`.
    pub fn set_disconnected(&self, disconnected: bool) {
        self.disconnected.send_replace(disconnected);
    }

    /// Bytes delivered by each flush, in order.
    pub fn flushes(&self) -> Vec<Vec<u8>> {
        self.flushed.lock().clone()
    }

    /// Everything flushed so far as one string.
    pub fn flushed_text(&self) -> String {
        let bytes: Vec<u8> = self.flushed.lock().concat();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Number of `data:` frames flushed so far.
    pub fn frame_count(&self) -> usize {
        self.flushed_text().matches("data: ").count()
    }

    fn check(&self) -> Result<(), SinkError> {
        if *self.disconnected.borrow() {
            Err(SinkError::Disconnected)
        } else {
            Ok(())
        }
    }
}

impl EventSink for MockEventSink {
    fn write<'a>(&'a self, frame: &'a [u8]) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            self.check()?;
            self.pending.lock().extend_from_slice(frame);
            Ok(())
        })
    }

    fn flush(&self) -> BoxFuture<'_, Result<(), SinkError>> {
        Box::pin(async move {
            self.check()?;
            let bytes = std::mem::take(&mut *self.pending.lock());
            if !bytes.is_empty() {
                self.flushed.lock().push(bytes);
            }
            Ok(())
        })
    }

    fn supports_flush(&self) -> bool {
        self.supports_flush
    }

    fn closed(&self) -> BoxFuture<'_, ()> {
        let mut rx = self.disconnected.subscribe();
        Box::pin(async move {
            let _ = rx.wait_for(|disconnected| *disconnected).await;
        })
    }
}
