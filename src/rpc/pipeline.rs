//! Outbound message pipeline: serde value → postcard → framed → TX ring.
//!
//! Encoding never materialises the whole message. [`FrameWriter`] is a
//! postcard `Flavor` that escapes each serialised byte and stages it in a
//! small chunk; every full chunk is committed to the TX ring and the
//! active transport is told how many bytes arrived.
//!
//! ```text
//!  Response ──▶ postcard ──▶ FrameWriter ──▶ TX ring ──▶ transport
//!                            SOF, escape,     notify_tx(added, done)
//!                            EOF
//! ```
//!
//! ## Backpressure
//!
//! The escaped frame length is measured first. A frame that fits the ring
//! is only started once the ring has room for all of it, so a full ring
//! drops the message before any byte is committed. Frames larger than the
//! ring stream while the transport drains; if the transport stalls past
//! the timeout, the open frame is closed with an unescaped SOF, which any
//! receiver treats as a framing error and discards.

use embassy_time::{Duration, Instant};
use heapless::Vec;
use log::warn;
use postcard::ser_flavors::Flavor;
use serde::Serialize;

use super::channels::TxRing;
use super::framing::{EOF, ESC, SOF, is_reserved};
use super::transport::RpcTransport;
use crate::error::CodecError;

/// Escaped bytes staged before each TX ring commit.
const CHUNK_SIZE: usize = 32;

/// Ring bytes kept free while streaming, enough to close an abandoned frame.
const TERMINATOR_RESERVE: usize = 2;

// ── Sizing ───────────────────────────────────────────────────

/// Counts escaped frame bytes without writing them.
struct FrameSizer {
    len: usize,
}

impl Flavor for FrameSizer {
    type Output = usize;

    fn try_push(&mut self, data: u8) -> postcard::Result<()> {
        self.len += if is_reserved(data) { 2 } else { 1 };
        Ok(())
    }

    fn finalize(self) -> postcard::Result<usize> {
        // SOF + EOF
        Ok(self.len + 2)
    }
}

/// Length of `message` once framed: markers and escapes included.
pub fn frame_len<T: Serialize + ?Sized>(message: &T) -> Result<usize, CodecError> {
    postcard::serialize_with_flavor(message, FrameSizer { len: 0 })
        .map_err(|_| CodecError::EncodeFailed)
}

/// Whether the byte after `committed` would be read as an escaped literal.
fn escape_pending(mut pending: bool, committed: &[u8]) -> bool {
    for &b in committed {
        pending = !pending && b == ESC;
    }
    pending
}

// ── Writer ───────────────────────────────────────────────────

pub struct FrameWriter<'a> {
    tx: &'a TxRing,
    transport: &'a mut dyn RpcTransport,
    chunk: Vec<u8, CHUNK_SIZE>,
    deadline: Instant,
    written: usize,
    escape_open: bool,
}

impl<'a> FrameWriter<'a> {
    /// Start a frame. Nothing reaches the ring until the first chunk fills.
    /// All waiting for ring space ends `timeout` from now.
    pub fn new(tx: &'a TxRing, transport: &'a mut dyn RpcTransport, timeout: Duration) -> Self {
        let mut chunk = Vec::new();
        // Capacity is non-zero, the first push cannot fail.
        let _ = chunk.push(SOF);
        Self {
            tx,
            transport,
            chunk,
            deadline: Instant::now() + timeout,
            written: 0,
            escape_open: false,
        }
    }

    /// Kick the transport until `needed` bytes are free or the deadline passes.
    fn wait_for_space(&mut self, needed: usize) -> bool {
        while self.tx.free() < needed {
            if Instant::now() >= self.deadline {
                return false;
            }
            self.transport.notify_tx(self.tx, 0, false);
            std::thread::yield_now();
        }
        true
    }

    fn stage(&mut self, byte: u8) -> postcard::Result<()> {
        if self.chunk.is_full() {
            self.flush(false)?;
        }
        self.chunk
            .push(byte)
            .map_err(|_| postcard::Error::SerializeBufferFull)
    }

    /// Move the staged chunk into the TX ring, waiting while it is full.
    fn flush(&mut self, message_done: bool) -> postcard::Result<()> {
        let mut offset = 0;

        while offset < self.chunk.len() {
            let room = self.tx.free().saturating_sub(TERMINATOR_RESERVE);
            let end = (offset + room).min(self.chunk.len());
            let n = if end > offset {
                self.tx.write(&self.chunk[offset..end])
            } else {
                0
            };

            if n == 0 {
                if !self.wait_for_space(TERMINATOR_RESERVE + 1) {
                    self.abandon();
                    return Err(postcard::Error::SerializeBufferFull);
                }
                continue;
            }

            self.escape_open = escape_pending(self.escape_open, &self.chunk[offset..offset + n]);
            offset += n;
            self.written += n;
            let done = message_done && offset == self.chunk.len();
            self.transport.notify_tx(self.tx, n, done);
        }

        self.chunk.clear();
        Ok(())
    }

    /// Close a partially committed frame so the receiver resynchronises on
    /// the next SOF instead of merging it into the following message.
    fn abandon(&mut self) {
        warn!(
            "RPC: TX ring saturated, abandoning frame after {} bytes",
            self.written
        );
        if self.written == 0 {
            return;
        }
        let terminator: &[u8] = if self.escape_open { &[0x00, SOF] } else { &[SOF] };
        let n = self.tx.write(terminator);
        self.transport.notify_tx(self.tx, n, true);
    }
}

impl Flavor for FrameWriter<'_> {
    /// Total frame bytes committed, markers and escapes included.
    type Output = usize;

    fn try_push(&mut self, data: u8) -> postcard::Result<()> {
        if is_reserved(data) {
            self.stage(ESC)?;
        }
        self.stage(data)
    }

    fn finalize(mut self) -> postcard::Result<usize> {
        self.stage(EOF)?;
        self.flush(true)?;
        Ok(self.written)
    }
}

/// Serialise `message` as one frame into `tx`, notifying `transport`.
///
/// Waits at most `timeout` for ring space. A frame that fits the ring is
/// dropped whole on timeout, with nothing committed.
pub fn write_message<T: Serialize + ?Sized>(
    tx: &TxRing,
    transport: &mut dyn RpcTransport,
    timeout: Duration,
    message: &T,
) -> Result<usize, CodecError> {
    let len = frame_len(message)?;
    let mut writer = FrameWriter::new(tx, transport, timeout);

    let upfront = (len + TERMINATOR_RESERVE).min(tx.capacity());
    if !writer.wait_for_space(upfront) {
        warn!("RPC: TX ring saturated, dropping {}-byte frame", len);
        return Err(CodecError::TxSaturated);
    }

    postcard::serialize_with_flavor(message, writer).map_err(|e| match e {
        postcard::Error::SerializeBufferFull => CodecError::TxSaturated,
        _ => CodecError::EncodeFailed,
    })
}
