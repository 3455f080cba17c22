//! Byte-stuffed frame codec.
//!
//! Wire format:
//! ```text
//! ┌──────┬───────────────────────────────────┬──────┐
//! │ SOF  │ payload, reserved bytes escaped   │ EOF  │
//! │ 0xAB │ (ESC 0xAC precedes a literal)     │ 0xAD │
//! └──────┴───────────────────────────────────┴──────┘
//! ```
//!
//! Transports deliver arbitrary-length chunks with no message boundaries,
//! so decoding is a resumable per-byte state machine: one state value is
//! all that survives between chunks. No backtracking, O(1) per byte.

use heapless::Vec;
use log::warn;

/// Start-of-frame marker.
pub const SOF: u8 = 0xAB;
/// Escape marker: the next byte is literal payload.
pub const ESC: u8 = 0xAC;
/// End-of-frame marker.
pub const EOF: u8 = 0xAD;

/// Returns `true` for the three reserved marker values.
pub const fn is_reserved(byte: u8) -> bool {
    matches!(byte, SOF | ESC | EOF)
}

// ── Decoder state machine ────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramingState {
    /// Between frames, waiting for SOF.
    #[default]
    Idle,
    /// Inside a frame.
    AwaitingData,
    /// Previous byte was ESC; the next one is literal.
    Escaped,
    /// Framing violation; discard until EOF or SOF.
    Error,
    /// A frame just completed.
    End,
}

impl FramingState {
    /// Pure transition function: `(state, byte) -> (next_state, is_payload)`.
    pub fn next(self, byte: u8) -> (Self, bool) {
        match self {
            Self::Error => match byte {
                EOF => (Self::Idle, false),
                SOF => (Self::AwaitingData, false),
                _ => {
                    warn!("Framing: discarding unexpected data 0x{:02x}", byte);
                    (Self::Error, false)
                }
            },
            Self::Idle | Self::End => match byte {
                SOF => (Self::AwaitingData, false),
                _ => {
                    warn!("Framing: expected SOF, got 0x{:02x}", byte);
                    (self, false)
                }
            },
            Self::AwaitingData => match byte {
                SOF => {
                    warn!("Framing: unescaped SOF mid-data");
                    (Self::Error, false)
                }
                ESC => (Self::Escaped, false),
                EOF => (Self::End, false),
                _ => (Self::AwaitingData, true),
            },
            Self::Escaped => (Self::AwaitingData, true),
        }
    }

    /// Advance in place. Returns `true` if `byte` is payload.
    pub fn process_byte(&mut self, byte: u8) -> bool {
        let (next, is_payload) = self.next(byte);
        *self = next;
        is_payload
    }

    pub fn is_frame_complete(self) -> bool {
        self == Self::End
    }
}

// ── Streaming decoder with staging buffer ────────────────────

/// Framing state plus the staging buffer for the frame in progress.
///
/// Owned exclusively by the RPC worker.
pub struct FrameDecoder<const N: usize> {
    state: FramingState,
    staging: Vec<u8, N>,
}

impl<const N: usize> FrameDecoder<N> {
    pub const fn new() -> Self {
        Self {
            state: FramingState::Idle,
            staging: Vec::new(),
        }
    }

    pub fn state(&self) -> FramingState {
        self.state
    }

    /// Feed one byte. Returns the complete payload when `byte` closes a frame.
    /// The returned slice is valid until the next call to `push`.
    ///
    /// A frame is yielded once, on the EOF that closes it; bytes that
    /// linger in `End` afterwards yield nothing.
    pub fn push(&mut self, byte: u8) -> Option<&[u8]> {
        let prev = self.state;
        let is_payload = self.state.process_byte(byte);

        if self.state == FramingState::AwaitingData
            && matches!(prev, FramingState::Idle | FramingState::End | FramingState::Error)
        {
            self.staging.clear();
        }

        if is_payload && self.staging.push(byte).is_err() {
            warn!("Framing: frame exceeds {} bytes, dropping", N);
            self.staging.clear();
            self.state = FramingState::Error;
            return None;
        }

        if self.state.is_frame_complete() && !prev.is_frame_complete() {
            return Some(&self.staging);
        }
        None
    }

    /// Abandon any frame in progress (e.g. after a transport switch).
    pub fn reset(&mut self) {
        self.state = FramingState::Idle;
        self.staging.clear();
    }
}

impl<const N: usize> Default for FrameDecoder<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Encoder ──────────────────────────────────────────────────

/// Encode `payload` as a complete frame into `out_buf`.
///
/// Returns the total number of bytes written, or `None` if `out_buf`
/// cannot hold the escaped frame.
pub fn encode_frame(payload: &[u8], out_buf: &mut [u8]) -> Option<usize> {
    let mut pos = 0;
    let mut put = |b: u8| -> Option<()> {
        *out_buf.get_mut(pos)? = b;
        pos += 1;
        Some(())
    };

    put(SOF)?;
    for &b in payload {
        if is_reserved(b) {
            put(ESC)?;
        }
        put(b)?;
    }
    put(EOF)?;

    Some(pos)
}

// ── Tests ────────────────────────────────────────────────────
