//! Fixed-capacity single-producer / single-consumer byte ring.
//!
//! Producers reserve a contiguous region, fill it in place and commit how
//! much they actually wrote. Consumers claim a contiguous readable region,
//! process it in place and release how much they consumed.
//!
//! ```text
//!   read cursor            write cursor
//!        │                      │
//!   ┌────▼──────────────────────▼──────────────┐
//!   │    │ committed, readable  │  free        │
//!   └──────────────────────────────────────────┘
//! ```
//!
//! Cursors are free-running counters; `N` is a power of two so the
//! wrapped index stays consistent across counter overflow. Reserved but
//! uncommitted bytes are never visible to the reader, and claimed but
//! unreleased bytes stay readable. At most one write grant and one read
//! grant exist at a time. No operation ever blocks.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub struct RingBuffer<const N: usize> {
    storage: UnsafeCell<[u8; N]>,
    write: AtomicUsize,
    read: AtomicUsize,
    writing: AtomicBool,
    reading: AtomicBool,
}

// SAFETY: the producer only touches the free region handed out by a
// `WriteGrant`, the consumer only the committed region handed out by a
// `ReadGrant`. The `writing`/`reading` flags make each grant unique, and
// the cursors publish the regions with release/acquire ordering.
unsafe impl<const N: usize> Sync for RingBuffer<N> {}

impl<const N: usize> RingBuffer<N> {
    const CAPACITY_IS_POWER_OF_TWO: () = assert!(N.is_power_of_two(), "ring capacity must be a power of two");

    pub const fn new() -> Self {
        let () = Self::CAPACITY_IS_POWER_OF_TWO;
        Self {
            storage: UnsafeCell::new([0; N]),
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
            writing: AtomicBool::new(false),
            reading: AtomicBool::new(false),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Committed bytes not yet released.
    pub fn len(&self) -> usize {
        let w = self.write.load(Ordering::Acquire);
        let r = self.read.load(Ordering::Acquire);
        w.wrapping_sub(r)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn free(&self) -> usize {
        N - self.len()
    }

    // ── Producer side ────────────────────────────────────────

    /// Reserve up to `max` contiguous bytes for writing.
    ///
    /// The granted region may be shorter than `max` (wrap point or little
    /// free space) and may be empty. Returns `None` while another write
    /// grant is outstanding.
    pub fn reserve_write(&self, max: usize) -> Option<WriteGrant<'_, N>> {
        if self.writing.swap(true, Ordering::Acquire) {
            return None;
        }
        let w = self.write.load(Ordering::Relaxed);
        let r = self.read.load(Ordering::Acquire);
        let free = N - w.wrapping_sub(r);
        let start = w & (N - 1);
        let len = free.min(N - start).min(max);
        Some(WriteGrant {
            ring: self,
            start,
            len,
        })
    }

    /// Copy as much of `data` as fits. Returns the number of bytes written.
    pub fn write(&self, data: &[u8]) -> usize {
        let mut written = 0;
        // At most two grants: up to the wrap point, then from index 0.
        for _ in 0..2 {
            if written == data.len() {
                break;
            }
            let Some(mut grant) = self.reserve_write(data.len() - written) else {
                break;
            };
            let n = grant.len();
            if n == 0 {
                break;
            }
            grant.buf().copy_from_slice(&data[written..written + n]);
            grant.commit(n);
            written += n;
        }
        written
    }

    // ── Consumer side ────────────────────────────────────────

    /// Claim up to `max` contiguous committed bytes for reading.
    ///
    /// Returns `None` while another read grant is outstanding.
    pub fn claim_read(&self, max: usize) -> Option<ReadGrant<'_, N>> {
        if self.reading.swap(true, Ordering::Acquire) {
            return None;
        }
        let r = self.read.load(Ordering::Relaxed);
        let w = self.write.load(Ordering::Acquire);
        let available = w.wrapping_sub(r);
        let start = r & (N - 1);
        let len = available.min(N - start).min(max);
        Some(ReadGrant {
            ring: self,
            start,
            len,
        })
    }

    /// Copy up to `out.len()` bytes out of the ring. Returns the count.
    pub fn read(&self, out: &mut [u8]) -> usize {
        let mut copied = 0;
        for _ in 0..2 {
            if copied == out.len() {
                break;
            }
            let Some(grant) = self.claim_read(out.len() - copied) else {
                break;
            };
            let n = grant.len();
            if n == 0 {
                break;
            }
            out[copied..copied + n].copy_from_slice(grant.buf());
            grant.release(n);
            copied += n;
        }
        copied
    }

    /// Drop everything committed so far. Consumer-side operation.
    ///
    /// Returns the number of bytes discarded, or 0 if a read grant is
    /// outstanding.
    pub fn discard_pending(&self) -> usize {
        if self.reading.swap(true, Ordering::Acquire) {
            return 0;
        }
        let w = self.write.load(Ordering::Acquire);
        let r = self.read.swap(w, Ordering::Release);
        self.reading.store(false, Ordering::Release);
        w.wrapping_sub(r)
    }

    fn region_ptr(&self, start: usize) -> *mut u8 {
        // SAFETY: `start < N` for every grant.
        unsafe { self.storage.get().cast::<u8>().add(start) }
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Grants ───────────────────────────────────────────────────

/// Exclusive access to a free region. Dropping without
/// [`commit`](Self::commit) publishes nothing.
pub struct WriteGrant<'a, const N: usize> {
    ring: &'a RingBuffer<N>,
    start: usize,
    len: usize,
}

impl<const N: usize> WriteGrant<'_, N> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn buf(&mut self) -> &mut [u8] {
        // SAFETY: the region lies in free space, which the consumer never
        // reads, and this grant is the only write grant.
        unsafe { core::slice::from_raw_parts_mut(self.ring.region_ptr(self.start), self.len) }
    }

    /// Publish the first `used` bytes of the region (clamped to its length).
    pub fn commit(self, used: usize) {
        let used = used.min(self.len);
        self.ring.write.fetch_add(used, Ordering::Release);
    }
}

impl<const N: usize> Drop for WriteGrant<'_, N> {
    fn drop(&mut self) {
        self.ring.writing.store(false, Ordering::Release);
    }
}

/// Shared view of a committed region. Dropping without
/// [`release`](Self::release) leaves the bytes in the ring.
pub struct ReadGrant<'a, const N: usize> {
    ring: &'a RingBuffer<N>,
    start: usize,
    len: usize,
}

impl<const N: usize> ReadGrant<'_, N> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn buf(&self) -> &[u8] {
        // SAFETY: the region is committed and the producer never writes
        // committed bytes until they are released.
        unsafe { core::slice::from_raw_parts(self.ring.region_ptr(self.start), self.len) }
    }

    /// Hand the first `consumed` bytes back to the producer.
    pub fn release(self, consumed: usize) {
        let consumed = consumed.min(self.len);
        self.ring.read.fetch_add(consumed, Ordering::Release);
    }
}

impl<const N: usize> Drop for ReadGrant<'_, N> {
    fn drop(&mut self) {
        self.ring.reading.store(false, Ordering::Release);
    }
}

// ── Tests ────────────────────────────────────────────────────
