//! A bounded pool of [`ByteBuffer`]s with blocking and non-blocking acquire.

use std::sync::{Condvar, Mutex};

use super::ByteBuffer;

struct Inner {
    free: Vec<ByteBuffer>,
    capacity: usize,
    in_use: usize,
}

/// Multi-producer multi-consumer pool of [`ByteBuffer`]s.
///
/// Internally synchronised with a single mutex plus a condition variable for the blocking
/// acquire path; this mirrors the coarse-grained locking the rest of the crate uses rather than
/// reaching for lock-free structures the protocol-correctness surface doesn't need.
pub struct BufferPool {
    name: &'static str,
    inner: Mutex<Inner>,
    not_empty: Condvar,
}

impl BufferPool {
    /// Creates a pool of `capacity` buffers, all pre-allocated and free.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let free = (0..capacity).map(|_| ByteBuffer::new()).collect();
        BufferPool {
            name,
            inner: Mutex::new(Inner {
                free,
                capacity,
                in_use: 0,
            }),
            not_empty: Condvar::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().capacity
    }

    pub fn available(&self) -> usize {
        self.inner.lock().unwrap().free.len()
    }

    pub fn in_use(&self) -> usize {
        self.inner.lock().unwrap().in_use
    }

    /// Returns a zeroed-length buffer with full default headroom, or `None` if the pool is
    /// exhausted.
    pub fn acquire(&self) -> Option<ByteBuffer> {
        let mut inner = self.inner.lock().unwrap();
        let mut buf = inner.free.pop()?;
        buf.clear();
        inner.in_use += 1;
        Some(buf)
    }

    /// Like [`BufferPool::acquire`], but waits for a release instead of failing when the pool is
    /// exhausted. Used only where backpressure on the caller is the correct semantics.
    pub fn acquire_blocking(&self) -> ByteBuffer {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(mut buf) = inner.free.pop() {
                buf.clear();
                inner.in_use += 1;
                return buf;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    /// Returns `buf` to the pool. The buffer is zeroed lazily on next acquire.
    pub fn release(&self, buf: ByteBuffer) {
        let mut inner = self.inner.lock().unwrap();
        inner.in_use -= 1;
        inner.free.push(buf);
        self.not_empty.notify_one();
    }
}
