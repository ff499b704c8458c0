//! Ring-buffered byte stream shared between one producer and one consumer.
//!
//! The producer pushes compressed bytes through a [`Producer`] handle; the
//! framing layer consumes them through a [`StreamReader`], which offers
//! positional reads over the retained window. Bytes stay in the ring until
//! the consumer publishes a release watermark ([`StreamReader::seek_release`]),
//! so the synchronizers can revisit bytes freely while scanning.
//!
//! Addressing is absolute: offsets name positions in the logical stream,
//! never slots in the ring. A read below the released watermark comes back
//! short instead of panicking.

use std::collections::VecDeque;
use std::io::Read;
use std::mem;
use std::sync::{Arc, Mutex};

use log::debug;

const PULL_CHUNK: usize = 4096;

/// Pull-side data source, invoked when the ring runs dry.
///
/// Implementations fill `buf` with the next bytes of the stream and return
/// the count written; `0` signals end of stream. Every [`Read`] type works
/// through the blanket impl, with read errors treated as end of stream.
pub trait Source {
    fn pull(&mut self, buf: &mut [u8]) -> usize;
}

impl<R: Read> Source for R {
    fn pull(&mut self, buf: &mut [u8]) -> usize {
        match self.read(buf) {
            Ok(n) => n,
            Err(err) => {
                debug!("source read failed, treating as end of stream: {err}");
                0
            }
        }
    }
}

/// Bounded byte queue addressed by absolute stream offsets.
#[derive(Debug)]
pub struct RingBuffer {
    data: VecDeque<u8>,
    /// Absolute offset of the oldest retained byte.
    base: u64,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(capacity),
            base: 0,
            capacity,
        }
    }

    /// Offset one past the newest pushed byte.
    pub fn head(&self) -> u64 {
        self.base + self.data.len() as u64
    }

    pub fn space(&self) -> usize {
        self.capacity - self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Appends as much of `bytes` as fits, returning the count accepted.
    pub fn push(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.space());
        self.data.extend(&bytes[..n]);
        n
    }

    /// Drops retained bytes strictly below `offset`.
    pub fn release_to(&mut self, offset: u64) {
        if offset > self.base {
            let n = ((offset - self.base) as usize).min(self.data.len());
            self.data.drain(..n);
            self.base += n as u64;
        }
    }

    /// Copies retained bytes at `offset` into `out`; short when the window
    /// does not cover the request.
    pub fn copy_at(&self, offset: u64, out: &mut [u8]) -> usize {
        if offset < self.base || offset >= self.head() {
            return 0;
        }
        let skip = (offset - self.base) as usize;
        let mut copied = 0;
        for (dst, src) in out.iter_mut().zip(self.data.range(skip..)) {
            *dst = *src;
            copied += 1;
        }
        copied
    }
}

/// Builds a ring of `capacity` bytes and returns the connected
/// consumer/producer pair.
pub fn open(capacity: usize, source: Option<Box<dyn Source>>) -> (StreamReader, Producer) {
    let ring = Arc::new(Mutex::new(RingBuffer::new(capacity)));
    let reader = StreamReader {
        ring: Arc::clone(&ring),
        source,
        cursor: 0,
        allow_dequeue: true,
        scratch: vec![0; PULL_CHUNK],
    };
    (reader, Producer { ring })
}

/// Cloneable push handle: the write side of the ring.
///
/// Safe to use from a single producer thread while the consumer runs; the
/// lock is scoped to this ring, so independent sessions never contend.
#[derive(Clone)]
pub struct Producer {
    ring: Arc<Mutex<RingBuffer>>,
}

impl Producer {
    /// Pushes bytes, returning how many were accepted. A short count means
    /// the ring is full; space reappears once the consumer's watermark
    /// advances.
    pub fn push(&self, bytes: &[u8]) -> usize {
        self.ring.lock().unwrap().push(bytes)
    }

    /// Free capacity in bytes.
    pub fn space(&self) -> usize {
        self.ring.lock().unwrap().space()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.lock().unwrap().is_empty()
    }
}

/// Consumer-side stream handle: positional reads, cursor seeks and the
/// release watermark.
pub struct StreamReader {
    ring: Arc<Mutex<RingBuffer>>,
    source: Option<Box<dyn Source>>,
    cursor: u64,
    allow_dequeue: bool,
    scratch: Vec<u8>,
}

impl StreamReader {
    /// Reads at the cursor, advancing it. Pulls from the source when the
    /// ring cannot satisfy the request. A short return means end of stream,
    /// or a full ring whose producer is waiting on the watermark.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        let mut got = self.ring.lock().unwrap().copy_at(self.cursor, out);
        while got < out.len() && self.refill() {
            got += self
                .ring
                .lock()
                .unwrap()
                .copy_at(self.cursor + got as u64, &mut out[got..]);
        }
        self.cursor += got as u64;
        got
    }

    fn refill(&mut self) -> bool {
        let Some(source) = self.source.as_mut() else {
            return false;
        };
        let space = self.ring.lock().unwrap().space();
        if space == 0 {
            return false;
        }
        let want = space.min(self.scratch.len());
        let got = source.pull(&mut self.scratch[..want]);
        if got == 0 {
            return false;
        }
        self.ring.lock().unwrap().push(&self.scratch[..got]);
        true
    }

    /// Moves the read cursor. Never releases memory.
    pub fn seek(&mut self, offset: u64) {
        self.cursor = offset;
    }

    /// Moves the cursor and, when dequeueing is allowed, hands every byte
    /// below `offset` back to the producer.
    pub fn seek_release(&mut self, offset: u64) {
        self.cursor = offset;
        if self.allow_dequeue {
            self.ring.lock().unwrap().release_to(offset);
        }
    }

    /// Toggles producer-side release, returning the prior setting.
    pub fn set_allow_dequeue(&mut self, value: bool) -> bool {
        mem::replace(&mut self.allow_dequeue, value)
    }

    /// Whether `seek_release` currently releases bytes to the producer.
    pub fn allow_dequeue(&self) -> bool {
        self.allow_dequeue
    }

    /// Disables release for the guard's lifetime and restores the prior
    /// setting on drop. Probing reads far ahead of the session cursor and
    /// must not let those reads free bytes the session still needs.
    pub fn suppress_dequeue(&mut self) -> DequeueGuard<'_> {
        let prior = self.set_allow_dequeue(false);
        DequeueGuard {
            stream: self,
            prior,
        }
    }

    /// Positional read: `seek` then `read`. Non-releasing, so scan code can
    /// revisit bytes it has already examined.
    pub fn read_at(&mut self, offset: u64, out: &mut [u8]) -> usize {
        self.seek(offset);
        self.read(out)
    }
}

/// Scoped suppression of producer-side release. Derefs to the underlying
/// [`StreamReader`].
pub struct DequeueGuard<'a> {
    stream: &'a mut StreamReader,
    prior: bool,
}

impl Drop for DequeueGuard<'_> {
    fn drop(&mut self) {
        self.stream.set_allow_dequeue(self.prior);
    }
}

impl std::ops::Deref for DequeueGuard<'_> {
    type Target = StreamReader;

    fn deref(&self) -> &StreamReader {
        self.stream
    }
}

impl std::ops::DerefMut for DequeueGuard<'_> {
    fn deref_mut(&mut self) -> &mut StreamReader {
        self.stream
    }
}

#[test]
fn push_respects_capacity() {
    let mut ring = RingBuffer::new(8);
    assert_eq!(ring.push(&[1, 2, 3, 4, 5, 6]), 6);
    assert_eq!(ring.push(&[7, 8, 9, 10]), 2);
    assert_eq!(ring.space(), 0);

    ring.release_to(4);
    assert_eq!(ring.space(), 4);
    assert_eq!(ring.push(&[9, 10, 11, 12]), 4);
    assert_eq!(ring.head(), 12);
}

#[test]
fn copy_at_survives_wrap_around() {
    let mut ring = RingBuffer::new(8);
    ring.push(&[0, 1, 2, 3, 4, 5, 6, 7]);
    ring.release_to(4);
    ring.push(&[8, 9, 10, 11]);

    let mut out = [0u8; 8];
    assert_eq!(ring.copy_at(4, &mut out), 8);
    assert_eq!(out, [4, 5, 6, 7, 8, 9, 10, 11]);

    // Below the released watermark.
    assert_eq!(ring.copy_at(0, &mut out), 0);
    // Partially past the head.
    assert_eq!(ring.copy_at(10, &mut out), 2);
}

#[test]
fn read_pulls_from_source_with_backpressure() {
    let data: Vec<u8> = (0u8..16).collect();
    let (mut reader, _producer) = open(8, Some(Box::new(std::io::Cursor::new(data))));

    // The ring can only hold 8 bytes until the watermark moves.
    let mut out = [0u8; 16];
    assert_eq!(reader.read(&mut out), 8);
    assert_eq!(&out[..8], &[0, 1, 2, 3, 4, 5, 6, 7]);

    reader.seek_release(8);
    assert_eq!(reader.read_at(8, &mut out), 8);
    assert_eq!(&out[..8], &[8, 9, 10, 11, 12, 13, 14, 15]);

    // Source exhausted.
    assert_eq!(reader.read_at(16, &mut out), 0);
}

#[test]
fn seek_release_honors_dequeue_flag() {
    let (mut reader, producer) = open(8, None);
    producer.push(&[1, 2, 3, 4]);

    {
        let mut probe = reader.suppress_dequeue();
        probe.seek_release(4);
    }
    // Nothing was released under the guard, and the flag is restored.
    assert_eq!(producer.space(), 4);
    assert!(reader.allow_dequeue());

    // Restored: releasing works again.
    reader.seek_release(4);
    assert_eq!(producer.space(), 8);
}
