//! Integration tests for managed buffer I/O and the copy helpers.

use std::io::{self, BufRead, Read, Write};

use bpool_core::size_class::CLASS_CAPACITIES;
use bpool_core::{copy_async, copy_with, BytePool, Error, MAX_POOLABLE_SIZE};
use proptest::prelude::*;

/// Deterministic text of `len` bytes.
fn text(len: usize) -> String {
    const WORDS: [&str; 6] = ["the ", "quick ", "brown ", "fox ", "jumps ", "over "];
    let mut out = String::with_capacity(len + 8);
    let mut i = 0;
    while out.len() < len {
        out.push_str(WORDS[i % WORDS.len()]);
        i += 1;
    }
    out.truncate(len);
    out
}

/// A reader that hands out at most `chunk` bytes per call.
struct Dribble<'a> {
    data: &'a [u8],
    chunk: usize,
}

impl Read for Dribble<'_> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let n = self.data.len().min(self.chunk).min(out.len());
        out[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

#[test]
fn read_from_grows_past_undersized_hint() {
    let pool = BytePool::new();
    let source = text(4093);
    let mut buf = pool.acquire(123);
    let n = buf.read_from(&mut source.as_bytes()).unwrap();
    assert_eq!(n, 4093);
    assert_eq!(buf.as_str().unwrap(), source);
    buf.release();
}

#[test]
fn read_from_handles_dribbling_reader() {
    let pool = BytePool::new();
    let source = text(10_000);
    let mut reader = Dribble {
        data: source.as_bytes(),
        chunk: 7,
    };
    let mut buf = pool.acquire(0);
    assert_eq!(buf.read_from(&mut reader).unwrap(), 10_000);
    assert_eq!(buf.as_slice(), source.as_bytes());
}

#[test]
fn read_from_trickle_into_large_buffer() {
    let pool = BytePool::new();
    let source = text(256 * 1024);
    let mut reader = Dribble {
        data: source.as_bytes(),
        chunk: 64,
    };
    let mut buf = pool.acquire(4 << 20);
    let start = std::time::Instant::now();
    assert_eq!(buf.read_from(&mut reader).unwrap(), 256 * 1024);
    let elapsed = start.elapsed();
    assert_eq!(buf.as_slice(), source.as_bytes());
    assert_eq!(buf.capacity(), 4 << 20);
    // 4096 reads must not each re-zero the 4 MiB of spare capacity.
    assert!(elapsed.as_secs() < 5, "trickle read took {elapsed:?}");
}

#[test]
fn read_from_retries_interrupted() {
    struct Flaky {
        interrupted: bool,
        inner: &'static [u8],
    }
    impl Read for Flaky {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::ErrorKind::Interrupted.into());
            }
            self.inner.read(out)
        }
    }

    let pool = BytePool::new();
    let mut buf = pool.acquire(8);
    let mut reader = Flaky {
        interrupted: false,
        inner: b"after interrupt",
    };
    assert_eq!(buf.read_from(&mut reader).unwrap(), 15);
    assert_eq!(buf.as_slice(), b"after interrupt");
}

#[test]
fn write_to_then_read_from_round_trip() {
    let pool = BytePool::new();
    let mut src = pool.acquire(64);
    src.push_str(&text(3000));

    let mut wire = Vec::new();
    assert_eq!(src.write_to(&mut wire).unwrap(), 3000);

    let mut dst = pool.acquire(64);
    dst.read_from(&mut wire.as_slice()).unwrap();
    assert_eq!(dst.as_slice(), src.as_slice());
}

#[test]
fn copy_empty_source_is_clean() {
    let pool = BytePool::new();
    let mut out = Vec::new();
    let n = copy_with(&pool, &mut out, &mut io::empty()).unwrap();
    assert_eq!(n, 0);
}

#[test]
fn copy_reports_short_write_with_count() {
    struct HalfSink;
    impl Write for HalfSink {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            Ok(data.len() / 2)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let pool = BytePool::new();
    let err = copy_with(&pool, &mut HalfSink, &mut &b"0123456789"[..]).unwrap_err();
    assert!(err.is_short_write());
    assert!(matches!(err, Error::ShortWrite { written: 5 }));
}

#[test]
fn copy_dribbling_source() {
    let pool = BytePool::new();
    let source = text(20_000);
    let mut reader = Dribble {
        data: source.as_bytes(),
        chunk: 1000,
    };
    let mut out = Vec::new();
    assert_eq!(copy_with(&pool, &mut out, &mut reader).unwrap(), 20_000);
    assert_eq!(out, source.as_bytes());
}

#[tokio::test]
async fn copy_async_through_duplex() {
    let pool = BytePool::new();
    let source = text(50_000).into_bytes();
    let (mut client, mut server) = tokio::io::duplex(64 * 1024);

    let expected = source.clone();
    let reader = tokio::spawn(async move {
        let mut received = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut server, &mut received)
            .await
            .unwrap();
        received
    });

    let n = copy_async(&pool, &mut client, &mut source.as_slice()).await.unwrap();
    drop(client);
    assert_eq!(n as usize, expected.len());
    assert_eq!(reader.await.unwrap(), expected);
}

#[test]
fn buffered_writer_into_buffered_reader() {
    let pool = BytePool::new();
    let mut writer = pool.buf_writer(1000, Vec::new());
    for i in 0..500 {
        writeln!(writer, "line {i}").unwrap();
    }
    let bytes = writer.into_inner().unwrap();

    let reader = pool.buf_reader(300, bytes.as_slice());
    let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
    assert_eq!(lines.len(), 500);
    assert_eq!(lines[499], "line 499");
}

proptest! {
    #[test]
    fn appends_match_reference(chunks in proptest::collection::vec(
        proptest::collection::vec(any::<u8>(), 0..600), 0..40)
    ) {
        let pool = BytePool::new();
        let mut buf = pool.acquire(0);
        let mut reference = Vec::new();
        for chunk in &chunks {
            buf.extend_from_slice(chunk);
            reference.extend_from_slice(chunk);
            prop_assert!(buf.len() <= buf.capacity());
        }
        prop_assert_eq!(buf.as_slice(), reference.as_slice());
    }

    #[test]
    fn fresh_acquire_is_canonical(size in 0usize..=MAX_POOLABLE_SIZE) {
        let pool = BytePool::new();
        let buf = pool.get(size);
        prop_assert!(buf.capacity() >= size);
        prop_assert!(buf.is_empty());
        prop_assert!(CLASS_CAPACITIES.contains(&(buf.capacity() as u32)));
    }

    #[test]
    fn push_char_matches_string(s in "\\PC{0,200}") {
        let pool = BytePool::new();
        let mut buf = pool.acquire(1);
        for ch in s.chars() {
            buf.push_char(ch);
        }
        prop_assert_eq!(buf.as_str().unwrap(), s.as_str());
    }
}
