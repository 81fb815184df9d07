//! Binary data streaming (spec §4.2, component C2)
//!
//! A pull-based stream reader with a single logical cursor, backed by either
//! a file handle or a source byte stream, with an explicit init/destroy,
//! peek/read/chunk/drain contract (spec §9 "Binary streaming: expose an
//! explicit cursor; disallow cloning").

mod chunk;
mod source;

pub use chunk::ChunkStream;
pub use source::BinarySource;

use bytes::{Bytes, BytesMut};
use std::sync::Mutex;

use crate::error::{MapRuntimeError, Result, UnexpectedError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Ready,
    StreamTaken,
    Destroyed,
}

struct Inner {
    source: Option<BinarySource>,
    buffer: BytesMut,
    state: State,
    display_name: Option<String>,
    mimetype: Option<String>,
}

/// A single-consumer, pull-based binary data handle. Not `Clone` by
/// construction (spec §5 "Binary-data cursors are not shareable across
/// concurrent consumers").
pub struct BinaryData {
    inner: Mutex<Inner>,
}

impl BinaryData {
    /// Construct from a file path. Display name defaults to the basename.
    pub fn from_file(path: impl Into<String>) -> Self {
        let path = path.into();
        let display_name = path.rsplit('/').next().map(|s| s.to_string());
        Self {
            inner: Mutex::new(Inner {
                source: Some(BinarySource::file(path)),
                buffer: BytesMut::new(),
                state: State::Uninitialized,
                display_name,
                mimetype: None,
            }),
        }
    }

    /// Construct from an in-memory byte source (already-available stream).
    pub fn from_bytes(bytes: Bytes, display_name: Option<String>, mimetype: Option<String>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                source: Some(BinarySource::memory(bytes)),
                buffer: BytesMut::new(),
                state: State::Uninitialized,
                display_name,
                mimetype,
            }),
        }
    }

    pub fn display_name(&self) -> Option<String> {
        self.inner.lock().unwrap().display_name.clone()
    }

    pub fn mimetype(&self) -> Option<String> {
        self.inner.lock().unwrap().mimetype.clone()
    }

    /// Must be called before any other operation. Opens the backing file
    /// handle, if any; memory sources are ready immediately.
    pub async fn init(&self) -> Result<()> {
        let mut guard = self.inner.lock().unwrap();
        if guard.state != State::Uninitialized {
            return Err(already_init_or_destroyed(guard.state));
        }
        if let Some(source) = guard.source.as_mut() {
            source.open().await?;
        }
        guard.state = State::Ready;
        Ok(())
    }

    pub fn destroy(&self) {
        let mut guard = self.inner.lock().unwrap();
        guard.state = State::Destroyed;
        guard.source = None;
        guard.buffer.clear();
    }

    fn check_usable(guard: &Inner) -> Result<()> {
        match guard.state {
            State::Ready => Ok(()),
            other => Err(already_init_or_destroyed(other)),
        }
    }

    /// Fill the buffer to at least `n` bytes (short on EOF) and return a copy
    /// of the first `n` bytes (or fewer, at EOF) without consuming them.
    pub async fn peek(&self, n: usize) -> Result<Bytes> {
        self.fill_to(n).await?;
        let mut guard = self.inner.lock().unwrap();
        Self::check_usable(&guard)?;
        let take = n.min(guard.buffer.len());
        Ok(guard.buffer[..take].to_vec().into())
    }

    /// Like [`peek`](Self::peek) but consumes the returned bytes from the
    /// cursor.
    pub async fn read(&self, n: usize) -> Result<Bytes> {
        self.fill_to(n).await?;
        let mut guard = self.inner.lock().unwrap();
        Self::check_usable(&guard)?;
        let take = n.min(guard.buffer.len());
        Ok(guard.buffer.split_to(take).freeze())
    }

    /// Fill the internal buffer until it holds at least `n` bytes or the
    /// source is drained. Never raises on EOF — callers observe a short
    /// buffer from `peek`/`read` instead (spec §4.2).
    async fn fill_to(&self, n: usize) -> Result<()> {
        loop {
            let (need_more, state) = {
                let guard = self.inner.lock().unwrap();
                (guard.buffer.len() < n, guard.state)
            };
            if state != State::Ready {
                Self::check_usable(&self.inner.lock().unwrap())?;
                return Ok(());
            }
            if !need_more {
                return Ok(());
            }
            let chunk = {
                let mut guard = self.inner.lock().unwrap();
                match guard.source.as_mut() {
                    Some(source) => source.next_chunk().await?,
                    None => None,
                }
            };
            match chunk {
                Some(bytes) => {
                    let mut guard = self.inner.lock().unwrap();
                    guard.buffer.extend_from_slice(&bytes);
                }
                None => return Ok(()), // source exhausted; buffer stays short
            }
        }
    }

    /// Returns the buffered prefix followed by the remaining source as a
    /// lazy chunk stream. One-shot: calling it a second time fails.
    pub fn to_stream(&self) -> Result<ChunkStream> {
        let mut guard = self.inner.lock().unwrap();
        Self::check_usable(&guard)?;
        let prefix = guard.buffer.split().freeze();
        let source = guard
            .source
            .take()
            .ok_or_else(|| MapRuntimeError::Unexpected(UnexpectedError::Binary(
                "toStream() called more than once".into(),
            )))?;
        guard.state = State::StreamTaken;
        Ok(ChunkStream::new(prefix, source, None))
    }

    /// `chunkBy(n)`: a lazy iterator yielding exactly-`n`-byte buffers except
    /// the last, which may be shorter. Requires `n > 0`.
    pub fn chunk_by(&self, n: usize) -> Result<ChunkStream> {
        if n == 0 {
            return Err(MapRuntimeError::Unexpected(UnexpectedError::Binary(
                "chunkBy(n) requires n > 0".into(),
            )));
        }
        let mut guard = self.inner.lock().unwrap();
        Self::check_usable(&guard)?;
        let prefix = guard.buffer.split().freeze();
        let source = guard
            .source
            .take()
            .ok_or_else(|| MapRuntimeError::Unexpected(UnexpectedError::Binary(
                "chunkBy() called after toStream()".into(),
            )))?;
        guard.state = State::StreamTaken;
        Ok(ChunkStream::new(prefix, source, Some(n)))
    }

    /// Reads the entire remaining content using an internal chunk size.
    pub async fn get_all_data(&self, chunk: usize) -> Result<Bytes> {
        let chunk = if chunk == 0 { 16 * 1024 } else { chunk };
        let mut out = BytesMut::new();
        loop {
            let piece = self.read(chunk).await?;
            if piece.is_empty() {
                break;
            }
            let len = piece.len();
            out.extend_from_slice(&piece);
            if len < chunk {
                break;
            }
        }
        Ok(out.freeze())
    }
}

fn already_init_or_destroyed(state: State) -> MapRuntimeError {
    let reason = match state {
        State::Uninitialized => "operation before init()",
        State::Destroyed => "operation after destroy()",
        State::StreamTaken => "stream already taken via toStream()/chunkBy()",
        State::Ready => unreachable!(),
    };
    MapRuntimeError::Unexpected(UnexpectedError::Binary(reason.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem(data: &[u8]) -> BinaryData {
        BinaryData::from_bytes(Bytes::copy_from_slice(data), None, None)
    }

    #[tokio::test]
    async fn peek_then_read_returns_identical_bytes() {
        let b = mem(b"hello world");
        b.init().await.unwrap();
        let peeked = b.peek(5).await.unwrap();
        let read = b.read(5).await.unwrap();
        assert_eq!(peeked, read);
        assert_eq!(&peeked[..], b"hello");
    }

    #[tokio::test]
    async fn read_consumes_cursor() {
        let b = mem(b"abcdef");
        b.init().await.unwrap();
        assert_eq!(&b.read(3).await.unwrap()[..], b"abc");
        assert_eq!(&b.read(3).await.unwrap()[..], b"def");
        assert_eq!(&b.read(3).await.unwrap()[..], b"");
    }

    #[tokio::test]
    async fn to_stream_includes_peeked_prefix() {
        let b = mem(b"abcdef");
        b.init().await.unwrap();
        let _ = b.peek(2).await.unwrap();
        let mut stream = b.to_stream().unwrap();
        let all = stream.drain_all().await.unwrap();
        assert_eq!(&all[..], b"abcdef");
    }

    #[tokio::test]
    async fn to_stream_is_one_shot() {
        let b = mem(b"abc");
        b.init().await.unwrap();
        let _ = b.to_stream().unwrap();
        assert!(b.to_stream().is_err());
    }

    #[tokio::test]
    async fn operations_before_init_fail() {
        let b = mem(b"abc");
        assert!(b.peek(1).await.is_err());
    }

    #[tokio::test]
    async fn read_past_eof_is_short_not_error() {
        let b = mem(b"ab");
        b.init().await.unwrap();
        let got = b.read(10).await.unwrap();
        assert_eq!(&got[..], b"ab");
    }

    #[tokio::test]
    async fn chunk_by_rejects_zero() {
        let b = mem(b"ab");
        b.init().await.unwrap();
        assert!(b.chunk_by(0).is_err());
    }

    #[tokio::test]
    async fn chunk_by_yields_fixed_size_chunks_last_short() {
        let b = mem(b"abcdefg");
        b.init().await.unwrap();
        let mut stream = b.chunk_by(3).unwrap();
        let mut chunks = Vec::new();
        while let Some(c) = stream.next_chunk().await.unwrap() {
            chunks.push(c);
        }
        assert_eq!(chunks.len(), 3);
        assert_eq!(&chunks[0][..], b"abc");
        assert_eq!(&chunks[1][..], b"def");
        assert_eq!(&chunks[2][..], b"g");
    }
}
