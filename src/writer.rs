use crate::codec::{DEFAULT_OUTPUT_BUFFER_SIZE, GzipCompressor};
use crate::error::Error;
use crate::headers;
use crate::sink::{Flusher, PushOptions, Pusher, ResponseSink};
use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use std::fmt;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A response writer that gzip-compresses everything written through it.
///
/// Every write is compressed and flushed immediately, so the wrapped sink
/// receives a decodable prefix of the gzip stream after each call. The stream
/// must be finished with [`close`](Self::close), which forwards the final
/// block and the CRC32/length trailer to the sink.
///
/// Headers are not touched until [`set_headers`](Self::set_headers) is
/// called; the caller decides whether the client accepts gzip.
///
/// # Example
///
/// ```ignore
/// use gzip_response_writer::{GzipResponseWriter, MemorySink, ResponseSink};
///
/// let mut writer = GzipResponseWriter::new(MemorySink::new());
/// writer.set_headers();
/// writer.write(b"hello ")?;
/// writer.write(b"world")?;
/// writer.close()?;
/// let response = writer.into_inner().into_response();
/// ```
pub struct GzipResponseWriter<S> {
    sink: S,
    state: Mutex<EncoderState>,
    // Held from extraction until the sink write returns, so compressed
    // segments reach the sink in the order they were produced.
    order: Mutex<()>,
}

/// Lifecycle of the compressed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    /// Accepting writes.
    Open,
    /// The encoder failed; its output no longer matches what the sink holds.
    Failed,
    /// The trailer has been written.
    Closed,
}

/// Encoder state guarded by the writer's lock.
struct EncoderState {
    compressor: GzipCompressor,
    staging: BytesMut,
    stream: StreamState,
    total_in: u64,
    total_out: u64,
}

impl EncoderState {
    fn ensure_open(&self) -> Result<(), Error> {
        match self.stream {
            StreamState::Open => Ok(()),
            StreamState::Failed => Err(Error::Failed),
            StreamState::Closed => Err(Error::Closed),
        }
    }

    /// Resets the staging buffer and fills it with the compressed form of `buf`.
    fn compress(&mut self, buf: &[u8]) -> Result<Bytes, Error> {
        self.ensure_open()?;
        self.staging.clear();

        // An empty flush would ask deflate for progress it cannot make
        if buf.is_empty() {
            return Ok(Bytes::new());
        }

        let result = self
            .compressor
            .compress(buf, &mut self.staging)
            .map_err(Error::Encode)
            .and_then(|()| {
                self.compressor
                    .flush(&mut self.staging)
                    .map_err(Error::Flush)
            });
        if let Err(e) = result {
            self.stream = StreamState::Failed;
            return Err(e);
        }

        let compressed = self.staging.split().freeze();
        self.total_in += buf.len() as u64;
        self.total_out += compressed.len() as u64;
        Ok(compressed)
    }

    /// Ends the stream, returning the final block and trailer.
    fn finish(&mut self) -> Result<Bytes, Error> {
        self.ensure_open()?;
        self.staging.clear();

        if let Err(e) = self.compressor.finish(&mut self.staging) {
            self.stream = StreamState::Failed;
            return Err(Error::Finish(e));
        }
        self.stream = StreamState::Closed;

        let trailer = self.staging.split().freeze();
        self.total_out += trailer.len() as u64;
        tracing::debug!(
            uncompressed = self.total_in,
            compressed = self.total_out,
            "gzip stream finished"
        );
        Ok(trailer)
    }
}

impl Drop for EncoderState {
    fn drop(&mut self) {
        if self.stream == StreamState::Open {
            tracing::warn!(
                uncompressed = self.total_in,
                "gzip response writer dropped before close; stream is truncated"
            );
        }
    }
}

impl<S> GzipResponseWriter<S> {
    /// Wraps `sink`, compressing at the fastest gzip level.
    pub fn new(sink: S) -> Self {
        tracing::trace!("creating gzip response writer");

        Self {
            sink,
            state: Mutex::new(EncoderState {
                compressor: GzipCompressor::new(DEFAULT_OUTPUT_BUFFER_SIZE),
                staging: BytesMut::new(),
                stream: StreamState::Open,
                total_in: 0,
                total_out: 0,
            }),
            order: Mutex::new(()),
        }
    }

    /// Returns a reference to the wrapped sink.
    pub fn get_ref(&self) -> &S {
        &self.sink
    }

    /// Returns a mutable reference to the wrapped sink.
    ///
    /// Writing to the sink directly corrupts the compressed stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consumes the writer, returning the wrapped sink.
    pub fn into_inner(self) -> S {
        let Self { sink, .. } = self;
        sink
    }

    /// Returns whether [`close`](Self::close) has completed.
    pub fn is_closed(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stream
            == StreamState::Closed
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, EncoderState>, Error> {
        self.state.lock().map_err(|_| Error::Poisoned)
    }

    fn lock_order(&self) -> MutexGuard<'_, ()> {
        self.order.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Compresses `buf` and returns the staged output together with the
    /// ordering guard that must be held while forwarding it.
    fn compress_chunk(&self, buf: &[u8]) -> io::Result<(Bytes, MutexGuard<'_, ()>)> {
        let mut state = self.lock_state()?;
        let compressed = state.compress(buf)?;
        Ok((compressed, self.lock_order()))
    }
}

impl<S: ResponseSink> GzipResponseWriter<S> {
    /// Finishes the gzip stream and forwards the trailer to the sink.
    ///
    /// Must be called once, after the last write. Later writes and a second
    /// close fail with [`Error::Closed`]; after an encoder failure both fail
    /// with [`Error::Failed`].
    pub fn close(&self) -> io::Result<()> {
        let (trailer, _order) = {
            let mut state = self.lock_state()?;
            let trailer = state.finish()?;
            (trailer, self.lock_order())
        };

        write_all(&self.sink, &trailer)
    }

    /// Sets `Content-Encoding: gzip` and `Vary: Accept-Encoding`.
    ///
    /// Existing values for either header are replaced. Call before the first
    /// write.
    pub fn set_headers(&mut self) {
        headers::set_compression_headers(self.sink.headers_mut());
    }

    /// Removes `Content-Encoding` and `Vary`, for responses that end up
    /// not being compressed after all.
    pub fn unset_headers(&mut self) {
        headers::unset_compression_headers(self.sink.headers_mut());
    }

    /// Forwards a server push to the sink.
    ///
    /// Fails with [`io::ErrorKind::Unsupported`] if the sink cannot push.
    pub fn push(&self, target: &str, options: &PushOptions) -> io::Result<()> {
        match self.sink.pusher() {
            Some(pusher) => pusher.push(target, options),
            None => Err(Error::NotSupported { capability: "push" }.into()),
        }
    }

    /// Forwards a transport flush to the sink.
    ///
    /// Compressed bytes are already handed to the sink on every write; this
    /// only asks the sink to push its own buffers out. Fails with
    /// [`io::ErrorKind::Unsupported`] if the sink cannot flush.
    pub fn flush(&self) -> io::Result<()> {
        match self.sink.flusher() {
            Some(flusher) => flusher.flush(),
            None => Err(Error::NotSupported {
                capability: "flush",
            }
            .into()),
        }
    }
}

impl<S: ResponseSink> ResponseSink for GzipResponseWriter<S> {
    fn headers(&self) -> &HeaderMap {
        self.sink.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.sink.headers_mut()
    }

    fn set_status(&mut self, status: StatusCode) {
        self.sink.set_status(status);
    }

    /// Compresses `buf` and forwards the result to the sink.
    ///
    /// The returned count is what the sink accepted of the *compressed*
    /// bytes, not the length of `buf`. `Ok(0)` means the input was accepted
    /// but produced no output yet.
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let (compressed, _order) = self.compress_chunk(buf)?;
        if compressed.is_empty() {
            return Ok(0);
        }
        self.sink.write(&compressed)
    }

    fn pusher(&self) -> Option<&dyn Pusher> {
        self.sink.pusher()
    }

    fn flusher(&self) -> Option<&dyn Flusher> {
        self.sink.flusher()
    }
}

/// Byte-stream view of the writer.
///
/// Unlike [`ResponseSink::write`], `write` reports input bytes consumed and
/// forwards the compressed output in full, so `write_all` and `io::copy`
/// work as expected.
impl<S: ResponseSink> io::Write for &GzipResponseWriter<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let (compressed, _order) = self.compress_chunk(buf)?;
        write_all(&self.sink, &compressed)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Nothing is held back by the encoder between writes
        match self.sink.flusher() {
            Some(flusher) => flusher.flush(),
            None => Ok(()),
        }
    }
}

impl<S: ResponseSink> io::Write for GzipResponseWriter<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut &*self)
    }
}

impl<S: fmt::Debug> fmt::Debug for GzipResponseWriter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GzipResponseWriter")
            .field("sink", &self.sink)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn write_all<S: ResponseSink + ?Sized>(sink: &S, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        match sink.write(buf) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "response sink accepted no bytes",
                ));
            }
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
