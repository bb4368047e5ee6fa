//! Gzip compression for HTTP response writers.
//!
//! This crate provides [`GzipResponseWriter`], a decorator around any
//! [`ResponseSink`] that compresses body bytes with gzip (fastest level) on
//! their way to the sink, while forwarding headers, status and optional
//! transport capabilities such as server push.
//!
//! # Example
//!
//! ```ignore
//! use gzip_response_writer::{GzipResponseWriter, ResponseSink};
//!
//! // The caller has already checked that the client accepts gzip.
//! let mut writer = GzipResponseWriter::new(sink);
//! writer.set_headers();
//! writer.write(b"hello ")?;
//! writer.write(b"world")?;
//! writer.close()?;
//! ```
//!
//! # Write Semantics
//!
//! - Each write is compressed and flushed before it returns, so the sink
//!   always holds a decodable prefix of the stream
//! - [`ResponseSink::write`] reports the number of *compressed* bytes the
//!   sink accepted; [`std::io::Write`] reports input bytes consumed
//! - [`GzipResponseWriter::close`] writes the gzip trailer to the sink and
//!   must be called exactly once
//! - Writes may come from several threads; compressed segments are never
//!   interleaved and reach the sink in the order they were compressed
//!
//! # Response Modifications
//!
//! [`GzipResponseWriter::set_headers`] sets:
//! - `Content-Encoding: gzip`
//! - `Vary: Accept-Encoding`
//!
//! [`GzipResponseWriter::unset_headers`] removes both again.

#![deny(missing_docs)]

mod codec;
mod error;
mod headers;
mod sink;
mod writer;

pub use codec::CONTENT_ENCODING;
pub use error::Error;
pub use sink::{Flusher, MemorySink, PushOptions, Pusher, ResponseSink};
pub use writer::GzipResponseWriter;
