use std::io;
use thiserror::Error;

/// Errors raised by [`GzipResponseWriter`](crate::GzipResponseWriter).
///
/// Writer methods return [`io::Error`] so the writer can stand in for any
/// other [`ResponseSink`](crate::ResponseSink). Errors that originate in the
/// writer wrap one of these variants, which can be recovered with
/// [`Error::from_io`]. Errors from the wrapped sink are returned untouched.
#[derive(Debug, Error)]
pub enum Error {
    /// The encoder rejected the submitted bytes.
    #[error("gzip encode failed: {0}")]
    Encode(#[source] io::Error),

    /// The encoder could not drain its pending output.
    #[error("gzip flush failed: {0}")]
    Flush(#[source] io::Error),

    /// The encoder could not write the stream trailer.
    #[error("gzip finish failed: {0}")]
    Finish(#[source] io::Error),

    /// The stream has already been finalized.
    #[error("gzip response writer is closed")]
    Closed,

    /// An earlier encoder failure left the stream undecodable.
    #[error("gzip stream is unusable after an earlier encoder failure")]
    Failed,

    /// A previous writer panicked while holding the encoder.
    #[error("gzip encoder state poisoned by a panicked writer")]
    Poisoned,

    /// The wrapped sink does not implement the requested capability.
    #[error("{capability} is not supported by the underlying response writer")]
    NotSupported {
        /// Name of the missing capability.
        capability: &'static str,
    },
}

impl Error {
    /// Returns the writer error carried by `err`, if it has one.
    pub fn from_io(err: &io::Error) -> Option<&Error> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<Error>())
    }

    fn kind(&self) -> io::ErrorKind {
        match self {
            Error::Encode(e) | Error::Flush(e) | Error::Finish(e) => e.kind(),
            Error::NotSupported { .. } => io::ErrorKind::Unsupported,
            Error::Closed | Error::Failed | Error::Poisoned => io::ErrorKind::Other,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        io::Error::new(err.kind(), err)
    }
}
