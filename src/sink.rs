use http::{HeaderMap, Method, StatusCode};
use std::io;
use std::sync::{Mutex, PoisonError};

/// The destination of an HTTP response: a header collection, a status line
/// and a body byte stream.
///
/// `write` takes `&self` so a sink can be shared between writer threads;
/// implementations synchronize their own body state.
pub trait ResponseSink {
    /// Returns the response headers.
    fn headers(&self) -> &HeaderMap;

    /// Returns the response headers for modification.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sets the response status code.
    fn set_status(&mut self, status: StatusCode);

    /// Writes body bytes, returning how many were accepted.
    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// Returns the server push capability, if this sink has one.
    fn pusher(&self) -> Option<&dyn Pusher> {
        None
    }

    /// Returns the transport flush capability, if this sink has one.
    fn flusher(&self) -> Option<&dyn Flusher> {
        None
    }
}

/// Server push (HTTP/2 `PUSH_PROMISE`) support.
pub trait Pusher {
    /// Initiates a push of `target`, which is an absolute path or a URL with
    /// the same authority as the parent request.
    fn push(&self, target: &str, options: &PushOptions) -> io::Result<()>;
}

/// Forces buffered body bytes out to the client.
pub trait Flusher {
    /// Flushes any data buffered by the transport.
    fn flush(&self) -> io::Result<()>;
}

/// Options for a server push.
#[derive(Debug, Clone)]
pub struct PushOptions {
    /// Method of the promised request, `GET` unless set.
    pub method: Method,
    /// Additional headers of the promised request.
    pub headers: HeaderMap,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
        }
    }
}

/// A [`ResponseSink`] that keeps the whole response in memory.
#[derive(Debug)]
pub struct MemorySink {
    status: StatusCode,
    headers: HeaderMap,
    body: Mutex<Vec<u8>>,
}

impl MemorySink {
    /// Creates an empty `200 OK` response.
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Mutex::new(Vec::new()),
        }
    }

    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns a copy of the body written so far.
    pub fn body(&self) -> Vec<u8> {
        self.body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Consumes the sink, returning the body.
    pub fn into_body(self) -> Vec<u8> {
        self.body
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Converts the sink into an [`http::Response`].
    pub fn into_response(self) -> http::Response<Vec<u8>> {
        let body = self
            .body
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        let mut response = http::Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseSink for MemorySink {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        // Appending a slice cannot leave the body half-updated
        self.body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header;

    #[test]
    fn test_memory_sink_collects_writes() {
        let sink = MemorySink::new();
        assert_eq!(sink.write(b"hello ").unwrap(), 6);
        assert_eq!(sink.write(b"world").unwrap(), 5);
        assert_eq!(sink.body(), b"hello world");
    }

    #[test]
    fn test_memory_sink_into_response() {
        let mut sink = MemorySink::new();
        sink.set_status(StatusCode::CREATED);
        sink.headers_mut()
            .insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        sink.write(b"body").unwrap();

        let response = sink.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );
        assert_eq!(response.body(), b"body");
    }

    #[test]
    fn test_memory_sink_has_no_capabilities() {
        let sink = MemorySink::new();
        assert!(sink.pusher().is_none());
        assert!(sink.flusher().is_none());
    }

    #[test]
    fn test_push_options_default() {
        let options = PushOptions::default();
        assert_eq!(options.method, Method::GET);
        assert!(options.headers.is_empty());
    }
}
