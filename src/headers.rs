use crate::codec::CONTENT_ENCODING;
use http::header::{self, HeaderMap, HeaderValue};

/// Marks the response as gzip-encoded and varying by `Accept-Encoding`.
///
/// Both headers are replaced rather than appended to, so repeated calls leave
/// exactly one value for each.
pub(crate) fn set_compression_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::CONTENT_ENCODING,
        HeaderValue::from_static(CONTENT_ENCODING),
    );
    headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));
}

/// Removes the headers added by [`set_compression_headers`].
pub(crate) fn unset_compression_headers(headers: &mut HeaderMap) {
    headers.remove(header::CONTENT_ENCODING);
    headers.remove(header::VARY);
}
