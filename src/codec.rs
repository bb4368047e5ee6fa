use bytes::BytesMut;
use compression_codecs::{EncodeV2, gzip::GzipEncoder};
use compression_core::Level;
use compression_core::util::{PartialBuffer, WriteBuffer};
use std::io;

/// Content-Encoding token for the gzip format.
pub const CONTENT_ENCODING: &str = "gzip";

/// Default size of the scratch buffer the encoder writes into.
pub(crate) const DEFAULT_OUTPUT_BUFFER_SIZE: usize = 8 * 1024; // 8KB output buffer

/// Streaming gzip encoder at the fastest compression level.
///
/// All output is appended to a caller-supplied staging buffer so the caller
/// decides when staged bytes are reset and handed downstream.
pub(crate) struct GzipCompressor {
    encoder: GzipEncoder,
    output_buffer: Vec<u8>,
}

impl GzipCompressor {
    /// Creates a compressor with a scratch buffer of `output_buffer_size` bytes.
    pub(crate) fn new(output_buffer_size: usize) -> Self {
        assert!(output_buffer_size > 0, "output buffer size must be non-zero");
        Self {
            encoder: GzipEncoder::new(Level::Fastest.into()),
            output_buffer: vec![0u8; output_buffer_size],
        }
    }

    /// Feeds `input` to the encoder, appending whatever it emits to `staging`.
    ///
    /// Empty input is a no-op; deflate reports a buffer error when asked to
    /// encode nothing after a flush.
    pub(crate) fn compress(&mut self, input: &[u8], staging: &mut BytesMut) -> io::Result<()> {
        if input.is_empty() {
            return Ok(());
        }

        let mut input_buf = PartialBuffer::new(input);

        // Keep encoding until all input is consumed
        loop {
            let consumed = input_buf.written_len();
            let mut output = WriteBuffer::new_initialized(self.output_buffer.as_mut_slice());

            self.encoder.encode(&mut input_buf, &mut output)?;

            let written = output.written_len();
            staging.extend_from_slice(&self.output_buffer[..written]);

            if input_buf.written_len() >= input.len() {
                return Ok(());
            }

            if written == 0 && input_buf.written_len() == consumed {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "gzip encoder made no progress",
                ));
            }
        }
    }

    /// Drains all pending compressed output without ending the stream.
    pub(crate) fn flush(&mut self, staging: &mut BytesMut) -> io::Result<()> {
        loop {
            let mut output = WriteBuffer::new_initialized(self.output_buffer.as_mut_slice());
            let done = self.encoder.flush(&mut output)?;
            let written = output.written_len();
            staging.extend_from_slice(&self.output_buffer[..written]);
            if done {
                return Ok(());
            }
        }
    }

    /// Ends the stream, appending the final block and the CRC32/ISIZE trailer.
    pub(crate) fn finish(&mut self, staging: &mut BytesMut) -> io::Result<()> {
        loop {
            let mut output = WriteBuffer::new_initialized(self.output_buffer.as_mut_slice());
            let done = self.encoder.finish(&mut output)?;
            let written = output.written_len();
            staging.extend_from_slice(&self.output_buffer[..written]);
            if done {
                return Ok(());
            }
        }
    }
}
