//! Destinations for streamed image output.
//!
//! A [`ResponseSink`] receives the `Content-Type` and the complete encoded
//! body in one call. The stage only calls it after encoding succeeded.

use std::io::{self, Write};

/// Something that can carry an HTTP-style response.
pub trait ResponseSink {
    /// Emit the `Content-Type` header and the body.
    fn send(&mut self, content_type: &str, body: &[u8]) -> io::Result<()>;
}

/// Collects the response in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferedResponse {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// True until something was sent.
    pub fn is_empty(&self) -> bool {
        self.content_type.is_none() && self.body.is_empty()
    }
}

impl ResponseSink for BufferedResponse {
    fn send(&mut self, content_type: &str, body: &[u8]) -> io::Result<()> {
        self.content_type = Some(content_type.to_string());
        self.body.clear();
        self.body.extend_from_slice(body);
        Ok(())
    }
}

/// Writes a CGI-style response (header block, blank line, body) to a stream.
#[derive(Debug)]
pub struct StreamResponse<W: Write> {
    writer: W,
}

impl<W: Write> StreamResponse<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResponseSink for StreamResponse<W> {
    fn send(&mut self, content_type: &str, body: &[u8]) -> io::Result<()> {
        write!(self.writer, "Content-Type: {content_type}\r\n")?;
        write!(self.writer, "Content-Length: {}\r\n\r\n", body.len())?;
        self.writer.write_all(body)?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_response() {
        let mut sink = BufferedResponse::new();
        assert!(sink.is_empty());

        sink.send("image/png", b"abc").unwrap();
        assert_eq!(sink.content_type.as_deref(), Some("image/png"));
        assert_eq!(sink.body, b"abc");
        assert!(!sink.is_empty());
    }

    #[test]
    fn test_buffered_response_replaces_previous_body() {
        let mut sink = BufferedResponse::new();
        sink.send("image/png", b"first").unwrap();
        sink.send("image/gif", b"2").unwrap();
        assert_eq!(sink.content_type.as_deref(), Some("image/gif"));
        assert_eq!(sink.body, b"2");
    }

    #[test]
    fn test_stream_response_format() {
        let mut sink = StreamResponse::new(Vec::new());
        sink.send("image/jpeg", &[0xFF, 0xD8]).unwrap();

        let out = sink.into_inner();
        let header = b"Content-Type: image/jpeg\r\nContent-Length: 2\r\n\r\n";
        assert_eq!(&out[..header.len()], header);
        assert_eq!(&out[header.len()..], &[0xFF, 0xD8]);
    }
}
