//! Header/body framing shared by every message on the connection.
//!
//! Text frames are `Name: value\r\n` header lines, a blank line, then the body.
//! Binary frames start with a big-endian `u16` giving the length of the header
//! block, followed by the header block and the raw body.

use crate::{Error, Result};

pub const PATH: &str = "Path";
pub const REQUEST_ID: &str = "X-RequestId";
pub const TIMESTAMP: &str = "X-Timestamp";
pub const CONTENT_TYPE: &str = "Content-Type";

const HEADER_SEPARATOR: &str = "\r\n";
const BODY_SEPARATOR: &str = "\r\n\r\n";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Frame {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self::default().with_header(PATH, path)
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Header lookup; names compare case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.header(PATH)
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    fn header_block(&self) -> String {
        let mut block = String::new();
        for (name, value) in &self.headers {
            block.push_str(name);
            block.push_str(": ");
            block.push_str(value);
            block.push_str(HEADER_SEPARATOR);
        }
        block
    }

    /// # Errors
    /// Returns an error if the body is not valid UTF-8.
    #[allow(clippy::result_large_err)]
    pub fn encode_text(&self) -> Result<String> {
        let body = std::str::from_utf8(&self.body)
            .map_err(|e| Error::InvalidClientMessage(format!("text frame body is not UTF-8: {e}")))?;
        let mut out = self.header_block();
        out.push_str(HEADER_SEPARATOR);
        out.push_str(body);
        Ok(out)
    }

    /// # Errors
    /// Returns an error if the header block does not fit the 16-bit length prefix.
    #[allow(clippy::result_large_err)]
    pub fn encode_binary(&self) -> Result<Vec<u8>> {
        let headers = self.header_block();
        let len = u16::try_from(headers.len()).map_err(|_| {
            Error::InvalidClientMessage(format!("header block too large ({} bytes)", headers.len()))
        })?;
        let mut out = Vec::with_capacity(2 + headers.len() + self.body.len());
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(headers.as_bytes());
        out.extend_from_slice(&self.body);
        Ok(out)
    }

    /// # Errors
    /// Returns an error if a header line has no `:` separator.
    #[allow(clippy::result_large_err)]
    pub fn parse_text(text: &str) -> Result<Self> {
        let (head, body) = text.split_once(BODY_SEPARATOR).unwrap_or((text, ""));
        Ok(Self {
            headers: parse_headers(head)?,
            body: body.as_bytes().to_vec(),
        })
    }

    /// # Errors
    /// Returns an error if the length prefix is missing or points past the end of
    /// the frame, or the header block is malformed.
    #[allow(clippy::result_large_err)]
    pub fn parse_binary(data: &[u8]) -> Result<Self> {
        let Some((prefix, rest)) = data.split_first_chunk::<2>() else {
            return Err(Error::MalformedFrame("binary frame shorter than its length prefix".to_string()));
        };
        let len = usize::from(u16::from_be_bytes(*prefix));
        if len > rest.len() {
            return Err(Error::MalformedFrame(format!(
                "header length {len} exceeds frame size {}",
                rest.len()
            )));
        }
        let (head, body) = rest.split_at(len);
        let head = std::str::from_utf8(head)
            .map_err(|e| Error::MalformedFrame(format!("header block is not UTF-8: {e}")))?;
        Ok(Self {
            headers: parse_headers(head)?,
            body: body.to_vec(),
        })
    }
}

#[allow(clippy::result_large_err)]
fn parse_headers(block: &str) -> Result<Vec<(String, String)>> {
    block
        .split(HEADER_SEPARATOR)
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.split_once(':')
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                .ok_or_else(|| Error::MalformedFrame(format!("header line without ':': {line}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_frame_layout() {
        let frame = Frame::new("speech.config")
            .with_header(CONTENT_TYPE, "application/json")
            .with_body("{}");
        assert_eq!(
            frame.encode_text().unwrap(),
            "Path: speech.config\r\nContent-Type: application/json\r\n\r\n{}"
        );
    }

    #[test]
    fn binary_frame_has_length_prefix() {
        let frame = Frame::new("audio").with_body(vec![1u8, 2, 3]);
        let encoded = frame.encode_binary().unwrap();
        let header = "Path: audio\r\n";
        assert_eq!(&encoded[..2], &u16::try_from(header.len()).unwrap().to_be_bytes());
        assert_eq!(&encoded[2..2 + header.len()], header.as_bytes());
        assert_eq!(&encoded[2 + header.len()..], &[1, 2, 3]);
    }

    #[test]
    fn parses_service_text_frame() {
        let raw = "X-RequestId:123ABC\r\nPath:turn.start\r\nContent-Type:application/json; charset=utf-8\r\n\r\n{\"context\":{}}";
        let frame = Frame::parse_text(raw).unwrap();
        assert_eq!(frame.path(), Some("turn.start"));
        assert_eq!(frame.header("x-requestid"), Some("123ABC"));
        assert_eq!(frame.body(), b"{\"context\":{}}");
    }

    #[test]
    fn headers_only_text_frame_has_empty_body() {
        let frame = Frame::parse_text("Path:turn.end\r\n").unwrap();
        assert_eq!(frame.path(), Some("turn.end"));
        assert!(frame.body().is_empty());
    }

    #[test]
    fn rejects_truncated_binary_frame() {
        assert!(matches!(Frame::parse_binary(&[0]), Err(Error::MalformedFrame(_))));
        assert!(matches!(Frame::parse_binary(&[0, 9, b'P']), Err(Error::MalformedFrame(_))));
    }

    #[test]
    fn rejects_header_without_separator() {
        assert!(matches!(Frame::parse_text("garbage\r\n\r\n"), Err(Error::MalformedFrame(_))));
    }
}
