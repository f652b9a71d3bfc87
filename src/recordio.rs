//! RecordIO frame decoding.
//!
//! The wire format is `<decimal length>\n<length bytes of JSON>` repeated
//! indefinitely. [`FrameDecoder`] is a small state machine — `size` plus a
//! growing buffer — that a connection task feeds with arbitrary chunk
//! boundaries and gets back zero or more complete JSON values per call.

use bytes::{Buf, BytesMut};
use serde_json::Value;

use crate::error::{Result, TrackerError};

/// Longest a decimal length prefix is ever allowed to be before the decoder
/// gives up on finding a `\n` and declares the stream malformed. A
/// conservative 12-digit cap is kept rather than widening it to the 20
/// digits a `u64` could in principle need, so a truly malformed stream (no
/// length prefix at all) is caught quickly instead of buffering forever.
pub const MAX_LENGTH_PREFIX_BYTES: usize = 12;

/// Incremental RecordIO decoder.
///
/// Purely functional over its own state: feeding the same bytes in
/// differently-sized chunks always yields the same sequence of frames as
/// feeding them in one chunk — the decoder is a right inverse of whatever
/// encoded the stream in the first place.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    size: Option<u64>,
    buf: BytesMut,
    max_prefix: usize,
}

impl FrameDecoder {
    /// A decoder using the default 12-byte length-prefix cap.
    pub fn new() -> Self {
        Self::with_prefix_cap(MAX_LENGTH_PREFIX_BYTES)
    }

    /// A decoder with a custom length-prefix cap, for deployments that want
    /// a wider bound (up to 20 digits covers any length a `u64` byte count
    /// can express) than the conservative default.
    pub fn with_prefix_cap(max_prefix: usize) -> Self {
        Self { size: None, buf: BytesMut::new(), max_prefix }
    }

    /// Feed one inbound chunk, returning every frame it completes (zero,
    /// one, or many — a single chunk can close out several small frames,
    /// or none if it only grows a frame still in flight).
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Value>> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            match self.size {
                None => {
                    let Some(newline_at) = self.buf.iter().position(|&b| b == b'\n') else {
                        if self.buf.len() > self.max_prefix {
                            return Err(TrackerError::BadFrame(format!(
                                "no newline within {} bytes, not a valid RecordIO length prefix",
                                self.max_prefix
                            )));
                        }
                        break;
                    };
                    let prefix = self.buf.split_to(newline_at);
                    self.buf.advance(1); // drop the newline itself
                    let prefix = std::str::from_utf8(&prefix)
                        .map_err(|_| TrackerError::BadFrame("length prefix is not valid UTF-8".into()))?;
                    let len: u64 = prefix
                        .parse()
                        .map_err(|_| TrackerError::BadFrame(format!("length prefix {prefix:?} is not a decimal integer")))?;
                    self.size = Some(len);
                }
                Some(len) => {
                    if (self.buf.len() as u64) < len {
                        break;
                    }
                    let frame = self.buf.split_to(len as usize);
                    let value: Value = serde_json::from_slice(&frame)?;
                    frames.push(value);
                    self.size = None;
                }
            }
        }

        Ok(frames)
    }
}
