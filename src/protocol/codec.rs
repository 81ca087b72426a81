//! Wire codec
//!
//! One JSON record per newline-terminated UTF-8 line, in both directions.

use serde::{Serialize, de::DeserializeOwned};
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::CodecError;

const LINE_ENDINGS: &[char] = &['\n', '\r'];

/// Result of reading one line from the peer
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    /// A complete line with its terminator stripped
    Line(String),
    /// The line exceeded the length limit and was discarded
    TooLong,
    /// The line was not valid UTF-8 and was discarded
    Invalid,
    /// Peer closed the connection
    Eof,
}

/// Serializes a record into a frame, newline included
pub fn encode<T: Serialize>(value: &T) -> Result<String, CodecError> {
    let mut encoded = serde_json::to_string(value).map_err(CodecError::Encode)?;
    encoded.push('\n');
    Ok(encoded)
}

/// Parses one frame; a trailing line terminator is ignored
pub fn decode<T: DeserializeOwned>(frame: &str) -> Result<T, CodecError> {
    serde_json::from_str(frame.trim_end_matches(LINE_ENDINGS)).map_err(CodecError::Decode)
}

/// Reads one line of at most `max_len` bytes (terminator excluded).
///
/// Over-long lines are drained up to their newline so the stream stays in sync.
pub async fn read_frame<R>(reader: &mut R, max_len: usize) -> io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let limit = max_len as u64 + 2;
    let n = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Ok(Frame::Eof);
    }

    let terminated = buf.last() == Some(&b'\n');
    if !terminated && n as u64 >= limit {
        discard_line(reader).await?;
        return Ok(Frame::TooLong);
    }

    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    if buf.len() > max_len {
        return Ok(Frame::TooLong);
    }
    match String::from_utf8(buf) {
        Ok(line) => Ok(Frame::Line(line)),
        Err(_) => Ok(Frame::Invalid),
    }
}

async fn discard_line<R>(reader: &mut R) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        if let Some(pos) = available.iter().position(|b| *b == b'\n') {
            reader.consume(pos + 1);
            return Ok(());
        }
        let len = available.len();
        reader.consume(len);
    }
}

/// Encodes `value`, writes it and flushes
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let encoded = encode(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writer.write_all(encoded.as_bytes()).await?;
    writer.flush().await
}
