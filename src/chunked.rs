//! module chunked implements the wire protocol for HTTP's "chunked" Transfer-Encoding.
//!
//! The decoder pulls one chunk at a time from an asynchronous buffered reader,
//! so each chunk can be handed to the body accumulator as soon as it arrives.

use std::io::{self, Error, ErrorKind};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

const MAX_LINE_LENGTH: usize = 4096;
const BUF_SIZE: usize = 16 * 1000;
const CR_LF: [u8; 2] = [b'\r', b'\n'];

pub struct Reader<R> {
    eof: bool,
    // bytes of the current chunk not read yet
    remaining: usize,
    reader: R,
}

impl<R> Reader<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            eof: false,
            remaining: 0,
            reader,
        }
    }

    ///Reads the next piece of chunk data, at most `BUF_SIZE` bytes long.
    ///Returns `Ok(None)` once the last chunk has been consumed, along with
    ///any trailer section.
    pub async fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.eof {
            return Ok(None);
        }

        if self.remaining == 0 {
            let n = self.begin_chunk().await?;

            if n == 0 {
                self.eof = true;
                self.skip_trailer().await?;
                return Ok(None);
            }

            self.remaining = n;
        }

        let mut data = vec![0u8; self.remaining.min(BUF_SIZE)];
        let len = self.reader.read(&mut data).await?;

        if len == 0 {
            return Err(Error::new(ErrorKind::UnexpectedEof, "unexpected end of chunked body"));
        }

        data.truncate(len);
        self.remaining -= len;

        if self.remaining == 0 {
            self.end_chunk().await?;
        }

        Ok(Some(data))
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    async fn begin_chunk(&mut self) -> io::Result<usize> {
        // chunk-size CRLF
        let line = read_chunk_line(&mut self.reader).await?;

        if line.is_empty() {
            return Err(error_malformed_chunked_encoding());
        }

        parse_hex_uint(&line).map_err(|err| Error::new(ErrorKind::InvalidData, err))
    }

    async fn end_chunk(&mut self) -> io::Result<()> {
        // every chunk's data is followed by "\r\n"
        let mut footer = [0u8; 2];
        self.reader.read_exact(&mut footer).await?;

        if footer != CR_LF {
            return Err(error_malformed_chunked_encoding());
        }

        Ok(())
    }

    async fn skip_trailer(&mut self) -> io::Result<()> {
        loop {
            match read_line(&mut self.reader).await {
                Ok(line) if line.is_empty() || line == CR_LF => return Ok(()),
                Ok(_) => continue,
                // trailers are optional, a peer may close right after the last chunk
                Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(()),
                Err(err) => return Err(err),
            }
        }
    }
}

fn error_line_too_long() -> Error {
    Error::new(ErrorKind::InvalidData, "header line too long")
}

fn error_malformed_chunked_encoding() -> Error {
    Error::new(ErrorKind::InvalidData, "malformed chunked encoding")
}

fn is_ascii_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

fn parse_hex_uint(data: &[u8]) -> Result<usize, &'static str> {
    let mut n = 0usize;
    for (i, v) in data.iter().enumerate() {
        if i == 16 {
            return Err("http chunk length too large");
        }

        let vv = match *v {
            b'0'..=b'9' => v - b'0',
            b'a'..=b'f' => v - b'a' + 10,
            b'A'..=b'F' => v - b'A' + 10,
            _ => return Err("invalid byte in chunk length"),
        };

        n <<= 4;
        n |= vv as usize;
    }

    Ok(n)
}

async fn read_line<R>(b: &mut R) -> io::Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = vec![];
    let read = (&mut *b)
        .take(MAX_LINE_LENGTH as u64 + 1)
        .read_until(b'\n', &mut line)
        .await?;

    if read == 0 {
        return Err(Error::new(ErrorKind::UnexpectedEof, "unexpected end of chunked body"));
    }

    if line.len() > MAX_LINE_LENGTH {
        return Err(error_line_too_long());
    }

    Ok(line)
}

async fn read_chunk_line<R>(b: &mut R) -> io::Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = read_line(b).await?;

    remove_chunk_extension(&mut line);
    trim_trailing_whitespace(&mut line);

    Ok(line)
}

fn remove_chunk_extension(v: &mut Vec<u8>) {
    if let Some(idx) = v.iter().position(|v| *v == b';') {
        v.truncate(idx);
    }
}

fn trim_trailing_whitespace(v: &mut Vec<u8>) {
    while let Some(&last) = v.last() {
        if !is_ascii_space(last) {
            return;
        }
        v.pop();
    }
}
