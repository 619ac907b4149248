//! TCP stream
use crate::{
    address::{Address, Transport},
    chunked,
    error::{Error, ParseErr},
    response::Response,
    tls,
};
use std::{
    io,
    path::Path,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf},
    net::TcpStream,
};

const CR_LF: &[u8] = b"\r\n";
const LF: u8 = b'\n';
const BUF_SIZE: usize = 16 * 1000;
const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Wrapper around TCP stream for HTTP and HTTPS protocols.
/// Allows to perform common operations on underlying stream.
#[derive(Debug)]
pub enum Stream {
    Http(TcpStream),
    Https(Box<tls::Conn<TcpStream>>),
}

impl Stream {
    /// Opens a TCP connection to the host of `address`.
    pub async fn connect(address: &Address) -> Result<Stream, Error> {
        let stream = TcpStream::connect((address.host_name(), address.corr_port())).await?;

        Ok(Stream::Http(stream))
    }

    /// Tries to establish a secure connection over TLS.
    ///
    /// Checks if `address` selected the encrypted transport:
    /// - If yes, attempts to establish a secure connection
    /// - Otherwise, returns the `stream` without any modification
    pub async fn try_to_https(
        stream: Stream,
        address: &Address,
        root_cert_file_pem: Option<&Path>,
    ) -> Result<Stream, Error> {
        match stream {
            Stream::Http(http_stream) => {
                if address.transport() == Transport::Encrypted {
                    let mut cnf = tls::Config::default();

                    let cnf = match root_cert_file_pem {
                        Some(p) => cnf.add_root_cert_file_pem(p)?,
                        None => &mut cnf,
                    };

                    let stream = cnf.connect(address.host_name(), http_stream).await?;
                    Ok(Stream::Https(Box::new(stream)))
                } else {
                    Ok(Stream::Http(http_stream))
                }
            }
            Stream::Https(_) => Ok(stream),
        }
    }
}

impl AsyncRead for Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Http(stream) => Pin::new(stream).poll_read(cx, buf),
            Stream::Https(conn) => Pin::new(conn.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Stream::Http(stream) => Pin::new(stream).poll_write(cx, buf),
            Stream::Https(conn) => Pin::new(conn.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Http(stream) => Pin::new(stream).poll_flush(cx),
            Stream::Https(conn) => Pin::new(conn.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Http(stream) => Pin::new(stream).poll_shutdown(cx),
            Stream::Https(conn) => Pin::new(conn.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Writes message to `stream` and flushes it.
pub async fn write_msg<W>(stream: &mut W, msg: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    stream.write_all(msg).await?;
    stream.flush().await
}

/// Reads the head of HTTP response from `reader`.
///
/// Reads from `reader` (line by line) until a blank line is identified,
/// which indicates that all meta-information has been read.
pub async fn read_head<B>(reader: &mut B) -> Result<Vec<u8>, Error>
where
    B: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(BUF_SIZE);

    loop {
        // one byte over the limit is enough to tell the head is too large
        let limit = (MAX_HEAD_SIZE + 1 - buf.len()) as u64;
        let len = (&mut *reader).take(limit).read_until(LF, &mut buf).await?;

        if len == 0 {
            if buf.is_empty() {
                return Err(Error::Parse(ParseErr::Empty));
            }
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }

        let full_len = buf.len();

        if full_len > MAX_HEAD_SIZE {
            return Err(Error::Parse(ParseErr::HeadersErr));
        }

        let line = &buf[full_len - len..];

        if line == CR_LF || line == [LF] {
            // skip blank lines some servers send ahead of the status line
            if full_len == len {
                buf.clear();
                continue;
            }
            return Ok(buf);
        }
    }
}

/// Reads response heads until a final one arrives, skipping interim
/// informational responses such as `100 Continue`.
pub async fn read_response<B>(reader: &mut B) -> Result<Response, Error>
where
    B: AsyncBufRead + Unpin,
{
    loop {
        let head = read_head(reader).await?;
        let response = Response::from_head(&head)?;
        let code = u16::from(response.status_code());

        if response.status_code().is_info() && code != 101 {
            continue;
        }

        return Ok(response);
    }
}

/// How the body of a response is delimited on the wire.
pub enum BodyReader<R> {
    Empty,
    Sized { reader: R, remaining: usize },
    Chunked(chunked::Reader<R>),
    UntilClose(R),
}

impl<R> BodyReader<R>
where
    R: AsyncBufRead + Unpin,
{
    /// Picks framing for the body following `response`, which answered a
    /// request made with `method_is_head`.
    pub fn new(reader: R, response: &Response, method_is_head: bool) -> Result<BodyReader<R>, Error> {
        if method_is_head || response.status_code().is_bodyless() {
            return Ok(BodyReader::Empty);
        }

        if response.is_chunked() {
            return Ok(BodyReader::Chunked(chunked::Reader::new(reader)));
        }

        match response.content_len()? {
            Some(0) => Ok(BodyReader::Empty),
            Some(remaining) => Ok(BodyReader::Sized { reader, remaining }),
            None => Ok(BodyReader::UntilClose(reader)),
        }
    }

    /// Reads the next piece of the body, or `Ok(None)` at its end.
    pub async fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        match self {
            BodyReader::Empty => Ok(None),
            BodyReader::Chunked(reader) => reader.next_chunk().await,
            BodyReader::Sized { reader, remaining } => {
                if *remaining == 0 {
                    return Ok(None);
                }

                let mut buf = vec![0; BUF_SIZE.min(*remaining)];
                let len = reader.read(&mut buf).await?;

                if len == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("connection closed with {} body bytes missing", remaining),
                    ));
                }

                *remaining -= len;
                buf.truncate(len);
                Ok(Some(buf))
            }
            BodyReader::UntilClose(reader) => {
                let mut buf = vec![0; BUF_SIZE];
                let len = reader.read(&mut buf).await?;

                if len == 0 {
                    return Ok(None);
                }

                buf.truncate(len);
                Ok(Some(buf))
            }
        }
    }
}
