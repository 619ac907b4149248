//! error system used around the library.
use std::{io, num, str};
use thiserror::Error;

/// Failure to parse the head of a server's response.
#[derive(Debug, PartialEq, Error)]
pub enum ParseErr {
    #[error("ParseErr: Invalid character")]
    Utf8(#[from] str::Utf8Error),
    #[error("ParseErr: Cannot parse number")]
    Int(#[from] num::ParseIntError),
    #[error("ParseErr: Status line contains invalid values")]
    StatusErr,
    #[error("ParseErr: Headers contain invalid values")]
    HeadersErr,
    #[error("ParseErr: Invalid value")]
    Invalid,
    #[error("ParseErr: Nothing to parse")]
    Empty,
}

/// Failure to turn a request body into bytes.
#[derive(Debug, Error)]
pub enum EncodeErr {
    #[error("EncodeErr: cannot serialize body as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("EncodeErr: body is not a mapping of fields")]
    NotFields,
    #[error("EncodeErr: no encoding for fields with content type {0:?}")]
    Unencodable(Option<String>),
}

/// Failure while assembling the buffered response body.
#[derive(Debug, Error)]
pub enum AccumulationErr {
    #[error("AccumulationErr: body stream failed: {0}")]
    Stream(#[source] io::Error),
    #[error("AccumulationErr: body task aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Error: invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Error: unsupported protocol {0:?}")]
    UnsupportedProtocol(String),
    #[error(transparent)]
    Encode(#[from] EncodeErr),
    #[error(transparent)]
    Accumulation(#[from] AccumulationErr),
    #[error("Error: IO error: {0}")]
    Transport(#[from] io::Error),
    #[error("Error: TLS error: {0}")]
    Tls(String),
    #[error(transparent)]
    Parse(#[from] ParseErr),
}

impl Error {
    /// Returns `true` when the connection failed independent of a completed response.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Tls(_) | Error::Parse(_))
    }
}

impl From<str::Utf8Error> for Error {
    fn from(e: str::Utf8Error) -> Self {
        Error::Parse(ParseErr::Utf8(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Encode(EncodeErr::Json(e))
    }
}

#[cfg(feature = "native-tls")]
impl From<native_tls::Error> for Error {
    fn from(e: native_tls::Error) -> Self {
        Error::Tls(e.to_string())
    }
}

#[cfg(all(feature = "rust-tls", not(feature = "native-tls")))]
impl From<rustls::Error> for Error {
    fn from(e: rustls::Error) -> Self {
        Error::Tls(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
