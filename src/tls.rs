//! secure connection over TLS
use crate::error::Error as HttpError;
use std::{
    io,
    path::Path,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

#[cfg(feature = "native-tls")]
use std::fs;

#[cfg(all(feature = "rust-tls", not(feature = "native-tls")))]
use std::{fs::File, io::BufReader, sync::Arc};

#[cfg(not(any(feature = "native-tls", feature = "rust-tls")))]
compile_error!("one of the `native-tls` or `rust-tls` features must be enabled");

/// Wrapper around TLS Stream, depends on selected TLS library:
/// - native_tls: `tokio_native_tls::TlsStream<S>`
/// - rustls: `tokio_rustls::client::TlsStream<S>`
#[derive(Debug)]
pub struct Conn<S> {
    #[cfg(feature = "native-tls")]
    stream: tokio_native_tls::TlsStream<S>,

    #[cfg(all(feature = "rust-tls", not(feature = "native-tls")))]
    stream: tokio_rustls::client::TlsStream<S>,
}

impl<S> AsyncRead for Conn<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let poll = Pin::new(&mut self.get_mut().stream).poll_read(cx, buf);

        #[cfg(all(feature = "rust-tls", not(feature = "native-tls")))]
        {
            // Peers that close without close_notify surface as an aborted or
            // truncated stream; the body framing decides whether data is missing.
            if let Poll::Ready(Err(ref e)) = poll {
                if matches!(
                    e.kind(),
                    io::ErrorKind::ConnectionAborted | io::ErrorKind::UnexpectedEof
                ) {
                    return Poll::Ready(Ok(()));
                }
            }
        }

        poll
    }
}

impl<S> AsyncWrite for Conn<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().stream).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_shutdown(cx)
    }
}

/// Client configuration for TLS connection.
pub struct Config {
    #[cfg(feature = "native-tls")]
    extra_root_certs: Vec<native_tls::Certificate>,
    #[cfg(all(feature = "rust-tls", not(feature = "native-tls")))]
    root_certs: Arc<rustls::RootCertStore>,
}

impl Default for Config {
    #[cfg(feature = "native-tls")]
    fn default() -> Self {
        Config {
            extra_root_certs: vec![],
        }
    }

    #[cfg(all(feature = "rust-tls", not(feature = "native-tls")))]
    fn default() -> Self {
        let root_store = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect(),
        };

        Config {
            root_certs: Arc::new(root_store),
        }
    }
}

impl Config {
    /// Adds root certificates (X.509) from a PEM file.
    #[cfg(feature = "native-tls")]
    pub fn add_root_cert_file_pem(&mut self, file_path: &Path) -> Result<&mut Self, HttpError> {
        let pem = fs::read(file_path)?;
        let mut pem_crt = vec![];

        for line in pem.split(|b| *b == b'\n') {
            let is_end_cert = line.windows(8).any(|w| w == b"-----END");
            pem_crt.extend_from_slice(line);
            pem_crt.push(b'\n');

            if is_end_cert {
                let crt = native_tls::Certificate::from_pem(&pem_crt)?;
                self.extra_root_certs.push(crt);
                pem_crt.clear();
            }
        }

        Ok(self)
    }

    /// Establishes a secure connection.
    #[cfg(feature = "native-tls")]
    pub async fn connect<H, S>(&self, hostname: H, stream: S) -> Result<Conn<S>, HttpError>
    where
        H: AsRef<str>,
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut connector_builder = native_tls::TlsConnector::builder();

        for crt in self.extra_root_certs.iter() {
            connector_builder.add_root_certificate(crt.clone());
        }

        let connector = tokio_native_tls::TlsConnector::from(connector_builder.build()?);
        let stream = connector.connect(hostname.as_ref(), stream).await?;

        Ok(Conn { stream })
    }

    /// Adds root certificates (X.509) from a PEM file.
    #[cfg(all(feature = "rust-tls", not(feature = "native-tls")))]
    pub fn add_root_cert_file_pem(&mut self, file_path: &Path) -> Result<&mut Self, HttpError> {
        let f = File::open(file_path)?;
        let mut f = BufReader::new(f);

        let root_certs = Arc::make_mut(&mut self.root_certs);
        let mut file_certs = Vec::new();

        for cert in rustls_pemfile::certs(&mut f) {
            file_certs.push(cert?);
        }

        root_certs.add_parsable_certificates(file_certs);

        Ok(self)
    }

    /// Establishes a secure connection.
    #[cfg(all(feature = "rust-tls", not(feature = "native-tls")))]
    pub async fn connect<H, S>(&self, hostname: H, stream: S) -> Result<Conn<S>, HttpError>
    where
        H: AsRef<str>,
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let hostname = hostname.as_ref().to_string();

        let client_config = rustls::ClientConfig::builder()
            .with_root_certificates(self.root_certs.clone())
            .with_no_client_auth();

        let server_name = rustls_pki_types::ServerName::try_from(hostname)
            .map_err(|e| HttpError::Tls(e.to_string()))?;

        let connector = tokio_rustls::TlsConnector::from(Arc::new(client_config));
        let stream = connector.connect(server_name, stream).await.map_err(|e| {
            match e.get_ref().and_then(|inner| inner.downcast_ref::<rustls::Error>()) {
                Some(tls_err) => HttpError::Tls(tls_err.to_string()),
                None => HttpError::Transport(e),
            }
        })?;

        Ok(Conn { stream })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn missing_root_cert_file() {
        let mut cnf = Config::default();
        let path = PathBuf::from("/nonexistent/http_fetch/roots.pem");

        assert!(matches!(
            cnf.add_root_cert_file_pem(&path),
            Err(HttpError::Transport(_))
        ));
    }

    #[ignore]
    #[tokio::test]
    async fn connect_public_host() {
        let tcp = tokio::net::TcpStream::connect(("doc.rust-lang.org", 443))
            .await
            .unwrap();

        Config::default()
            .connect("doc.rust-lang.org", tcp)
            .await
            .unwrap();
    }
}
