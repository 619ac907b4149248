use http_fetch::{
    body::{Body, JSON},
    error::{AccumulationErr, Error, ParseErr},
    request::{self, Method, RequestConfig},
};
use serde_json::json;
use std::net::SocketAddr;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
    time::{timeout, Duration},
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

async fn read_request(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0; 1024];

    loop {
        if let Some(end) = find(&buf, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse::<usize>().unwrap())
                .unwrap_or(0);

            if buf.len() >= end + 4 + len {
                return buf;
            }
        }

        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return buf;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Serves `response` to a single client and returns the raw request it sent.
async fn serve(response: &'static [u8]) -> (SocketAddr, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;

        stream.write_all(response).await.unwrap();
        stream.shutdown().await.unwrap();

        // wait for the client to hang up
        let mut rest = vec![];
        let _ = stream.read_to_end(&mut rest).await;

        String::from_utf8(request).unwrap()
    });

    (addr, handle)
}

#[tokio::test]
async fn get_plain_text() {
    init();
    let (addr, server) =
        serve(b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nhello").await;

    let res = request::get(format!("http://{}/path?q=1", addr)).await.unwrap();
    let sent = server.await.unwrap();

    assert_eq!(u16::from(res.status_code()), 200);
    assert_eq!(res.body, "hello");
    assert_eq!(res.headers.get("content-type"), Some(&"text/plain".to_string()));

    assert!(sent.starts_with("GET /path?q=1 HTTP/1.1\r\n"));
    assert!(sent.contains(&format!("Host: {}\r\n", addr)));
    assert!(sent.contains("Content-Length: 0\r\n"));
    assert!(sent.contains("Connection: close\r\n"));
}

#[tokio::test]
async fn post_json_fields() {
    init();
    let (addr, server) = serve(b"HTTP/1.1 201 Created\r\nContent-Length: 2\r\n\r\nok").await;

    let body: Body = vec![("a", json!(1))].into_iter().collect();
    let config = RequestConfig::new()
        .method(Method::POST)
        .header("Content-Type", JSON);

    let res = request::request(format!("http://{}/items", addr), config, body)
        .unwrap()
        .await
        .unwrap();
    let sent = server.await.unwrap();

    assert_eq!(u16::from(res.status_code()), 201);
    assert_eq!(res.body, "ok");
    assert!(sent.starts_with("POST /items HTTP/1.1\r\n"));
    assert!(sent.contains("Content-Length: 7\r\n"));
    assert!(sent.ends_with("\r\n\r\n{\"a\":1}"));
}

#[tokio::test]
async fn post_form_fields() {
    init();
    let (addr, server) = serve(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").await;

    let body: Body = vec![("name", json!("James Jay"))].into_iter().collect();
    let config = RequestConfig::new()
        .method(Method::POST)
        .header("content-type", "application/x-www-form-urlencoded; charset=utf-8");

    let res = request::request(format!("http://{}/form", addr), config, body)
        .unwrap()
        .await
        .unwrap();
    let sent = server.await.unwrap();

    assert!(res.body.is_empty());
    assert!(sent.contains("Content-Length: 14\r\n"));
    assert!(sent.ends_with("\r\n\r\nname=James+Jay"));
}

#[tokio::test]
async fn raw_body_keeps_content_length() {
    init();
    let (addr, server) = serve(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").await;

    let config = RequestConfig::new()
        .method(Method::PUT)
        .header("Content-Length", "5");

    request::request(format!("http://{}/", addr), config, Body::from("hello"))
        .unwrap()
        .await
        .unwrap();
    let sent = server.await.unwrap();

    assert!(sent.starts_with("PUT / HTTP/1.1\r\n"));
    assert_eq!(sent.matches("Content-Length").count(), 1);
    assert!(sent.ends_with("hello"));
}

#[tokio::test]
async fn chunked_response() {
    init();
    let (addr, server) = serve(
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
          2\r\nab\r\n2\r\ncd\r\n2\r\nef\r\n0\r\n\r\n",
    )
    .await;

    let res = request::get(format!("http://{}/", addr)).await.unwrap();
    server.await.unwrap();

    assert_eq!(res.body, "abcdef");
}

#[tokio::test]
async fn body_until_close() {
    init();
    let (addr, server) = serve(b"HTTP/1.0 200 OK\r\n\r\nread to the end").await;

    let res = request::get(format!("http://{}/", addr)).await.unwrap();
    server.await.unwrap();

    assert_eq!(res.body, "read to the end");
}

#[tokio::test]
async fn error_status_resolves() {
    init();
    let (addr, server) =
        serve(b"HTTP/1.1 404 Not Found\r\nContent-Length: 7\r\n\r\nmissing").await;

    let res = request::get(format!("http://{}/nope", addr)).await.unwrap();
    server.await.unwrap();

    assert!(res.status_code().is_client_err());
    assert_eq!(res.body, "missing");
}

#[tokio::test]
async fn head_has_no_body() {
    init();
    let (addr, server) = serve(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\n").await;

    let res = request::head(format!("http://{}/", addr)).await.unwrap();
    let sent = server.await.unwrap();

    assert!(sent.starts_with("HEAD / HTTP/1.1\r\n"));
    assert_eq!(res.headers.get("Content-Length"), Some(&"5".to_string()));
    assert!(res.body.is_empty());
}

#[tokio::test]
async fn truncated_body_fails() {
    init();
    let (addr, server) = serve(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nhello").await;

    let err = request::get(format!("http://{}/", addr)).await.unwrap_err();
    server.await.unwrap();

    assert!(matches!(err, Error::Accumulation(AccumulationErr::Stream(_))));
}

#[tokio::test]
async fn invalid_utf8_body_replaced() {
    init();
    let (addr, server) = serve(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\ncaf\xe9").await;

    let res = request::get(format!("http://{}/", addr)).await.unwrap();
    server.await.unwrap();

    assert_eq!(res.body, "caf\u{fffd}");
}

#[tokio::test]
async fn huge_chunk_size_fails() {
    init();
    let (addr, server) = serve(
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
          7fffffffffffffff\r\nab\r\n0\r\n\r\n",
    )
    .await;

    let err = request::get(format!("http://{}/", addr)).await.unwrap_err();
    server.await.unwrap();

    assert!(matches!(err, Error::Accumulation(AccumulationErr::Stream(_))));
}

#[tokio::test]
async fn oversized_head_fails() {
    init();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        read_request(&mut stream).await;

        stream.write_all(b"HTTP/1.1 200 OK\r\nX-Big: ").await.unwrap();
        let filler = vec![b'a'; 64 * 1024];
        // the client stops reading once the limit is hit
        for _ in 0..64 {
            if stream.write_all(&filler).await.is_err() {
                break;
            }
        }
    });

    let err = timeout(Duration::from_secs(5), request::get(format!("http://{}/", addr)))
        .await
        .expect("head size limit not enforced")
        .unwrap_err();
    server.abort();

    assert!(matches!(err, Error::Parse(ParseErr::HeadersErr)));
}

#[tokio::test]
async fn dropped_request_closes_connection() {
    init();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        read_request(&mut stream).await;

        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nab")
            .await
            .unwrap();

        // the rest of the body never comes; wait for the client to hang up
        let mut rest = vec![];
        timeout(Duration::from_secs(2), stream.read_to_end(&mut rest)).await
    });

    let pending = timeout(
        Duration::from_millis(300),
        request::get(format!("http://{}/", addr)),
    )
    .await;
    assert!(pending.is_err());

    let closed = server.await.unwrap();
    assert!(closed.is_ok(), "connection still open after the request was dropped");
}

#[tokio::test]
async fn connection_refused() {
    init();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = request::get(format!("http://{}/", addr)).await.unwrap_err();

    assert!(err.is_transport());
}

#[test]
fn rejected_without_io() {
    assert!(matches!(
        request::request("ftp://127.0.0.1/", RequestConfig::new(), Body::Empty),
        Err(Error::UnsupportedProtocol(_))
    ));
    assert!(matches!(
        request::request("not an address", RequestConfig::new(), Body::Empty),
        Err(Error::InvalidUrl(_))
    ));

    let fields: Body = vec![("a", json!(1))].into_iter().collect();
    let config = RequestConfig::new().header("Content-Type", "text/plain");
    assert!(matches!(
        request::request("http://127.0.0.1/", config, fields),
        Err(Error::Encode(_))
    ));
}

#[cfg(feature = "auth")]
#[tokio::test]
async fn credentials_in_address() {
    init();
    let (addr, server) = serve(b"HTTP/1.1 204 No Content\r\n\r\n").await;

    let res = request::get(format!("http://foo:bar@{}/", addr)).await.unwrap();
    let sent = server.await.unwrap();

    assert_eq!(u16::from(res.status_code()), 204);
    assert!(sent.contains("Authorization: Basic Zm9vOmJhcg==\r\n"));
}
