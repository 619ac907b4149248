//!Asynchronous HTTP/HTTPS client that buffers whole responses.
//!
//!A request is prepared synchronously: the address is parsed, the transport
//!is picked from its scheme and the body is encoded for the declared
//!`Content-Type`. Sending it yields a future resolving with the status, the
//!headers and the complete body text. Every received response is logged at
//!`debug` level as a colored status line.
//!
//!## Example
//!Basic GET request
//!```no_run
//!use http_fetch::request;
//!
//!#[tokio::main]
//!async fn main() -> Result<(), http_fetch::error::Error> {
//!    let res = request::get("https://doc.rust-lang.org/").await?;
//!
//!    println!("Status: {}", res.status_code());
//!    println!("{}", res.body);
//!    Ok(())
//!}
//!```
//!
//!POST request with a form body
//!```no_run
//!use http_fetch::{body::{Body, FORM_URLENCODED}, request::{self, Method, RequestConfig}};
//!use serde_json::json;
//!
//!# async fn run() -> Result<(), http_fetch::error::Error> {
//!let body: Body = vec![("name", json!("James Jay"))].into_iter().collect();
//!let config = RequestConfig::new()
//!    .method(Method::POST)
//!    .header("Content-Type", FORM_URLENCODED);
//!
//!let res = request::request("http://httpbin.org/post", config, body)?.await?;
//!assert!(res.status_code().is_success());
//!# Ok(())
//!# }
//!```
pub mod accumulator;
pub mod address;
pub mod body;
pub mod chunked;
pub mod error;
pub mod request;
pub mod response;
pub mod status_log;
pub mod stream;
pub mod tls;

pub use crate::{
    body::Body,
    error::Error,
    request::{request, Method, RequestConfig},
    response::ResponseResult,
};
