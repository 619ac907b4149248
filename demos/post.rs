use http_fetch::{
    body::{Body, JSON},
    request::{self, Method, RequestConfig},
};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), http_fetch::Error> {
    env_logger::init();

    // Fields are encoded as JSON because of the declared content type.
    let body: Body = vec![("name", json!("James Jay")), ("tags", json!(["a", "b"]))]
        .into_iter()
        .collect();
    let config = RequestConfig::new()
        .method(Method::POST)
        .header("Content-Type", JSON);

    let res = request::request("https://httpbin.org/post", config, body)?.await?;

    println!("Status: {}", res.status_code());
    println!("{}", res.body);

    Ok(())
}
