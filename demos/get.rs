use http_fetch::request;

#[tokio::main]
async fn main() -> Result<(), http_fetch::Error> {
    // Status lines are written at debug level, e.g. with RUST_LOG=debug.
    env_logger::init();

    //Sends a HTTP GET request and waits for the whole body.
    let res = request::get("https://doc.rust-lang.org/std/string/index.html").await?;

    //Prints details about the response.
    println!("Status: {}", res.status_code());
    println!("Headers: {}", res.headers());
    println!("Body: {} bytes", res.body().len());

    Ok(())
}
