//! creating and sending HTTP requests
use crate::{
    accumulator,
    address::{Address, IntoAddress},
    body::Body,
    error::{Error, ParseErr},
    response::{Headers, Response, ResponseResult},
    status_log::StatusLine,
    stream::{self, BodyReader, Stream},
};
use std::{
    convert, fmt,
    future::Future,
    path::{Path, PathBuf},
    str::FromStr,
    time::Instant,
};
use tokio::io::BufReader;

#[cfg(feature = "auth")]
use base64::prelude::*;
#[cfg(feature = "auth")]
use zeroize::{Zeroize, ZeroizeOnDrop};

const CR_LF: &str = "\r\n";
const HTTP_V: &str = "HTTP/1.1";

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub enum Method {
    #[default]
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    OPTIONS,
    PATCH,
    TRACE,
    ///Any other method token, kept in upper case.
    Extension(String),
}

impl convert::AsRef<str> for Method {
    fn as_ref(&self) -> &str {
        use self::Method::*;

        match self {
            GET => "GET",
            HEAD => "HEAD",
            POST => "POST",
            PUT => "PUT",
            DELETE => "DELETE",
            OPTIONS => "OPTIONS",
            PATCH => "PATCH",
            TRACE => "TRACE",
            Extension(m) => m,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl FromStr for Method {
    type Err = ParseErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use self::Method::*;

        let method = s.trim().to_ascii_uppercase();

        Ok(match method.as_str() {
            "GET" => GET,
            "HEAD" => HEAD,
            "POST" => POST,
            "PUT" => PUT,
            "DELETE" => DELETE,
            "OPTIONS" => OPTIONS,
            "PATCH" => PATCH,
            "TRACE" => TRACE,
            "" => return Err(ParseErr::Empty),
            _ if method.bytes().all(is_token_char) => Extension(method),
            _ => return Err(ParseErr::Invalid),
        })
    }
}

fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

///Authentication details sent in the `Authorization` header.
///
///# Example
///```
///use http_fetch::request::Authentication;
///
///let auth = Authentication::basic("foo", "bar");
///assert_eq!(auth.header(), "Basic Zm9vOmJhcg==");
///```
#[cfg(feature = "auth")]
#[derive(Clone, PartialEq, Zeroize, ZeroizeOnDrop)]
pub struct Authentication {
    #[zeroize(skip)]
    scheme: AuthenticationScheme,
    credentials: String,
}

#[cfg(feature = "auth")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AuthenticationScheme {
    Basic,
    Bearer,
}

#[cfg(feature = "auth")]
impl Authentication {
    ///Creates a HTTP Basic authentication from username and password.
    pub fn basic<T, U>(username: &T, password: &U) -> Authentication
    where
        T: ToString + ?Sized,
        U: ToString + ?Sized,
    {
        Authentication {
            scheme: AuthenticationScheme::Basic,
            credentials: format!("{}:{}", username.to_string(), password.to_string()),
        }
    }

    ///Creates a Bearer authentication from a token.
    pub fn bearer<T: ToString + ?Sized>(token: &T) -> Authentication {
        Authentication {
            scheme: AuthenticationScheme::Bearer,
            credentials: token.to_string(),
        }
    }

    ///Returns value of the `Authorization` header.
    pub fn header(&self) -> String {
        match self.scheme {
            AuthenticationScheme::Basic => {
                format!("Basic {}", BASE64_STANDARD.encode(&self.credentials))
            }
            AuthenticationScheme::Bearer => format!("Bearer {}", self.credentials),
        }
    }
}

#[cfg(feature = "auth")]
impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Authentication")
            .field("scheme", &self.scheme)
            .field("credentials", &"<redacted>")
            .finish()
    }
}

///Options of a request: method, headers and options forwarded to the transport.
///
///# Example
///```
///use http_fetch::{body::JSON, request::{Method, RequestConfig}};
///
///let config = RequestConfig::new()
///    .method(Method::POST)
///    .header("Content-Type", JSON);
///
///assert_eq!(config.headers_ref().get("content-type"), Some(&JSON.to_string()));
///```
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    method: Method,
    headers: Headers,
    root_cert_file_pem: Option<PathBuf>,
    #[cfg(feature = "auth")]
    authentication: Option<Authentication>,
}

impl RequestConfig {
    ///Creates new `RequestConfig` with default parameters: `GET` and no headers.
    pub fn new() -> RequestConfig {
        RequestConfig::default()
    }

    ///Sets request method
    pub fn method<T>(mut self, method: T) -> Self
    where
        Method: From<T>,
    {
        self.method = Method::from(method);
        self
    }

    ///Replaces all it's headers with headers passed to the function
    pub fn headers<T>(mut self, headers: T) -> Self
    where
        Headers: From<T>,
    {
        self.headers = Headers::from(headers);
        self
    }

    ///Adds new header to existing headers
    pub fn header<T, U>(mut self, key: &T, val: &U) -> Self
    where
        T: ToString + ?Sized,
        U: ToString + ?Sized,
    {
        self.headers.insert(key, val);
        self
    }

    ///Adds root certificates (X.509) from a PEM file, trusted for HTTPS in
    ///addition to the default ones.
    pub fn root_cert_file_pem(mut self, file_path: &Path) -> Self {
        self.root_cert_file_pem = Some(file_path.to_owned());
        self
    }

    ///Adds authentication to the request, unless an `Authorization` header is set.
    #[cfg(feature = "auth")]
    pub fn authentication(mut self, auth: Authentication) -> Self {
        self.authentication = Some(auth);
        self
    }

    pub fn get_method(&self) -> &Method {
        &self.method
    }

    pub fn headers_ref(&self) -> &Headers {
        &self.headers
    }
}

///Request with its body encoded and transport selected, ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    address: Address,
    method: Method,
    headers: Headers,
    body: Vec<u8>,
    root_cert_file_pem: Option<PathBuf>,
}

impl Request {
    ///Prepares a request: encodes `body` for the declared content type,
    ///fills in `Content-Length` unless set, and resolves `address` and its
    ///transport. Fails before any I/O takes place.
    pub fn new<A: IntoAddress>(address: A, config: RequestConfig, body: Body) -> Result<Request, Error> {
        let RequestConfig {
            method,
            mut headers,
            root_cert_file_pem,
            #[cfg(feature = "auth")]
            authentication,
        } = config;

        let body = body.encode(&headers)?;
        headers.insert_if_absent("Content-Length", &body.len());

        let address = Address::new(address)?;
        headers.insert_if_absent("Host", &address.host_header());
        headers.insert_if_absent("Connection", "close");

        #[cfg(feature = "auth")]
        {
            let auth = authentication.or_else(|| {
                address
                    .credentials()
                    .map(|(user, pass)| Authentication::basic(&user, &pass.unwrap_or_default()))
            });

            if let Some(auth) = auth {
                headers.insert_if_absent("Authorization", &auth.header());
            }
        }

        Ok(Request {
            address,
            method,
            headers,
            body,
            root_cert_file_pem,
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    ///Returns the encoded body transmitted with this request.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    ///Parses request message
    pub fn parse_msg(&self) -> Vec<u8> {
        let request_line = format!(
            "{} {} {}{}",
            self.method.as_ref(),
            self.address.resource(),
            HTTP_V,
            CR_LF
        );

        let headers: String = self
            .headers
            .iter()
            .map(|(k, v)| format!("{}: {}{}", k, v, CR_LF))
            .collect();

        let mut request_msg = (request_line + &headers + CR_LF).into_bytes();
        request_msg.extend_from_slice(&self.body);

        request_msg
    }

    ///Sends HTTP request.
    ///
    ///Connects over the selected transport, writes the request message and
    ///buffers the whole response. A status line is logged once a response
    ///head has been received, whether reading the body succeeds or not.
    ///
    ///Must be polled within a `tokio` runtime: the body is read by a spawned task.
    pub async fn send(self) -> Result<ResponseResult, Error> {
        let started = Instant::now();

        let stream = Stream::connect(&self.address).await?;
        let stream =
            Stream::try_to_https(stream, &self.address, self.root_cert_file_pem.as_deref()).await?;
        let mut stream = BufReader::new(stream);

        stream::write_msg(&mut stream, &self.parse_msg()).await?;
        let response = stream::read_response(&mut stream).await?;
        let status = response.status_code();

        let result = self.receive(stream, response).await;

        StatusLine {
            method: &self.method,
            address: &self.address,
            status,
            elapsed: started.elapsed(),
        }
        .emit();

        result
    }

    async fn receive(
        &self,
        stream: BufReader<Stream>,
        response: Response,
    ) -> Result<ResponseResult, Error> {
        let body = BodyReader::new(stream, &response, self.method == Method::HEAD)?;
        let (receiver, handle) = accumulator::spawn_body_task(body);
        let body = accumulator::collect(receiver, handle).await?;
        let (status, headers) = response.into_parts();

        Ok(ResponseResult {
            status,
            headers,
            body,
        })
    }
}

///Makes an asynchronous request to an HTTP or HTTPS address.
///
///Invalid addresses, unsupported protocols and bodies that cannot be encoded
///are reported right away; otherwise the returned future performs the
///request and resolves with the response headers and body.
///
///# Example
///```no_run
///use http_fetch::{body::Body, request::{self, RequestConfig}};
///
///# async fn run() -> Result<(), http_fetch::error::Error> {
///let res = request::request("http://example.com/path", RequestConfig::new(), Body::Empty)?.await?;
///println!("{}", res.body);
///# Ok(())
///# }
///```
pub fn request<A: IntoAddress>(
    address: A,
    config: RequestConfig,
    body: Body,
) -> Result<impl Future<Output = Result<ResponseResult, Error>>, Error> {
    Ok(Request::new(address, config, body)?.send())
}

///Creates and sends GET request.
pub async fn get<A: IntoAddress>(address: A) -> Result<ResponseResult, Error> {
    request(address, RequestConfig::new(), Body::Empty)?.await
}

///Creates and sends HEAD request.
pub async fn head<A: IntoAddress>(address: A) -> Result<ResponseResult, Error> {
    request(address, RequestConfig::new().method(Method::HEAD), Body::Empty)?.await
}

///Creates and sends POST request with `body` sent as given.
pub async fn post<A, B>(address: A, body: B) -> Result<ResponseResult, Error>
where
    A: IntoAddress,
    B: Into<Body>,
{
    request(address, RequestConfig::new().method(Method::POST), body.into())?.await
}
