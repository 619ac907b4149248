//! parsing server response
use crate::error::ParseErr;
use std::{
    collections::{hash_map, HashMap},
    fmt,
    str,
};
use unicase::Ascii;

///Head of a server's response: status and headers.
#[derive(Debug, PartialEq, Clone)]
pub struct Response {
    status: Status,
    headers: Headers,
}

impl Response {
    ///Creates new `Response` with head - status and headers - parsed from a slice of bytes
    pub fn from_head(head: &[u8]) -> Result<Response, ParseErr> {
        let (headers, status) = Self::parse_head(head)?;

        Ok(Response { status, headers })
    }

    ///Parses head of a `Response` - status and headers - from slice of bytes.
    pub fn parse_head(head: &[u8]) -> Result<(Headers, Status), ParseErr> {
        let mut lines = str::from_utf8(head)?.lines().filter(|line| !line.is_empty());

        let status = match lines.next() {
            Some(line) => Self::parse_status_line(line)?,
            None => return Err(ParseErr::Empty),
        };
        let headers = Self::parse_headers(lines)?;

        Ok((headers, status))
    }

    ///Parses status line
    pub fn parse_status_line(status_line: &str) -> Result<Status, ParseErr> {
        let mut parts = status_line.splitn(3, ' ');

        let version = parts.next().unwrap_or("");
        let code = parts.next().ok_or(ParseErr::StatusErr)?;
        let reason = parts.next().unwrap_or("");

        if !version.starts_with("HTTP/") || code.len() != 3 {
            return Err(ParseErr::StatusErr);
        }

        Ok(Status::from((version, code.parse::<u16>()?, reason)))
    }

    ///Parses headers
    pub fn parse_headers<'a, I>(lines: I) -> Result<Headers, ParseErr>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut headers = Headers::new();

        for line in lines {
            let (key, value) = line.split_once(':').ok_or(ParseErr::HeadersErr)?;
            let key = key.trim();

            if key.is_empty() {
                return Err(ParseErr::HeadersErr);
            }

            headers.append(key, value.trim());
        }

        Ok(headers)
    }

    ///Returns status code of this `Response`.
    pub fn status_code(&self) -> StatusCode {
        self.status.code
    }

    ///Returns HTTP version of this `Response`.
    pub fn version(&self) -> &str {
        &self.status.version
    }

    ///Returns reason of this `Response`.
    pub fn reason(&self) -> &str {
        &self.status.reason
    }

    ///Returns headers of this `Response`.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    ///Returns length of the content of this `Response` according to information
    ///included in headers, or `None` if there is no such information.
    pub fn content_len(&self) -> Result<Option<usize>, ParseErr> {
        match self.headers.get("Content-Length") {
            Some(p) => Ok(Some(p.trim().parse()?)),
            None => Ok(None),
        }
    }

    ///Checks if the body of this `Response` uses chunked transfer encoding.
    pub fn is_chunked(&self) -> bool {
        self.headers
            .get("Transfer-Encoding")
            .and_then(|te| te.rsplit(',').next())
            .map_or(false, |last| last.trim().eq_ignore_ascii_case("chunked"))
    }

    pub(crate) fn into_parts(self) -> (StatusCode, Headers) {
        (self.status.code, self.headers)
    }
}

///Result of a completed request: status, headers and the assembled body.
#[derive(Debug, PartialEq, Clone)]
pub struct ResponseResult {
    pub status: StatusCode,
    pub headers: Headers,
    pub body: String,
}

impl ResponseResult {
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }
}

///Wrapper around HashMap<Ascii<String>, String> with additional functionality for parsing HTTP headers
///
///# Example
///```
///use http_fetch::response::Headers;
///
///let mut headers = Headers::new();
///headers.insert("Connection", "Close");
///
///assert_eq!(headers.get("connection"), Some(&"Close".to_string()))
///```
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Headers(HashMap<Ascii<String>, String>);

impl Headers {
    ///Creates an empty `Headers`.
    pub fn new() -> Headers {
        Headers(HashMap::new())
    }

    ///Creates an empty `Headers` with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Headers {
        Headers(HashMap::with_capacity(capacity))
    }

    ///An iterator visiting all key-value pairs in arbitrary order.
    pub fn iter(&self) -> hash_map::Iter<'_, Ascii<String>, String> {
        self.0.iter()
    }

    ///Returns a reference to the value corresponding to the key. Keys are compared
    ///case-insensitively.
    pub fn get<T: ToString + ?Sized>(&self, k: &T) -> Option<&String> {
        self.0.get(&Ascii::new(k.to_string()))
    }

    ///Inserts a key-value pair, replacing and returning the previous value of the key.
    pub fn insert<T, U>(&mut self, key: &T, val: &U) -> Option<String>
    where
        T: ToString + ?Sized,
        U: ToString + ?Sized,
    {
        self.0.insert(Ascii::new(key.to_string()), val.to_string())
    }

    ///Inserts a key-value pair only if the key isn't present yet.
    ///Returns `true` if the value was inserted.
    pub fn insert_if_absent<T, U>(&mut self, key: &T, val: &U) -> bool
    where
        T: ToString + ?Sized,
        U: ToString + ?Sized,
    {
        match self.0.entry(Ascii::new(key.to_string())) {
            hash_map::Entry::Occupied(_) => false,
            hash_map::Entry::Vacant(v) => {
                v.insert(val.to_string());
                true
            }
        }
    }

    ///Appends a value to a key, joining repeated headers with ", ".
    ///`Set-Cookie` values are joined with "\n" since they may contain commas.
    pub fn append<T, U>(&mut self, key: &T, val: &U)
    where
        T: ToString + ?Sized,
        U: ToString + ?Sized,
    {
        let key = Ascii::new(key.to_string());
        let separator = if key.eq_ignore_ascii_case("Set-Cookie") {
            "\n"
        } else {
            ", "
        };

        self.0
            .entry(key)
            .and_modify(|v| {
                v.push_str(separator);
                v.push_str(&val.to_string());
            })
            .or_insert_with(|| val.to_string());
    }

    ///Removes a key from the map, returning the value if it was present.
    pub fn remove<T: ToString + ?Sized>(&mut self, key: &T) -> Option<String> {
        self.0.remove(&Ascii::new(key.to_string()))
    }

    pub fn contains_key<T: ToString + ?Sized>(&self, key: &T) -> bool {
        self.0.contains_key(&Ascii::new(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<Ascii<String>, String>> for Headers {
    fn from(map: HashMap<Ascii<String>, String>) -> Headers {
        Headers(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: ToString,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Headers {
        let mut headers = Headers::new();

        for (k, v) in iter {
            headers.insert(&k, &v);
        }

        headers
    }
}

impl From<Headers> for HashMap<Ascii<String>, String> {
    fn from(map: Headers) -> HashMap<Ascii<String>, String> {
        map.0
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let headers: String = self
            .iter()
            .map(|(key, val)| format!("  {}: {}\r\n", key, val))
            .collect();

        write!(f, "{{\r\n{}}}", headers)
    }
}

///Code sent by a server in response to a client's request.
///# Example
///```
///use http_fetch::response::StatusCode;
///
///let code = StatusCode::from(200);
///assert!(code.is_success())
///```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct StatusCode(u16);

impl StatusCode {
    pub fn new(code: u16) -> StatusCode {
        StatusCode(code)
    }

    ///Checks if this `StatusCode` is within 100-199, which indicates that it's Informational.
    pub fn is_info(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    ///Checks if this `StatusCode` is within 200-299, which indicates that it's Successful.
    pub fn is_success(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    ///Checks if this `StatusCode` is within 300-399, which indicates that it's Redirection.
    pub fn is_redirect(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    ///Checks if this `StatusCode` is within 400-499, which indicates that it's Client Error.
    pub fn is_client_err(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    ///Checks if this `StatusCode` is within 500-599, which indicates that it's Server Error.
    pub fn is_server_err(&self) -> bool {
        self.0 >= 500 && self.0 < 600
    }

    ///Returns the leading digit of this `StatusCode`, which names its class.
    pub fn class(&self) -> u16 {
        let mut code = self.0;

        while code >= 10 {
            code /= 10;
        }

        code
    }

    ///Checks if a response with this `StatusCode` never carries a body.
    pub fn is_bodyless(&self) -> bool {
        self.is_info() || self.0 == 204 || self.0 == 304
    }
}

impl From<StatusCode> for u16 {
    fn from(code: StatusCode) -> Self {
        code.0
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct Status {
    version: String,
    code: StatusCode,
    reason: String,
}

impl<T, U, V> From<(T, U, V)> for Status
where
    T: ToString,
    V: ToString,
    StatusCode: From<U>,
{
    fn from(status: (T, U, V)) -> Status {
        Status {
            version: status.0.to_string(),
            code: StatusCode::from(status.1),
            reason: status.2.to_string(),
        }
    }
}
