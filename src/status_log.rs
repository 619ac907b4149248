//! timed, color-coded status line written after every response
use crate::{address::Address, request::Method, response::StatusCode};
use std::{fmt, time::Duration};

/// ANSI color codes keyed by the leading digit of a status code:
/// 2xx green, 3xx yellow, 4xx and 5xx red.
pub const COLORS: [(u16, u8); 4] = [(2, 32), (3, 33), (4, 31), (5, 31)];

/// Color used for status codes outside the mapped classes.
pub const DEFAULT_COLOR: u8 = 36;

pub const RESET: &str = "\x1b[0m";

/// Returns the ANSI color code for `status`.
pub fn color_code(status: StatusCode) -> u8 {
    let class = status.class();

    COLORS
        .iter()
        .find(|(c, _)| *c == class)
        .map_or(DEFAULT_COLOR, |(_, color)| *color)
}

/// Diagnostic line describing one request and the status it received.
///
/// Renders as `<color><METHOD> <scheme>//<host><path> <status> <elapsed>ms<reset>`.
#[derive(Debug)]
pub struct StatusLine<'a> {
    pub method: &'a Method,
    pub address: &'a Address,
    pub status: StatusCode,
    pub elapsed: Duration,
}

impl StatusLine<'_> {
    /// Emits this line as a `debug` record.
    pub fn emit(&self) {
        log::debug!("{}", self);
    }
}

impl fmt::Display for StatusLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "\x1b[{}m{} {}://{}{} {} {}ms{}",
            color_code(self.status),
            self.method.as_ref(),
            self.address.transport(),
            self.address.host_header(),
            self.address.resource(),
            self.status,
            self.elapsed.as_millis(),
            RESET
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_colors() {
        assert_eq!(color_code(StatusCode::new(201)), 32);
        assert_eq!(color_code(StatusCode::new(301)), 33);
        assert_eq!(color_code(StatusCode::new(404)), 31);
        assert_eq!(color_code(StatusCode::new(503)), 31);
        assert_eq!(color_code(StatusCode::new(999)), DEFAULT_COLOR);
        assert_eq!(color_code(StatusCode::new(101)), DEFAULT_COLOR);
    }

    #[test]
    fn line_format() {
        let address = Address::new("http://example.com/path?q=1#frag").unwrap();
        let line = StatusLine {
            method: &Method::GET,
            address: &address,
            status: StatusCode::new(404),
            elapsed: Duration::from_millis(42),
        };

        assert_eq!(
            line.to_string(),
            "\x1b[31mGET http://example.com/path?q=1 404 42ms\x1b[0m"
        );
    }

    #[test]
    fn line_format_with_port() {
        let address = Address::new("https://localhost:8443/").unwrap();
        let line = StatusLine {
            method: &Method::POST,
            address: &address,
            status: StatusCode::new(201),
            elapsed: Duration::from_millis(7),
        };

        assert_eq!(
            line.to_string(),
            "\x1b[32mPOST https://localhost:8443/ 201 7ms\x1b[0m"
        );
    }
}
