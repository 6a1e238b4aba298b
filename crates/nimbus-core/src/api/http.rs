//! Just enough HTTP/1.1 for three fixed routes.

use core::fmt::Write;

use log::{debug, error};

pub const SENSORS_PATH: &str = "/api/v1/sensors";
pub const NOT_FOUND_BODY: &str = "404: Not Found";
pub const SERVER_ERROR_BODY: &str = "500: Internal Server Error";

/// Capacity of a rendered status line plus headers.
pub const HEAD_CAPACITY: usize = 192;

pub type ResponseHead = heapless::String<HEAD_CAPACITY>;

const STATUS_LINE_PREFIX: &str = "HTTP/1.1 ";
const CONTENT_TYPE_HEADER: &str = "\r\nContent-Type: ";
const CONTENT_LENGTH_HEADER: &str = "\r\nContent-Length: ";
const NO_STORE_HEADER: &str = "\r\nCache-Control: no-store";
const CONNECTION_HEADER: &str = "\r\nConnection: close\r\n\r\n";

const fn max(a: usize, b: usize) -> usize {
    if a > b { a } else { b }
}

/// Decimal digits of the largest `Content-Length`.
const fn usize_digits() -> usize {
    let mut width = 1;
    let mut rest = usize::MAX / 10;
    while rest > 0 {
        width += 1;
        rest /= 10;
    }
    width
}

/// Longest head any [`Response`] can produce.
pub const MAX_HEAD_LEN: usize = STATUS_LINE_PREFIX.len()
    + 3
    + 1
    + max(
        max(StatusCode::Ok.reason().len(), StatusCode::NotFound.reason().len()),
        StatusCode::InternalServerError.reason().len(),
    )
    + CONTENT_TYPE_HEADER.len()
    + max(
        max(ContentType::Html.as_str().len(), ContentType::Json.as_str().len()),
        ContentType::Text.as_str().len(),
    )
    + CONTENT_LENGTH_HEADER.len()
    + usize_digits()
    + NO_STORE_HEADER.len()
    + CONNECTION_HEADER.len();

const _: () = assert!(MAX_HEAD_LEN <= HEAD_CAPACITY);

/// The fixed routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `GET /`
    Dashboard,
    /// `GET /api/v1/sensors`
    Sensors,
    /// Everything else
    NotFound,
}

impl Route {
    /// Resolve a route from the raw request bytes. Only the request line is
    /// looked at; the query string is ignored and only `GET` matches.
    pub fn resolve(request: &[u8]) -> Self {
        let line_end = request
            .iter()
            .position(|&b| b == b'\r' || b == b'\n')
            .unwrap_or(request.len());
        let Ok(line) = core::str::from_utf8(&request[..line_end]) else {
            return Route::NotFound;
        };

        let mut parts = line.split_ascii_whitespace();
        let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
            return Route::NotFound;
        };
        if method != "GET" {
            return Route::NotFound;
        }

        let path = target.split('?').next().unwrap_or(target);
        let route = match path {
            "/" => Route::Dashboard,
            SENSORS_PATH => Route::Sensors,
            _ => Route::NotFound,
        };
        debug!("HTTP {} {} -> {:?}", method, path, route);
        route
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    NotFound,
    InternalServerError,
}

impl StatusCode {
    pub const fn code(self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
        }
    }

    pub const fn reason(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Html,
    Json,
    Text,
}

impl ContentType {
    pub const fn as_str(self) -> &'static str {
        match self {
            ContentType::Html => "text/html",
            ContentType::Json => "application/json",
            ContentType::Text => "text/plain",
        }
    }
}

/// A complete response whose body is borrowed from static data or the API
/// unit's own buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response<'a> {
    pub status: StatusCode,
    pub content_type: ContentType,
    pub cacheable: bool,
    pub body: &'a [u8],
}

impl<'a> Response<'a> {
    pub const fn html(body: &'a str) -> Self {
        Self {
            status: StatusCode::Ok,
            content_type: ContentType::Html,
            cacheable: true,
            body: body.as_bytes(),
        }
    }

    pub const fn json(body: &'a str) -> Self {
        Self {
            status: StatusCode::Ok,
            content_type: ContentType::Json,
            cacheable: false,
            body: body.as_bytes(),
        }
    }

    pub const fn not_found() -> Self {
        Self {
            status: StatusCode::NotFound,
            content_type: ContentType::Text,
            cacheable: false,
            body: NOT_FOUND_BODY.as_bytes(),
        }
    }

    pub const fn server_error() -> Self {
        Self {
            status: StatusCode::InternalServerError,
            content_type: ContentType::Text,
            cacheable: false,
            body: SERVER_ERROR_BODY.as_bytes(),
        }
    }

    /// Status line and headers, terminated by the blank line.
    ///
    /// Never longer than [`MAX_HEAD_LEN`], which fits [`HEAD_CAPACITY`].
    pub fn head(&self) -> ResponseHead {
        let mut head = ResponseHead::new();
        let written = write!(
            head,
            "{}{} {}{}{}{}{}{}{}",
            STATUS_LINE_PREFIX,
            self.status.code(),
            self.status.reason(),
            CONTENT_TYPE_HEADER,
            self.content_type.as_str(),
            CONTENT_LENGTH_HEADER,
            self.body.len(),
            if self.cacheable { "" } else { NO_STORE_HEADER },
            CONNECTION_HEADER,
        );
        if written.is_err() {
            error!("HTTP head exceeded {} bytes", HEAD_CAPACITY);
            head.clear();
        }
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_fixed_routes() {
        assert_eq!(Route::resolve(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n"), Route::Dashboard);
        assert_eq!(
            Route::resolve(b"GET /api/v1/sensors HTTP/1.1\r\n\r\n"),
            Route::Sensors
        );
        assert_eq!(
            Route::resolve(b"GET /api/v1/sensors?t=123 HTTP/1.1\r\n\r\n"),
            Route::Sensors
        );
    }

    #[test]
    fn everything_else_is_not_found() {
        let requests: [&[u8]; 6] = [
            b"GET /favicon.ico HTTP/1.1\r\n\r\n",
            b"GET /api/v1/sensors/ HTTP/1.1\r\n\r\n",
            b"POST /api/v1/sensors HTTP/1.1\r\n\r\n",
            b"GET\r\n\r\n",
            b"",
            b"\xff\xfe / HTTP/1.1\r\n",
        ];
        for request in requests {
            assert_eq!(Route::resolve(request), Route::NotFound);
        }
    }

    #[test]
    fn not_found_response_is_fixed() {
        let response = Response::not_found();
        assert_eq!(response.status.code(), 404);
        assert_eq!(response.body, b"404: Not Found");
        assert_eq!(
            response.head().as_str(),
            "HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nContent-Length: 14\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn longest_head_fits() {
        let body = [b'x'; 4];
        let response = Response {
            status: StatusCode::InternalServerError,
            content_type: ContentType::Json,
            cacheable: false,
            body: &body,
        };
        let head = response.head();
        assert!(head.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(head.ends_with("Connection: close\r\n\r\n"));
        assert!(head.len() <= MAX_HEAD_LEN);

        let widest_length = usize_digits() - 1;
        assert_eq!(head.len() + widest_length, MAX_HEAD_LEN);
    }

    #[test]
    fn cacheable_head_has_no_cache_control() {
        let head = Response::html("<p>").head();
        assert_eq!(
            head.as_str(),
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 3\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn json_head_carries_length() {
        let response = Response::json("{}");
        assert_eq!(
            response.head().as_str(),
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n"
        );
    }
}
