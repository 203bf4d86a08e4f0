//! HTTP response builder and wire serializer.

use crate::http::types::StatusCode;

/// HTTP response built by a [`Controller`](crate::Controller) or an
/// [`ExceptionHandler`](crate::ExceptionHandler).
///
/// Build it by chaining: [`new`](Response::new) -> headers -> optional body.
/// Serialization always computes `Content-Length` from the body, so never set
/// it yourself: a caller-supplied `Content-Length` is dropped on the wire.
///
/// # Examples
/// ```
/// use coyote::{Response, StatusCode};
///
/// let resp = Response::new(StatusCode::Ok)
///     .header("Content-Type", "text/html;charset=utf-8")
///     .body("<h1>Hello</h1>");
///
/// assert_eq!(
///     resp.serialize(),
///     b"HTTP/1.1 200 OK\r\n\
///       Content-Type: text/html;charset=utf-8\r\n\
///       Content-Length: 14\r\n\
///       \r\n\
///       <h1>Hello</h1>"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, Vec<u8>)>,
    body: Option<Vec<u8>>,
}

impl Response {
    #[inline]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    /// `302 Found` pointing at `location`.
    #[inline]
    pub fn redirect(location: &str) -> Self {
        Self::new(StatusCode::Found).header("Location", location)
    }

    /// Adds a header, or replaces the value of an existing one
    /// (case-insensitive name match) keeping its position.
    ///
    /// # Examples
    /// ```
    /// use coyote::{Response, StatusCode};
    ///
    /// let resp = Response::new(StatusCode::Ok)
    ///     .header("x-custom-id", 128)
    ///     .header("x-cache-enabled", true)
    ///     .header("X-Custom-Id", "129");
    ///
    /// assert_eq!(resp.header_str("x-custom-id"), Some("129"));
    /// assert_eq!(resp.header_str("x-cache-enabled"), Some("true"));
    /// ```
    pub fn header<N: Into<String>, V: WriteBuffer>(mut self, name: N, value: V) -> Self {
        let name = name.into();
        let mut bytes = Vec::new();
        value.write_to(&mut bytes);

        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some((_, v)) => *v = bytes,
            None => self.headers.push((name, bytes)),
        }
        self
    }

    /// Sets the response body.
    #[inline]
    pub fn body<T: WriteBuffer>(mut self, data: T) -> Self {
        let mut bytes = Vec::new();
        data.write_to(&mut bytes);
        self.body = Some(bytes);
        self
    }

    #[inline]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns a header value with case-insensitive name matching.
    pub fn header_value(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    /// Same as [`header_value`](Response::header_value), `None` for non-UTF-8 values.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.header_value(name)
            .and_then(|v| std::str::from_utf8(v).ok())
    }

    #[inline]
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

// Serializer
impl Response {
    /// Renders the response in HTTP/1.1 wire format.
    ///
    /// Deterministic: the same response always yields the same bytes.
    #[inline]
    pub fn serialize(&self) -> Vec<u8> {
        let body_len = self.body.as_ref().map_or(0, Vec::len);
        let headers_len: usize = self.headers.iter().map(|(n, v)| n.len() + v.len() + 4).sum();

        let mut buffer = Vec::with_capacity(64 + headers_len + body_len);
        self.write_to(&mut buffer);
        buffer
    }

    /// Appends the wire format to `buffer`.
    pub fn write_to(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(self.status.status_line());

        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("content-length") {
                continue;
            }

            buffer.extend_from_slice(name.as_bytes());
            buffer.extend_from_slice(b": ");
            buffer.extend_from_slice(value);
            buffer.extend_from_slice(b"\r\n");
        }

        let body = self.body.as_deref().unwrap_or_default();

        buffer.extend_from_slice(b"Content-Length: ");
        body.len().write_to(buffer);
        buffer.extend_from_slice(b"\r\n\r\n");
        buffer.extend_from_slice(body);
    }
}

pub(crate) mod write {
    /// Conversion of header values and bodies into bytes.
    ///
    /// # Examples
    /// ```
    /// use coyote::{Response, StatusCode, WriteBuffer};
    ///
    /// struct Point(i32, i32);
    ///
    /// impl WriteBuffer for Point {
    ///     fn write_to(&self, buffer: &mut Vec<u8>) {
    ///         buffer.extend_from_slice(format!("{};{}", self.0, self.1).as_bytes());
    ///     }
    /// }
    ///
    /// let resp = Response::new(StatusCode::Ok).header("x-point", Point(3, -4));
    /// assert_eq!(resp.header_str("x-point"), Some("3;-4"));
    /// ```
    pub trait WriteBuffer {
        fn write_to(&self, buffer: &mut Vec<u8>);
    }

    macro_rules! impl_write_buffer {
        (bytes: $($t:ty),*) => {$(
            impl WriteBuffer for $t {
                #[inline] fn write_to(&self, buffer: &mut Vec<u8>) {
                    buffer.extend_from_slice(self.as_ref());
                }
            }
        )*};
        (display: $($t:ty),*) => {$(
            impl WriteBuffer for $t {
                #[inline] fn write_to(&self, buffer: &mut Vec<u8>) {
                    use std::io::Write;
                    // Writing into a `Vec` cannot fail.
                    let _ = write!(buffer, "{}", self);
                }
            }
        )*};
    }

    impl_write_buffer!(bytes: str, String, [u8], Vec<u8>);
    impl_write_buffer!(display: u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, bool);

    impl<const N: usize> WriteBuffer for [u8; N] {
        #[inline]
        fn write_to(&self, buffer: &mut Vec<u8>) {
            buffer.extend_from_slice(self);
        }
    }

    impl<T: WriteBuffer + ?Sized> WriteBuffer for &T {
        #[inline]
        fn write_to(&self, buffer: &mut Vec<u8>) {
            (**self).write_to(buffer);
        }
    }
}

use write::WriteBuffer;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::*;

    #[test]
    fn basic() {
        #[rustfmt::skip]
        let cases = [
            (StatusCode::Ok,       "HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n"),
            (StatusCode::NotFound, "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n"),
            (
                StatusCode::MethodNotAllowed,
                "HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n"
            ),
        ];

        for (status, expected) in cases {
            assert_eq!(str_op(&Response::new(status).serialize()), expected);
        }
    }

    #[test]
    fn headers_in_insertion_order() {
        let resp = Response::redirect("/index.html")
            .header("Set-Cookie", "JSESSIONID=abc")
            .header("X-Empty", "");

        assert_eq!(
            str_op(&resp.serialize()),
            "HTTP/1.1 302 Found\r\n\
             Location: /index.html\r\n\
             Set-Cookie: JSESSIONID=abc\r\n\
             X-Empty: \r\n\
             Content-Length: 0\r\n\
             \r\n"
        );
    }

    #[test]
    fn content_length_is_computed() {
        let resp = Response::new(StatusCode::Ok)
            .header("content-length", 999)
            .header("Content-Type", "text/plain")
            .body("Hello world!");

        assert_eq!(
            str_op(&resp.serialize()),
            "HTTP/1.1 200 OK\r\n\
             Content-Type: text/plain\r\n\
             Content-Length: 12\r\n\
             \r\n\
             Hello world!"
        );
    }

    #[test]
    fn binary_body() {
        let data = vec![0u8, 159, 146, 150, b'\r', b'\n'];
        let resp = Response::new(StatusCode::Ok).body(&data);
        let wire = resp.serialize();

        assert!(wire.ends_with(b"Content-Length: 6\r\n\r\n\x00\x9f\x92\x96\r\n"));
        assert_eq!(resp.body_bytes(), Some(data.as_slice()));
    }

    #[test]
    fn serialization_is_deterministic() {
        let resp = Response::new(StatusCode::Unauthorized)
            .header("Content-Type", "text/html;charset=utf-8")
            .header("X-Request", 42)
            .body("<p>no</p>");

        assert_eq!(resp.serialize(), resp.serialize());
        assert_eq!(resp.serialize(), resp.clone().serialize());

        let mut appended = b"prefix".to_vec();
        resp.write_to(&mut appended);
        assert_eq!(&appended[6..], resp.serialize().as_slice());
    }

    #[test]
    fn write_buffer_values() {
        #[rustfmt::skip]
        let resp = Response::new(StatusCode::Ok)
            .header("a", "str")
            .header("b", String::from("string"))
            .header("c", -128)
            .header("d", u128::MAX)
            .header("e", false)
            .header("f", b"bytes");

        assert_eq!(resp.header_str("A"), Some("str"));
        assert_eq!(resp.header_str("b"), Some("string"));
        assert_eq!(resp.header_str("c"), Some("-128"));
        assert_eq!(resp.header_str("d"), Some("340282366920938463463374607431768211455"));
        assert_eq!(resp.header_str("e"), Some("false"));
        assert_eq!(resp.header_value("f"), Some(&b"bytes"[..]));
        assert_eq!(resp.header_value("g"), None);
    }
}
