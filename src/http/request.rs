use crate::{
    errors::{Condition, ErrorKind, MalformedRequest},
    http::{
        cookie::{Cookies, SESSION_COOKIE},
        types::HeaderMap,
    },
    limits::ReqLimits,
    query::Query,
    Method, Version,
};
use memchr::{memchr, memmem};
use std::sync::OnceLock;
use tokio::io::{AsyncRead, AsyncReadExt};

/// A parsed HTTP request.
///
/// Immutable once parsed; created for a single connection cycle.
///
/// # Input data requirements
///
/// - `CRLF`: lines end with exactly `"\r\n"`; the first empty line ends the head.
/// - The head (request line and headers) must be `UTF-8`. The body is raw bytes.
///
/// ## First line
/// ```text
/// [METHOD] SP [TARGET] SP [VERSION] CRLF
/// ```
/// Exactly three whitespace-separated tokens; trailing whitespace is tolerated.
/// `[TARGET]` is a path optionally followed by `?` and a query, parsed by
/// [`Query::parse`]. `[VERSION]` is `HTTP/1.0` or `HTTP/1.1`.
///
/// ## Header
/// ```text
/// [NAME] ":" [VALUE] CRLF
/// ```
/// Split at the first `:`. Whitespace around name and value is dropped. Names
/// are case-insensitive; when a name repeats, the last value wins.
///
/// ## Body
///
/// Read only when `Content-Length` is present and greater than zero.
///
/// **Not supported**: `Transfer-Encoding: chunked` (rejected as malformed),
/// bodies without `Content-Length`, `Expect: 100-continue`.
///
/// # Examples
/// ```
/// use coyote::{Method, Request};
///
/// let raw = "POST /login?next=%2F HTTP/1.1\r\n\
///            Host: localhost:8080\r\n\
///            Cookie: JSESSIONID=abc\r\n\
///            Content-Length: 12\r\n\
///            \r\n\
///            account=gugu";
/// let request = Request::parse(raw.as_bytes()).unwrap();
///
/// assert_eq!(request.method(), Method::Post);
/// assert_eq!(request.path(), "/login");
/// assert_eq!(request.query().find("next"), Some("%2F"));
/// assert_eq!(request.header("host"), Some("localhost:8080"));
/// assert_eq!(request.session_id(), Some("abc"));
/// assert_eq!(request.body(), Some(&b"account=gugu"[..]));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Query,
    version: Version,

    headers: HeaderMap,
    content_length: usize,

    body: Option<Vec<u8>>,
    cookies: OnceLock<Cookies>,
}

const SECTION_SEP: &[u8] = b"\r\n\r\n";
const READ_CHUNK: usize = 4096;

// Public API
impl Request {
    /// Parses a complete message held in memory, using [`ReqLimits::default`].
    ///
    /// A body shorter than `Content-Length` is kept as it is.
    pub fn parse(raw: &[u8]) -> Result<Self, Condition> {
        let limits = ReqLimits::default();

        let head_end = memmem::find(raw, SECTION_SEP).ok_or(MalformedRequest::IncompleteHead)?;
        if head_end + SECTION_SEP.len() > limits.head_size {
            return Err(MalformedRequest::HeadTooLarge(limits.head_size).into());
        }

        let head = Head::parse(&raw[..head_end], &limits)?;
        Ok(head.into_request(&raw[head_end + SECTION_SEP.len()..]))
    }

    #[inline]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request-target without the query part.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parsed query; empty when the target has no `?`.
    #[inline]
    pub const fn query(&self) -> &Query {
        &self.query
    }

    #[inline]
    pub const fn version(&self) -> Version {
        self.version
    }

    #[inline]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value with case-insensitive name matching.
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// `Content-Length` as announced (0 when absent).
    #[inline]
    pub const fn content_length(&self) -> usize {
        self.content_length
    }

    /// Returns the request body if `Content-Length` was greater than zero.
    #[inline]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Cookies from the `Cookie` header, parsed on first access.
    pub fn cookies(&self) -> &Cookies {
        self.cookies.get_or_init(|| {
            self.headers
                .get("Cookie")
                .map(Cookies::parse)
                .unwrap_or_default()
        })
    }

    #[inline]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies().get(name)
    }

    /// Value of the `JSESSIONID` cookie.
    #[inline]
    pub fn session_id(&self) -> Option<&str> {
        self.cookie(SESSION_COOKIE)
    }
}

// Everything up to the blank line.
#[derive(Debug)]
struct Head {
    method: Method,
    path: String,
    query: Query,
    version: Version,
    headers: HeaderMap,
    content_length: usize,
}

impl Head {
    // `raw` excludes the terminating `\r\n\r\n`.
    fn parse(raw: &[u8], limits: &ReqLimits) -> Result<Self, Condition> {
        let text = simdutf8::basic::from_utf8(raw).map_err(|_| MalformedRequest::InvalidEncoding)?;
        let mut lines = text.split("\r\n");

        let request_line = lines.next().unwrap_or_default();
        let (method, target, version) = Self::parse_request_line(request_line)?;

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Query::parse(query)?),
            None => (target, Query::default()),
        };

        let mut headers = HeaderMap::with_capacity(16);
        for (count, line) in lines.enumerate() {
            if count >= limits.header_count {
                return Err(MalformedRequest::TooManyHeaders(limits.header_count).into());
            }

            let (name, value) = Self::parse_header(line)?;
            headers.insert(name, value);
        }

        if let Some(encoding) = headers.get("Transfer-Encoding") {
            if !encoding.eq_ignore_ascii_case("identity") {
                return Err(MalformedRequest::UnsupportedTransferEncoding(encoding.to_string()).into());
            }
        }

        let content_length = match headers.get("Content-Length") {
            Some(value) => Self::parse_content_length(value)?,
            None => 0,
        };
        if content_length > limits.body_size {
            return Err(MalformedRequest::BodyTooLarge(content_length).into());
        }

        Ok(Head {
            method,
            path: path.to_string(),
            query,
            version,
            headers,
            content_length,
        })
    }

    fn parse_request_line(line: &str) -> Result<(Method, &str, Version), MalformedRequest> {
        let mut tokens = line.split_whitespace();

        let (Some(method), Some(target), Some(version), None) =
            (tokens.next(), tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(MalformedRequest::RequestLine(line.to_string()));
        };

        Ok((
            Method::from_token(method)?,
            target,
            Version::from_token(version)?,
        ))
    }

    // Digits only: `usize::from_str` alone would also take a leading `+`.
    fn parse_content_length(value: &str) -> Result<usize, MalformedRequest> {
        let invalid = || MalformedRequest::InvalidContentLength(value.to_string());

        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        value.parse().map_err(|_| invalid())
    }

    fn parse_header(line: &str) -> Result<(&str, &str), MalformedRequest> {
        let invalid = || MalformedRequest::InvalidHeader(line.to_string());

        let colon = memchr(b':', line.as_bytes()).ok_or_else(invalid)?;
        let name = line[..colon].trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(invalid());
        }

        Ok((name, line[colon + 1..].trim()))
    }

    // `available` starts right after the blank line; bytes past
    // `Content-Length` are ignored.
    fn into_request(self, available: &[u8]) -> Request {
        let body = (self.content_length > 0)
            .then(|| available[..self.content_length.min(available.len())].to_vec());

        Request {
            method: self.method,
            path: self.path,
            query: self.query,
            version: self.version,
            headers: self.headers,
            content_length: self.content_length,
            body,
            cookies: OnceLock::new(),
        }
    }
}

//

/// Frames one request off a byte stream.
#[derive(Debug)]
pub(crate) struct Parser {
    limits: ReqLimits,
    buffer: Vec<u8>,
}

impl Parser {
    #[inline]
    pub(crate) fn new(limits: ReqLimits) -> Self {
        Parser {
            limits,
            buffer: Vec::with_capacity(READ_CHUNK),
        }
    }

    /// Reads until the end of the head, then until `Content-Length` body
    /// bytes arrived or the stream ends.
    ///
    /// `Ok(None)` when the peer closed the stream without sending anything.
    pub(crate) async fn read_request<R>(&mut self, stream: &mut R) -> Result<Option<Request>, ErrorKind>
    where
        R: AsyncRead + Unpin,
    {
        self.buffer.clear();
        let mut chunk = [0; READ_CHUNK];

        let mut scanned = 0;
        let head_end = loop {
            if let Some(pos) = memmem::find(&self.buffer[scanned..], SECTION_SEP) {
                break scanned + pos;
            }
            // The separator may straddle two reads.
            scanned = self.buffer.len().saturating_sub(SECTION_SEP.len() - 1);

            if self.buffer.len() >= self.limits.head_size {
                return Err(MalformedRequest::HeadTooLarge(self.limits.head_size).into());
            }

            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return match self.buffer.is_empty() {
                    true => Ok(None),
                    false => Err(MalformedRequest::IncompleteHead.into()),
                };
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        };

        if head_end + SECTION_SEP.len() > self.limits.head_size {
            return Err(MalformedRequest::HeadTooLarge(self.limits.head_size).into());
        }

        let head = Head::parse(&self.buffer[..head_end], &self.limits)?;
        let body_start = head_end + SECTION_SEP.len();

        while self.buffer.len() - body_start < head.content_length {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }

        Ok(Some(head.into_request(&self.buffer[body_start..])))
    }
}
