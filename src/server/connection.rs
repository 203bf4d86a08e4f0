use crate::{
    errors::{Condition, ErrorKind},
    http::request::{Parser, Request},
    limits::ReqLimits,
    routing::{Dispatcher, Outcome},
};
use std::{io, sync::Arc};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    task::spawn_blocking,
};
use tracing::{debug, error};

/// Serves exactly one request per connection: read, dispatch, write, close.
pub(crate) struct HttpConnection {
    dispatcher: Arc<Dispatcher>,
    parser: Parser,
    buffer: Vec<u8>,
}

impl HttpConnection {
    #[inline]
    pub(crate) fn new(dispatcher: Arc<Dispatcher>, limits: ReqLimits) -> Self {
        Self {
            dispatcher,
            parser: Parser::new(limits),
            buffer: Vec::with_capacity(1024),
        }
    }

    #[inline]
    pub(crate) async fn run(&mut self, stream: &mut TcpStream) -> Result<(), io::Error> {
        let (mut reader, mut writer) = stream.split();
        self.process(&mut reader, &mut writer).await
    }

    /// Handles one request from `reader` and answers on `writer`.
    ///
    /// The write half is shut down on every path, errors included.
    pub(crate) async fn process<R, W>(&mut self, reader: &mut R, writer: &mut W) -> Result<(), io::Error>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let result = self.respond(reader, writer).await;
        let _ = writer.shutdown().await;
        result
    }

    async fn respond<R, W>(&mut self, reader: &mut R, writer: &mut W) -> Result<(), io::Error>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let outcome = match self.parser.read_request(reader).await {
            Ok(Some(request)) => {
                debug!(method = %request.method(), path = request.path(), "request parsed");
                self.dispatch(request).await
            }
            Ok(None) => return Ok(()),
            Err(ErrorKind::Condition(condition)) => self.fail(condition).await,
            Err(ErrorKind::Io(err)) => return Err(err),
        };

        match outcome {
            Outcome::Response(response) => {
                self.buffer.clear();
                response.write_to(&mut self.buffer);

                writer.write_all(&self.buffer).await?;
                writer.flush().await
            }
            Outcome::Unhandled(condition) => {
                error!(%condition, "no exception handler accepts the condition, closing connection");
                Ok(())
            }
        }
    }

    // Controllers may block on file I/O, so they run on the blocking pool.
    async fn dispatch(&self, request: Request) -> Outcome {
        let dispatcher = Arc::clone(&self.dispatcher);

        match spawn_blocking(move || dispatcher.dispatch(&request)).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(%err, "controller panicked");
                self.fail(Condition::Internal("request handler panicked".into())).await
            }
        }
    }

    async fn fail(&self, condition: Condition) -> Outcome {
        let dispatcher = Arc::clone(&self.dispatcher);

        spawn_blocking(move || dispatcher.fail(condition))
            .await
            .unwrap_or_else(|err| {
                error!(%err, "exception handler panicked");
                Outcome::Unhandled(Condition::Internal("exception handler panicked".into()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app::{self, UserStore},
        resources::tests::fixtures,
        tools::*,
        Controller, Response, SessionStore,
    };
    use std::{
        fs,
        pin::Pin,
        task::{Context, Poll},
    };

    struct Exchange {
        sessions: Arc<SessionStore>,
        users: Arc<UserStore>,
        connection: HttpConnection,
    }

    impl Exchange {
        fn new() -> Self {
            let sessions = Arc::new(SessionStore::new());
            let users = Arc::new(UserStore::seeded());

            let dispatcher = app::dispatcher(fixtures(), Arc::clone(&sessions), Arc::clone(&users));
            Self {
                sessions,
                users,
                connection: HttpConnection::new(Arc::new(dispatcher), ReqLimits::default()),
            }
        }

        async fn send(&mut self, raw: &str) -> String {
            let mut reader = raw.as_bytes();
            let mut written = Vec::new();

            self.connection
                .process(&mut reader, &mut written)
                .await
                .unwrap();
            str_op(&written).to_string()
        }
    }

    fn fixture(name: &str) -> String {
        fs::read_to_string(fixtures().root().join(name)).unwrap()
    }

    fn page(status: &str, name: &str) -> String {
        let body = fixture(name);
        format!(
            "HTTP/1.1 {status}\r\n\
             Content-Type: text/html;charset=utf-8\r\n\
             Content-Length: {}\r\n\
             \r\n\
             {body}",
            body.len()
        )
    }

    #[tokio::test]
    async fn welcome() {
        let resp = Exchange::new()
            .send("GET / HTTP/1.1 \r\nHost: localhost:8080 \r\nConnection: keep-alive \r\n\r\n")
            .await;

        assert_eq!(
            resp,
            "HTTP/1.1 200 OK\r\n\
             Content-Type: text/html;charset=utf-8\r\n\
             Content-Length: 12\r\n\
             \r\n\
             Hello world!"
        );
    }

    #[tokio::test]
    async fn static_files() {
        let mut exchange = Exchange::new();

        let resp = exchange
            .send("GET /index.html HTTP/1.1\r\nHost: localhost:8080\r\nConnection: keep-alive\r\n\r\n")
            .await;
        assert_eq!(resp, page("200 OK", "index.html"));

        let css = fixture("css/styles.css");
        let resp = exchange
            .send("GET /css/styles.css HTTP/1.1\r\nAccept: text/css,*/*;q=0.1\r\n\r\n")
            .await;
        assert_eq!(
            resp,
            format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/css;charset=utf-8\r\nContent-Length: {}\r\n\r\n{css}",
                css.len()
            )
        );
    }

    #[tokio::test]
    async fn not_found() {
        let mut exchange = Exchange::new();

        for target in ["/nothing-here", "/../Cargo.toml", "/css"] {
            let resp = exchange.send(&format!("GET {target} HTTP/1.1\r\n\r\n")).await;
            assert_eq!(resp, page("404 Not Found", "404.html"), "{target}");
        }
    }

    #[tokio::test]
    async fn login() {
        let mut exchange = Exchange::new();
        let body = "account=gugu&password=password";

        let resp = exchange
            .send(&format!(
                "POST /login HTTP/1.1\r\n\
                 Host: localhost:8080\r\n\
                 Content-Length: {}\r\n\
                 Content-Type: application/x-www-form-urlencoded\r\n\
                 \r\n\
                 {body}",
                body.len()
            ))
            .await;

        assert!(resp.starts_with("HTTP/1.1 302 Found\r\nLocation: /index.html\r\nSet-Cookie: JSESSIONID="));
        assert!(resp.ends_with("\r\nContent-Length: 0\r\n\r\n"));
        assert_eq!(exchange.sessions.size(), 1);

        // The issued cookie is recognized on the next connection.
        let id = resp
            .split("JSESSIONID=")
            .nth(1)
            .and_then(|rest| rest.split("\r\n").next())
            .unwrap();
        assert!(exchange.sessions.find(id).is_some());

        let resp = exchange
            .send(&format!("GET /login HTTP/1.1\r\nCookie: theme=dark; JSESSIONID={id}\r\n\r\n"))
            .await;
        assert_eq!(resp, "HTTP/1.1 302 Found\r\nLocation: /index.html\r\nContent-Length: 0\r\n\r\n");
        assert_eq!(exchange.sessions.size(), 1);

        let resp = exchange.send("GET /login HTTP/1.1\r\nCookie: JSESSIONID=stale\r\n\r\n").await;
        assert_eq!(resp, page("200 OK", "login.html"));
    }

    #[tokio::test]
    async fn login_failure() {
        let mut exchange = Exchange::new();
        let body = "account=gugu&password=wrong";

        let resp = exchange
            .send(&format!(
                "POST /login HTTP/1.1\r\nContent-Length: {}\r\n\r\n{body}",
                body.len()
            ))
            .await;

        assert_eq!(resp, page("401 Unauthorized", "401.html"));
        assert_eq!(exchange.sessions.size(), 0);
    }

    #[tokio::test]
    async fn register() {
        let mut exchange = Exchange::new();

        // The declared length overshoots the body; what arrived is used.
        let resp = exchange
            .send(
                "POST /register HTTP/1.1 \r\n\
                 Host: localhost:8080 \r\n\
                 Connection: keep-alive \r\n\
                 Content-Length: 80 \r\n\
                 Content-Type: application/x-www-form-urlencoded \r\n\
                 Accept: */* \r\n\
                 \r\n\
                 account=gugu2&password=password&email=hkkang%40woowahan.com",
            )
            .await;
        assert_eq!(resp, "HTTP/1.1 302 Found\r\nLocation: /index.html\r\nContent-Length: 0\r\n\r\n");
        assert!(exchange.users.find_by_account("gugu2").is_some());

        let body = "account=gugu&password=password&email=hkkang%40woowahan.com";
        let resp = exchange
            .send(&format!(
                "POST /register HTTP/1.1\r\nContent-Length: {}\r\n\r\n{body}",
                body.len()
            ))
            .await;
        assert_eq!(resp, page("500 Internal Server Error", "500.html"));
    }

    #[tokio::test]
    async fn bad_requests_and_methods() {
        let mut exchange = Exchange::new();

        #[rustfmt::skip]
        let cases = [
            ("GET /login HTTP/1.1 extra\r\n\r\n",                           "400 Bad Request"),
            ("BREW / HTTP/1.1\r\n\r\n",                                      "400 Bad Request"),
            ("GET / HTTP/2.0\r\n\r\n",                                       "400 Bad Request"),
            ("GET /?flag HTTP/1.1\r\n\r\n",                                  "400 Bad Request"),
            ("GET / HTTP/1.1\r\nno colon\r\n\r\n",                           "400 Bad Request"),
            ("POST /login HTTP/1.1\r\nContent-Length: ten\r\n\r\n",          "400 Bad Request"),
            ("POST /login HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n",   "400 Bad Request"),
            ("GET / HTTP/1.1\r\nHost: cut",                                  "400 Bad Request"),
            ("PUT /login HTTP/1.1\r\n\r\n",                                  "405 Method Not Allowed"),
            ("DELETE /register HTTP/1.1\r\n\r\n",                            "405 Method Not Allowed"),
        ];

        for (raw, status) in cases {
            let resp = exchange.send(raw).await;
            assert_eq!(resp, format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\n\r\n"), "{raw:?}");
        }
    }

    #[tokio::test]
    async fn silent_paths() {
        let mut exchange = Exchange::new();
        assert_eq!(exchange.send("").await, "");

        // Without exception handlers nothing is written.
        let dispatcher = Dispatcher::builder().build();
        let mut connection = HttpConnection::new(Arc::new(dispatcher), ReqLimits::default());
        let mut reader: &[u8] = b"GET / HTTP/1.1\r\n\r\n";
        let mut written = Vec::new();

        connection.process(&mut reader, &mut written).await.unwrap();
        assert!(written.is_empty());
    }

    #[tokio::test]
    async fn panicking_controller() {
        struct Boom;

        impl Controller for Boom {
            fn supports(&self, _: &Request) -> bool {
                true
            }

            fn handle(&self, _: &Request) -> Result<Response, Condition> {
                panic!("boom");
            }
        }

        let dispatcher = Dispatcher::builder()
            .controller(Boom)
            .exception_handler(app::ErrorPage::internal(fixtures()))
            .build();
        let mut connection = HttpConnection::new(Arc::new(dispatcher), ReqLimits::default());
        let mut reader: &[u8] = b"GET / HTTP/1.1\r\n\r\n";
        let mut written = Vec::new();

        connection.process(&mut reader, &mut written).await.unwrap();
        assert_eq!(str_op(&written), page("500 Internal Server Error", "500.html"));
    }

    #[derive(Default)]
    struct BrokenWriter {
        shutdowns: usize,
    }

    impl AsyncWrite for BrokenWriter {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(mut self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            self.shutdowns += 1;
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn write_failure_closes_connection() {
        let mut exchange = Exchange::new();
        let mut reader: &[u8] = b"GET / HTTP/1.1\r\n\r\n";
        let mut writer = BrokenWriter::default();

        let result = exchange.connection.process(&mut reader, &mut writer).await;

        assert_eq!(result.map_err(|err| err.kind()), Err(io::ErrorKind::BrokenPipe));
        assert_eq!(writer.shutdowns, 1);
    }
}
