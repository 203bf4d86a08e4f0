use crate::{
    limits::{ReqLimits, ServerLimits, WaitStrategy},
    routing::Dispatcher,
    server::connection::HttpConnection,
    Response, StatusCode,
};
use crossbeam::queue::SegQueue;
use std::{net::SocketAddr, sync::Arc};
use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
    task::yield_now,
    time::sleep as tokio_sleep,
};
use tracing::{debug, info, warn};

/// An HTTP server answering one request per connection.
///
/// A fixed set of worker tasks, created by [`ServerBuilder::build`], takes
/// accepted connections from a queue and runs them through the
/// [`Dispatcher`]. See [`ServerLimits`] for the admission rules.
///
/// # Examples
///
/// ```no_run
/// use coyote::{app, Resources, Server, SessionStore};
/// use std::sync::Arc;
/// use tokio::net::TcpListener;
///
/// #[tokio::main]
/// async fn main() {
///     let dispatcher = app::dispatcher(
///         Resources::new("static"),
///         Arc::new(SessionStore::new()),
///         Arc::new(app::UserStore::seeded()),
///     );
///
///     Server::builder()
///         .listener(TcpListener::bind("127.0.0.1:8080").await.unwrap())
///         .dispatcher(dispatcher)
///         .build()
///         .launch()
///         .await
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    stream_queue: TcpQueue,
    error_queue: TcpQueue,
    server_limits: ServerLimits,
}

impl Server {
    /// Creates a new builder for configuring the server instance.
    #[inline]
    pub fn builder() -> ServerBuilder {
        ServerBuilder {
            listener: None,
            dispatcher: None,
            server_limits: None,
            request_limits: None,
        }
    }

    /// Accepts connections forever.
    ///
    /// Accept errors are skipped. A connection arriving while
    /// `max_pending_connections` are already queued goes to the overflow
    /// responders instead.
    #[inline]
    pub async fn launch(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, workers = self.server_limits.max_connections, "listening");
        }

        loop {
            let value = match self.listener.accept().await {
                Ok(value) => value,
                Err(err) => {
                    debug!(%err, "accept failed");
                    continue;
                }
            };

            match self.stream_queue.len() < self.server_limits.max_pending_connections {
                true => self.stream_queue.push(value),
                false => {
                    warn!(client = %value.1, "connection queue full");
                    self.error_queue.push(value)
                }
            }
        }
    }

    #[inline]
    async fn get_stream(queue: &TcpQueue, wait: &WaitStrategy) -> (TcpStream, SocketAddr) {
        loop {
            if let Some(value) = queue.pop() {
                return value;
            }

            match wait {
                WaitStrategy::Yield => yield_now().await,
                WaitStrategy::Sleep(time) => tokio_sleep(*time).await,
            }
        }
    }
}

//

/// Builder for configuring and creating [`Server`] instances.
pub struct ServerBuilder {
    listener: Option<TcpListener>,
    dispatcher: Option<Arc<Dispatcher>>,

    server_limits: Option<ServerLimits>,
    request_limits: Option<ReqLimits>,
}

impl ServerBuilder {
    /// Sets the TCP listener that the server will use to accept connections.
    ///
    /// **This is a required component.**
    #[inline(always)]
    pub fn listener(mut self, listener: TcpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Sets the route table every request goes through.
    ///
    /// **This is a required component.**
    #[inline(always)]
    pub fn dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Some(Arc::new(dispatcher));
        self
    }

    /// Configures worker count, queueing and overload behavior.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # #[tokio::main]
    /// # async fn main() {
    /// use coyote::{limits::ServerLimits, Dispatcher, Server};
    /// use tokio::net::TcpListener;
    ///
    /// let server = Server::builder()
    ///     .listener(TcpListener::bind("127.0.0.1:8080").await.unwrap())
    ///     .dispatcher(Dispatcher::builder().build())
    ///     .server_limits(ServerLimits {
    ///         max_connections: 2500,
    ///         max_pending_connections: 10000,
    ///         ..ServerLimits::default()
    ///     })
    ///     .build();
    /// # }
    /// ```
    #[inline(always)]
    pub fn server_limits(mut self, limits: ServerLimits) -> Self {
        self.server_limits = Some(limits);
        self
    }

    /// Configures request size limits.
    #[inline(always)]
    pub fn request_limits(mut self, limits: ReqLimits) -> Self {
        self.request_limits = Some(limits);
        self
    }

    /// Spawns the workers and overflow responders and returns the [`Server`].
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Panics
    ///
    /// Error messages:
    /// - ``The `listener` method must be called to create``
    /// - ``The `dispatcher` method must be called to create``
    #[inline]
    #[track_caller]
    pub fn build(self) -> Server {
        let listener = self
            .listener
            .expect("The `listener` method must be called to create");
        let dispatcher = self
            .dispatcher
            .expect("The `dispatcher` method must be called to create");
        let server_limits = self.server_limits.unwrap_or_default();
        let request_limits = self.request_limits.unwrap_or_default();

        let stream_queue = Arc::new(SegQueue::new());
        let error_queue = Arc::new(SegQueue::new());

        for _ in 0..server_limits.max_connections {
            Self::spawn_worker(&stream_queue, &server_limits, &request_limits, &dispatcher);
        }
        if server_limits.count_503_handlers != 0 {
            for _ in 0..server_limits.count_503_handlers {
                Self::spawn_alarmist(&error_queue, &server_limits);
            }
        } else {
            Self::spawn_quiet_alarmist(&error_queue, &server_limits);
        }

        Server {
            listener,
            stream_queue,
            error_queue,
            server_limits,
        }
    }

    #[inline]
    fn spawn_worker(queue: &TcpQueue, limits: &ServerLimits, req_limits: &ReqLimits, dispatcher: &Arc<Dispatcher>) {
        let queue = queue.clone();
        let wait = limits.wait_strategy.clone();
        let mut conn = HttpConnection::new(dispatcher.clone(), req_limits.clone());

        tokio::spawn(async move {
            loop {
                let (mut stream, addr) = Server::get_stream(&queue, &wait).await;

                if let Err(err) = conn.run(&mut stream).await {
                    warn!(client = %addr, %err, "connection failed");
                }
            }
        });
    }

    #[inline]
    fn spawn_alarmist(queue: &TcpQueue, limits: &ServerLimits) {
        let queue = queue.clone();
        let wait = limits.wait_strategy.clone();
        let busy = Response::new(StatusCode::ServiceUnavailable).serialize();

        tokio::spawn(async move {
            loop {
                let (mut stream, _) = Server::get_stream(&queue, &wait).await;

                let _ = stream.write_all(&busy).await;
                let _ = stream.shutdown().await;
            }
        });
    }

    #[inline]
    fn spawn_quiet_alarmist(queue: &TcpQueue, limits: &ServerLimits) {
        let queue = queue.clone();
        let wait = limits.wait_strategy.clone();

        tokio::spawn(async move {
            loop {
                let (stream, _) = Server::get_stream(&queue, &wait).await;

                drop(stream);
            }
        });
    }
}

type TcpQueue = Arc<SegQueue<(TcpStream, SocketAddr)>>;
