//! Server configuration limits
//!
//! Plain structs with conservative [`Default`]s, passed to the
//! [`ServerBuilder`](crate::ServerBuilder). Override single fields with
//! struct update syntax.
//!
//! # Examples
//!
//! ```no_run
//! use coyote::{app, limits::{ReqLimits, ServerLimits}, Resources, Server, SessionStore};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let dispatcher = app::dispatcher(
//!         Resources::new("static"),
//!         Arc::new(SessionStore::new()),
//!         Arc::new(app::UserStore::seeded()),
//!     );
//!
//!     Server::builder()
//!         .listener(TcpListener::bind("127.0.0.1:8080").await.unwrap())
//!         .dispatcher(dispatcher)
//!         .server_limits(ServerLimits {
//!             max_connections: 500,
//!             ..ServerLimits::default()
//!         })
//!         .request_limits(ReqLimits {
//!             body_size: 64 * 1024,
//!             ..ReqLimits::default()
//!         })
//!         .build()
//!         .launch()
//!         .await;
//! }
//! ```

use std::time::Duration;

/// Controls worker count, admission queueing and overload behavior.
///
/// # Connection management
/// ```text
///                            [------------]
///                            [ Tcp accept ]
///                            [------------]
///                                  ||
///                                  \/
/// [--------------]   Yes   /----------------\   No   [-------------]
/// [ Add to queue ] <====== | Room in queue? | =====> [ Sending 503 ]
/// [--------------]         \----------------/        [-------------]
///        ||
///        \/
/// [--------]  pop   [-------------------------------------]
/// [ Worker ] =====> [ parse -> dispatch -> write -> close ]
/// [--------]        [-------------------------------------]
/// ```
///
/// Every worker is a long-lived task created once by
/// [`ServerBuilder::build`](crate::ServerBuilder::build). Each connection
/// carries exactly one request: after the response is written the
/// connection is closed and the worker takes the next one.
#[derive(Debug, Clone)]
pub struct ServerLimits {
    /// Number of worker tasks, i.e. connections processed in parallel (default: `100`).
    pub max_connections: usize,

    /// Connections allowed to wait for a free worker (default: `250`).
    ///
    /// Connections accepted while the queue is full are handed to the
    /// overflow responders instead.
    pub max_pending_connections: usize,

    /// How idle workers wait for the queue to fill (default: `Sleep(50μs)`).
    pub wait_strategy: WaitStrategy,

    /// Tasks answering overflow connections with `503 Service Unavailable` (default: `1`).
    ///
    /// With `0` overflow connections are closed without a response.
    pub count_503_handlers: usize,
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            max_connections: 100,
            max_pending_connections: 250,
            wait_strategy: WaitStrategy::Sleep(Duration::from_micros(50)),
            count_503_handlers: 1,
        }
    }
}

/// Strategy for a worker waiting on an empty queue.
#[derive(Debug, Clone)]
pub enum WaitStrategy {
    /// Uses [`tokio::task::yield_now()`]. Lowest latency, burns CPU while idle.
    Yield,

    /// Uses [`tokio::time::sleep()`] for the given duration.
    Sleep(Duration),
}

/// Size limits applied while reading a request.
///
/// Exceeding any of them makes the request malformed, which the
/// [`ExceptionHandler`](crate::ExceptionHandler) chain answers (400 in the
/// reference application).
#[derive(Debug, Clone)]
pub struct ReqLimits {
    /// Maximum bytes of request line plus headers, including the blank line (default: `8 KiB`).
    pub head_size: usize,

    /// Maximum number of header lines (default: `64`).
    pub header_count: usize,

    /// Maximum `Content-Length` accepted (default: `1 MiB`).
    pub body_size: usize,
}

impl Default for ReqLimits {
    fn default() -> Self {
        Self {
            head_size: 8 * 1024,
            header_count: 64,
            body_size: 1024 * 1024,
        }
    }
}
