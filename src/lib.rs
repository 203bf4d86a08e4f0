//! coyote - minimal HTTP/1.1 server core with first-match routing and
//! cookie sessions
//!
//! Every accepted connection carries exactly one request, processed as
//! raw bytes -> [`Request`] -> [`Dispatcher`] -> [`Response`] -> close.
//!
//! # Pipeline
//!
//! - **Parsing**: request line, headers, `Content-Length` body and query
//!   string, with size limits from [`limits::ReqLimits`]
//! - **Routing**: the first [`Controller`] whose `supports` accepts the
//!   request handles it; failures become a [`Condition`] for the first
//!   matching [`ExceptionHandler`]
//! - **Sessions**: a shared [`SessionStore`] correlated with clients through
//!   the `JSESSIONID` cookie
//! - **Serialization**: `HTTP/1.1` status line, headers in insertion order,
//!   computed `Content-Length`, body
//!
//! # Examples
//!
//! ```no_run
//! use coyote::{Condition, Controller, Dispatcher, Method, Request, Response, Server, StatusCode};
//! use tokio::net::TcpListener;
//!
//! struct Echo;
//!
//! impl Controller for Echo {
//!     fn supports(&self, request: &Request) -> bool {
//!         request.method() == Method::Get && request.path() == "/echo"
//!     }
//!
//!     fn handle(&self, request: &Request) -> Result<Response, Condition> {
//!         let text = request.query().find("text").unwrap_or_default();
//!         Ok(Response::new(StatusCode::Ok).body(text))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     Server::builder()
//!         .listener(TcpListener::bind("127.0.0.1:8080").await.unwrap())
//!         .dispatcher(Dispatcher::builder().controller(Echo).build())
//!         .build()
//!         .launch()
//!         .await;
//! }
//! ```
//!
//! The [`app`] module is a complete application (welcome page, login,
//! registration, static files and error pages) built on the same API.

pub(crate) mod http {
    pub(crate) mod cookie;
    pub mod query;
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod types;
}
pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod server_impl;
}
pub mod app;
pub(crate) mod errors;
pub mod limits;
pub mod resources;
pub(crate) mod routing;
pub(crate) mod session;

pub use crate::{
    errors::{Condition, MalformedRequest},
    http::{
        cookie::{Cookies, SESSION_COOKIE},
        query,
        request::Request,
        response::{write::WriteBuffer, Response},
        types::{HeaderMap, Method, StatusCode, Version},
    },
    resources::{Resources, StaticResourceController},
    routing::{Controller, Dispatcher, DispatcherBuilder, ExceptionHandler, Outcome},
    server::server_impl::{Server, ServerBuilder},
    session::{Session, SessionStore},
};
