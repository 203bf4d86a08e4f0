//! First-match dispatch of requests to controllers and of failures to
//! exception handlers.

use crate::{errors::Condition, Request, Response};
use std::fmt;
use tracing::{debug, warn};

/// Produces a [`Response`] for the requests it claims.
///
/// # Examples
/// ```
/// use coyote::{Condition, Controller, Method, Request, Response, StatusCode};
///
/// struct Ping;
///
/// impl Controller for Ping {
///     fn supports(&self, request: &Request) -> bool {
///         request.path() == "/ping"
///     }
///
///     fn handle(&self, request: &Request) -> Result<Response, Condition> {
///         match request.method() {
///             Method::Get => Ok(Response::new(StatusCode::Ok).body("pong")),
///             method => Err(Condition::MethodNotAllowed {
///                 method,
///                 path: request.path().to_string(),
///             }),
///         }
///     }
/// }
/// ```
pub trait Controller
where
    Self: Send + Sync + 'static,
{
    /// Whether this controller takes the request. Must not have side effects.
    fn supports(&self, request: &Request) -> bool;

    /// Handles a request previously accepted by [`supports`](Controller::supports).
    ///
    /// # Errors
    ///
    /// The returned [`Condition`] is passed to the [`ExceptionHandler`] chain.
    fn handle(&self, request: &Request) -> Result<Response, Condition>;
}

/// Turns a failure [`Condition`] into a [`Response`].
pub trait ExceptionHandler
where
    Self: Send + Sync + 'static,
{
    fn supports(&self, condition: &Condition) -> bool;

    fn handle(&self, condition: &Condition) -> Response;
}

/// Result of [`Dispatcher::dispatch`].
#[derive(Debug)]
pub enum Outcome {
    /// A controller or an exception handler produced a response.
    Response(Response),
    /// No exception handler accepted the failure.
    Unhandled(Condition),
}

/// Ordered route table: controllers first, exception handlers as fallback.
///
/// Read-only once built, so it can be shared between workers behind an
/// [`Arc`](std::sync::Arc).
///
/// # Examples
/// ```
/// use coyote::{Condition, Dispatcher, ExceptionHandler, Outcome, Request, Response, StatusCode};
///
/// struct NotFound;
///
/// impl ExceptionHandler for NotFound {
///     fn supports(&self, condition: &Condition) -> bool {
///         matches!(condition, Condition::NotFound(_))
///     }
///
///     fn handle(&self, _: &Condition) -> Response {
///         Response::new(StatusCode::NotFound).body("nothing here")
///     }
/// }
///
/// let dispatcher = Dispatcher::builder().exception_handler(NotFound).build();
/// let request = Request::parse(b"GET /missing HTTP/1.1\r\n\r\n").unwrap();
///
/// let Outcome::Response(resp) = dispatcher.dispatch(&request) else {
///     panic!("NotFound is handled");
/// };
/// assert_eq!(resp.status(), StatusCode::NotFound);
/// ```
pub struct Dispatcher {
    controllers: Vec<Box<dyn Controller>>,
    exception_handlers: Vec<Box<dyn ExceptionHandler>>,
}

impl Dispatcher {
    #[inline]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder {
            controllers: Vec::new(),
            exception_handlers: Vec::new(),
        }
    }

    /// Invokes the first controller that supports the request.
    ///
    /// # Errors
    ///
    /// [`Condition::NotFound`] when no controller supports the request,
    /// otherwise whatever the chosen controller returned.
    pub fn route(&self, request: &Request) -> Result<Response, Condition> {
        let controller = self
            .controllers
            .iter()
            .position(|c| c.supports(request))
            .ok_or_else(|| Condition::NotFound(request.path().to_string()))?;

        debug!(
            method = %request.method(),
            path = request.path(),
            controller,
            "routing request"
        );
        self.controllers[controller].handle(request)
    }

    /// Asks the first exception handler that supports `condition` for a response.
    pub fn recover(&self, condition: &Condition) -> Option<Response> {
        let handler = self
            .exception_handlers
            .iter()
            .find(|h| h.supports(condition))?;

        warn!(%condition, status = condition.status().as_u16(), "request failed");
        Some(handler.handle(condition))
    }

    /// Routes `request`, falling back to [`recover`](Self::recover) on failure.
    pub fn dispatch(&self, request: &Request) -> Outcome {
        match self.route(request) {
            Ok(response) => Outcome::Response(response),
            Err(condition) => self.fail(condition),
        }
    }

    /// Resolves a failure that happened outside a controller, such as a parse error.
    pub fn fail(&self, condition: Condition) -> Outcome {
        match self.recover(&condition) {
            Some(response) => Outcome::Response(response),
            None => Outcome::Unhandled(condition),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("controllers", &self.controllers.len())
            .field("exception_handlers", &self.exception_handlers.len())
            .finish()
    }
}

/// Builder for [`Dispatcher`]. Registration order is match order.
pub struct DispatcherBuilder {
    controllers: Vec<Box<dyn Controller>>,
    exception_handlers: Vec<Box<dyn ExceptionHandler>>,
}

impl DispatcherBuilder {
    #[inline(always)]
    pub fn controller<C: Controller>(mut self, controller: C) -> Self {
        self.controllers.push(Box::new(controller));
        self
    }

    #[inline(always)]
    pub fn exception_handler<E: ExceptionHandler>(mut self, handler: E) -> Self {
        self.exception_handlers.push(Box::new(handler));
        self
    }

    #[inline]
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            controllers: self.controllers,
            exception_handlers: self.exception_handlers,
        }
    }
}
