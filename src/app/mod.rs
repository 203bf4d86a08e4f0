//! Reference application: welcome page, login, registration and error pages
//! on top of the core.
//!
//! # Examples
//! ```no_run
//! use coyote::{app, Resources, SessionStore};
//! use std::sync::Arc;
//!
//! let dispatcher = app::dispatcher(
//!     Resources::new("static"),
//!     Arc::new(SessionStore::new()),
//!     Arc::new(app::UserStore::seeded()),
//! );
//! ```

mod controllers;
mod error_pages;
mod users;

pub use self::{
    controllers::{LoginController, RegisterController, WelcomeController, USER_ATTRIBUTE},
    error_pages::ErrorPage,
    users::{User, UserStore},
};

use crate::{Dispatcher, Resources, SessionStore, StaticResourceController};
use std::sync::Arc;

/// Route table of the reference application.
///
/// Controllers in match order: welcome, login, register, static files.
/// Exception handlers: 400, 401, 404, 405, 500.
pub fn dispatcher(resources: Resources, sessions: Arc<SessionStore>, users: Arc<UserStore>) -> Dispatcher {
    Dispatcher::builder()
        .controller(WelcomeController)
        .controller(LoginController::new(resources.clone(), sessions, Arc::clone(&users)))
        .controller(RegisterController::new(resources.clone(), users))
        .controller(StaticResourceController::new(resources.clone()))
        .exception_handler(ErrorPage::bad_request())
        .exception_handler(ErrorPage::unauthorized(resources.clone()))
        .exception_handler(ErrorPage::not_found(resources.clone()))
        .exception_handler(ErrorPage::method_not_allowed())
        .exception_handler(ErrorPage::internal(resources))
        .build()
}
