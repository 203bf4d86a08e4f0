use super::users::{User, UserStore};
use crate::{
    errors::{Condition, MalformedRequest},
    query::Query,
    Controller, Method, Request, Resources, Response, SessionStore, StatusCode,
};
use std::sync::Arc;

const HOME: &str = "/index.html";

/// Session attribute holding the signed-in [`User`].
pub const USER_ATTRIBUTE: &str = "user";

/// `GET /` greeting.
#[derive(Debug, Default)]
pub struct WelcomeController;

impl Controller for WelcomeController {
    fn supports(&self, request: &Request) -> bool {
        request.method() == Method::Get && request.path() == "/"
    }

    fn handle(&self, _: &Request) -> Result<Response, Condition> {
        Ok(Response::new(StatusCode::Ok)
            .header("Content-Type", "text/html;charset=utf-8")
            .body("Hello world!"))
    }
}

/// `/login`: the login page and form submission.
///
/// A successful login opens a session holding the [`User`] and redirects home
/// with `Set-Cookie: JSESSIONID=<id>`. Requests already carrying a live
/// session are redirected home right away.
#[derive(Debug)]
pub struct LoginController {
    resources: Resources,
    sessions: Arc<SessionStore>,
    users: Arc<UserStore>,
}

impl LoginController {
    pub fn new(resources: Resources, sessions: Arc<SessionStore>, users: Arc<UserStore>) -> Self {
        Self {
            resources,
            sessions,
            users,
        }
    }

    fn login(&self, request: &Request) -> Result<Response, Condition> {
        let form = form(request)?;
        let account = form.find("account").unwrap_or_default();
        let password = form.find("password").unwrap_or_default();

        let user = self
            .users
            .find_by_account(account)
            .filter(|user| user.check_password(password))
            .ok_or_else(|| Condition::Unauthorized(format!("login failed for `{account}`")))?;

        let session = self.sessions.create();
        session.set_attribute(USER_ATTRIBUTE, user);

        Ok(Response::redirect(HOME).header("Set-Cookie", session.set_cookie_value()))
    }

    fn signed_in(&self, request: &Request) -> bool {
        self.sessions
            .resolve(request)
            .is_some_and(|session| session.attribute::<User>(USER_ATTRIBUTE).is_some())
    }
}

impl Controller for LoginController {
    fn supports(&self, request: &Request) -> bool {
        request.path() == "/login"
    }

    fn handle(&self, request: &Request) -> Result<Response, Condition> {
        match request.method() {
            Method::Get | Method::Post if self.signed_in(request) => Ok(Response::redirect(HOME)),
            Method::Get => self.resources.page(StatusCode::Ok, "/login.html"),
            Method::Post => self.login(request),
            method => Err(not_allowed(method, request)),
        }
    }
}

/// `/register`: the sign-up page and form submission.
#[derive(Debug)]
pub struct RegisterController {
    resources: Resources,
    users: Arc<UserStore>,
}

impl RegisterController {
    pub fn new(resources: Resources, users: Arc<UserStore>) -> Self {
        Self { resources, users }
    }
}

impl Controller for RegisterController {
    fn supports(&self, request: &Request) -> bool {
        request.path() == "/register"
    }

    fn handle(&self, request: &Request) -> Result<Response, Condition> {
        match request.method() {
            Method::Get => self.resources.page(StatusCode::Ok, "/register.html"),
            Method::Post => {
                let form = form(request)?;
                self.users.register(
                    form.find("account").unwrap_or_default(),
                    form.find("password").unwrap_or_default(),
                    form.find("email").unwrap_or_default(),
                )?;
                Ok(Response::redirect(HOME))
            }
            method => Err(not_allowed(method, request)),
        }
    }
}

// `application/x-www-form-urlencoded` body, values kept undecoded.
fn form(request: &Request) -> Result<Query, Condition> {
    let body = request.body().unwrap_or_default();
    let body = simdutf8::basic::from_utf8(body).map_err(|_| MalformedRequest::InvalidEncoding)?;

    Ok(Query::parse(body)?)
}

fn not_allowed(method: Method, request: &Request) -> Condition {
    Condition::MethodNotAllowed {
        method,
        path: request.path().to_string(),
    }
}
