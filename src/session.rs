//! Cookie-correlated server-side sessions.

use crate::{http::cookie::SESSION_COOKIE, Request};
use std::{
    any::Any,
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use uuid::Uuid;

type Attributes = HashMap<String, Arc<dyn Any + Send + Sync>>;

/// Registry of live sessions, keyed by session id.
///
/// Created once at startup and shared through [`Arc`] with every
/// [`Controller`](crate::Controller) that needs it. One mutex guards the whole
/// map, so each operation is atomic with respect to the others. Sessions
/// never expire on their own; call [`remove`](SessionStore::remove) or
/// [`remove_all`](SessionStore::remove_all).
///
/// # Examples
/// ```
/// use coyote::SessionStore;
///
/// let store = SessionStore::new();
/// let session = store.create();
/// session.set_attribute("user", String::from("gugu"));
///
/// let found = store.find(session.id()).unwrap();
/// assert_eq!(found.attribute::<String>("user").as_deref().map(String::as_str), Some("gugu"));
///
/// store.remove_all();
/// assert_eq!(store.size(), 0);
/// ```
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new empty session under a fresh random id.
    pub fn create(&self) -> Session {
        let session = Session::new(Uuid::new_v4().to_string());
        self.lock()
            .insert(session.id.to_string(), session.clone());

        tracing::debug!(id = %session.id, "session created");
        session
    }

    pub fn find(&self, id: &str) -> Option<Session> {
        self.lock().get(id).cloned()
    }

    /// Looks up the session named by the request's `JSESSIONID` cookie.
    pub fn resolve(&self, request: &Request) -> Option<Session> {
        self.find(request.session_id()?)
    }

    pub fn remove(&self, id: &str) -> Option<Session> {
        self.lock().remove(id)
    }

    pub fn remove_all(&self) {
        self.lock().clear();
    }

    pub fn size(&self) -> usize {
        self.lock().len()
    }

    // A panic elsewhere cannot leave the map half-updated: every critical
    // section is a single map call.
    #[inline]
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to one session's attribute bag.
///
/// Clones share the same bag, so attributes set through any handle are
/// visible through all of them.
#[derive(Clone)]
pub struct Session {
    id: Arc<str>,
    attributes: Arc<Mutex<Attributes>>,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            id: id.into(),
            attributes: Arc::default(),
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_attribute<T: Any + Send + Sync>(&self, name: &str, value: T) {
        self.lock().insert(name.to_string(), Arc::new(value));
    }

    /// Returns the attribute if present and of type `T`.
    pub fn attribute<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let value = self.lock().get(name)?.clone();
        value.downcast::<T>().ok()
    }

    pub fn remove_attribute(&self, name: &str) -> bool {
        self.lock().remove(name).is_some()
    }

    /// `Set-Cookie` value binding the client to this session.
    ///
    /// # Examples
    /// ```
    /// let session = coyote::SessionStore::new().create();
    /// assert_eq!(session.set_cookie_value(), format!("JSESSIONID={}", session.id()));
    /// ```
    pub fn set_cookie_value(&self) -> String {
        format!("{SESSION_COOKIE}={}", self.id)
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, Attributes> {
        self.attributes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("attributes", &self.lock().len())
            .finish()
    }
}
