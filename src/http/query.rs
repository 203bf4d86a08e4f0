//! URL query string and form body parser.

use memchr::memchr;
use std::collections::{hash_map, HashMap};
use thiserror::Error;

/// `name=value` parameters of a query string.
///
/// Names are unique: when a name repeats, the last occurrence wins. The same
/// parser reads `application/x-www-form-urlencoded` bodies, but **values are
/// kept raw** (`%40` stays `%40`).
///
/// # Examples
/// ```rust
/// use coyote::query::Query;
///
/// let query = Query::parse("?name=john&age=25&name=jane").unwrap();
///
/// assert_eq!(query.len(), 2);
/// assert_eq!(query.find("name"), Some("jane"));
/// assert_eq!(query.find("age"), Some("25"));
/// assert_eq!(query.find("city"), None);
/// ```
/// Tokens without `=` are rejected:
/// ```rust
/// use coyote::query::{Error, Query};
///
/// assert_eq!(
///     Query::parse("a=1&debug"),
///     Err(Error::MalformedParameter("debug".to_string()))
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: HashMap<String, String>,
}

impl Query {
    /// Parses a query string (the optional leading `?` is skipped).
    ///
    /// Empty input gives an empty [`Query`]. Empty tokens, as produced by
    /// `a=1&&b=2` or a trailing `&`, are skipped. Each remaining token is
    /// split on its first `=`, so `k=a=b` maps `k` to `a=b`.
    ///
    /// # Errors
    /// [`Error::MalformedParameter`] with the offending token when a token
    /// has no `=`.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let data = raw.strip_prefix('?').unwrap_or(raw);
        let mut params = HashMap::new();

        // Split points are ASCII bytes, so byte offsets are char boundaries.
        let mut start = 0;
        while start < data.len() {
            let end = memchr(b'&', &data.as_bytes()[start..])
                .map(|pos| start + pos)
                .unwrap_or(data.len());

            let token = &data[start..end];
            if !token.is_empty() {
                let split = memchr(b'=', token.as_bytes())
                    .ok_or_else(|| Error::MalformedParameter(token.to_string()))?;

                params.insert(token[..split].to_string(), token[split + 1..].to_string());
            }

            start = end + 1;
        }

        Ok(Query { params })
    }

    /// Returns the value of `name`.
    ///
    /// `None` means the parameter is absent, which is different from
    /// `Some("")` for `name=`.
    #[inline]
    pub fn find(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterates over all parameters in arbitrary order.
    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        Iter(self.params.iter())
    }
}

/// Iterator over `(name, value)` pairs of a [`Query`].
pub struct Iter<'a>(hash_map::Iter<'a, String, String>);

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a str);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Errors produced while parsing a query string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A `&`-separated token had no `=`; carries the token.
    #[error("query parameter `{0}` has no `=value` part")]
    MalformedParameter(String),
}
