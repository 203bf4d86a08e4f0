//! `Cookie` request header parsing.

use memchr::memchr;
use std::collections::HashMap;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "JSESSIONID";

/// Cookies sent by the client in the `Cookie` header.
///
/// Pairs are separated by `;`, whitespace around them is ignored, and pairs
/// without `=` are dropped. Repeated names keep the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookies {
    values: HashMap<String, String>,
}

impl Cookies {
    pub(crate) fn parse(header: &str) -> Self {
        let values = header
            .split(';')
            .map(str::trim)
            .filter_map(|pair| {
                let split = memchr(b'=', pair.as_bytes())?;
                Some((
                    pair[..split].trim().to_string(),
                    pair[split + 1..].trim().to_string(),
                ))
            })
            .filter(|(name, _)| !name.is_empty())
            .collect();

        Cookies { values }
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
