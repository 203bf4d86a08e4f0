//! Static files served from a directory tree.

use crate::{errors::Condition, Controller, Method, Request, Response, StatusCode};
use std::{
    fs,
    path::{Component, Path, PathBuf},
};

/// Content type used for unknown and missing extensions.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html;charset=utf-8";

/// A directory of static files addressed by request paths.
///
/// A request path maps onto a file below the root; paths that would leave the
/// root (`..` segments) never resolve.
///
/// # Examples
/// ```no_run
/// use coyote::Resources;
///
/// let resources = Resources::new("static");
/// let page = resources.load("/index.html").unwrap();
/// assert!(resources.load("/../Cargo.toml").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Resources {
    root: PathBuf,
}

impl Resources {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps `path` to an existing regular file under the root.
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));

        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }

        let file = self.root.join(relative);
        file.is_file().then_some(file)
    }

    /// Reads the file `path` maps to.
    pub fn load(&self, path: &str) -> Option<Vec<u8>> {
        let file = self.resolve(path)?;

        match fs::read(&file) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                tracing::warn!(file = %file.display(), %err, "static file unreadable");
                None
            }
        }
    }

    /// Response carrying the file `path` maps to with `status`.
    ///
    /// # Errors
    ///
    /// [`Condition::NotFound`] if there is no such file.
    pub fn page(&self, status: StatusCode, path: &str) -> Result<Response, Condition> {
        let body = self
            .load(path)
            .ok_or_else(|| Condition::NotFound(path.to_string()))?;

        Ok(Response::new(status)
            .header("Content-Type", content_type(path))
            .body(body))
    }
}

/// Content type for a file name, chosen by extension.
///
/// # Examples
/// ```
/// use coyote::resources::content_type;
///
/// assert_eq!(content_type("/css/styles.css"), "text/css;charset=utf-8");
/// assert_eq!(content_type("/README"), "text/html;charset=utf-8");
/// ```
pub fn content_type(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    match extension.to_ascii_lowercase().as_str() {
        "css" => "text/css;charset=utf-8",
        "js" => "application/javascript;charset=utf-8",
        "ico" => "image/x-icon",
        "svg" => "image/svg+xml",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// [`Controller`] answering `GET`/`HEAD` for every file under [`Resources`].
///
/// `HEAD` gets the same status and `Content-Type` without a body.
#[derive(Debug, Clone)]
pub struct StaticResourceController {
    resources: Resources,
}

impl StaticResourceController {
    pub fn new(resources: Resources) -> Self {
        Self { resources }
    }
}

impl Controller for StaticResourceController {
    fn supports(&self, request: &Request) -> bool {
        matches!(request.method(), Method::Get | Method::Head)
            && self.resources.resolve(request.path()).is_some()
    }

    fn handle(&self, request: &Request) -> Result<Response, Condition> {
        let response = self.resources.page(StatusCode::Ok, request.path())?;

        Ok(match request.method() {
            Method::Head => Response::new(StatusCode::Ok)
                .header("Content-Type", content_type(request.path())),
            _ => response,
        })
    }
}
