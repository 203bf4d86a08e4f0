use crate::{errors::Condition, ExceptionHandler, Resources, Response, StatusCode};

/// Maps one kind of [`Condition`] to its status, optionally with an HTML page.
///
/// A page that cannot be loaded degrades to an empty body with the same status.
#[derive(Clone)]
pub struct ErrorPage {
    matches: fn(&Condition) -> bool,
    status: StatusCode,
    page: Option<(Resources, &'static str)>,
}

impl ErrorPage {
    /// `400` for unparsable requests and queries, no body.
    pub fn bad_request() -> Self {
        Self {
            matches: |c| matches!(c, Condition::MalformedRequest(_) | Condition::MalformedQuery(_)),
            status: StatusCode::BadRequest,
            page: None,
        }
    }

    /// `401` with `401.html`.
    pub fn unauthorized(resources: Resources) -> Self {
        Self {
            matches: |c| matches!(c, Condition::Unauthorized(_)),
            status: StatusCode::Unauthorized,
            page: Some((resources, "/401.html")),
        }
    }

    /// `404` with `404.html`.
    pub fn not_found(resources: Resources) -> Self {
        Self {
            matches: |c| matches!(c, Condition::NotFound(_)),
            status: StatusCode::NotFound,
            page: Some((resources, "/404.html")),
        }
    }

    /// `405`, no body.
    pub fn method_not_allowed() -> Self {
        Self {
            matches: |c| matches!(c, Condition::MethodNotAllowed { .. }),
            status: StatusCode::MethodNotAllowed,
            page: None,
        }
    }

    /// `500` with `500.html`.
    pub fn internal(resources: Resources) -> Self {
        Self {
            matches: |c| matches!(c, Condition::Internal(_)),
            status: StatusCode::InternalServerError,
            page: Some((resources, "/500.html")),
        }
    }
}

impl std::fmt::Debug for ErrorPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorPage")
            .field("status", &self.status)
            .field("page", &self.page.as_ref().map(|(_, page)| page))
            .finish()
    }
}

impl ExceptionHandler for ErrorPage {
    fn supports(&self, condition: &Condition) -> bool {
        (self.matches)(condition)
    }

    fn handle(&self, _: &Condition) -> Response {
        let Some((resources, page)) = &self.page else {
            return Response::new(self.status);
        };

        resources.page(self.status, page).unwrap_or_else(|err| {
            tracing::warn!(page, %err, "error page missing");
            Response::new(self.status)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::MalformedRequest, resources::tests::fixtures, Method};

    #[test]
    fn each_page_claims_one_kind() {
        #[rustfmt::skip]
        let pages = [
            (ErrorPage::bad_request(),          StatusCode::BadRequest,          false),
            (ErrorPage::unauthorized(fixtures()), StatusCode::Unauthorized,      true),
            (ErrorPage::not_found(fixtures()),  StatusCode::NotFound,            true),
            (ErrorPage::method_not_allowed(),   StatusCode::MethodNotAllowed,    false),
            (ErrorPage::internal(fixtures()),   StatusCode::InternalServerError, true),
        ];

        #[rustfmt::skip]
        let conditions = [
            Condition::MalformedRequest(MalformedRequest::IncompleteHead),
            Condition::Unauthorized("bad password".into()),
            Condition::NotFound("/x".into()),
            Condition::MethodNotAllowed { method: Method::Put, path: "/login".into() },
            Condition::Internal("duplicate".into()),
        ];

        for (i, (page, status, has_body)) in pages.iter().enumerate() {
            for (j, condition) in conditions.iter().enumerate() {
                assert_eq!(page.supports(condition), i == j, "{status} / {condition}");
            }

            let resp = page.handle(&conditions[i]);
            assert_eq!(resp.status(), *status);
            assert_eq!(resp.body_bytes().is_some(), *has_body, "{status}");
        }
    }

    #[test]
    fn missing_page_degrades_to_status() {
        let page = ErrorPage::not_found(Resources::new("/nonexistent-root"));
        let resp = page.handle(&Condition::NotFound("/".into()));

        assert_eq!(resp.status(), StatusCode::NotFound);
        assert_eq!(resp.body_bytes(), None);
    }
}
