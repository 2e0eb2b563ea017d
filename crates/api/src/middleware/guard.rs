//! Request guard: rejects malformed requests before they reach a handler.

use std::borrow::Cow;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::CONTENT_SECURITY_POLICY as CSP_HEADER;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use quill_domain::constants::{
    BLOCK_REASON_BAD_METHOD, BLOCK_REASON_INVALID_CHAR, BLOCK_REASON_URI_LENGTH,
    CONTENT_SECURITY_POLICY, MAX_REQUEST_PATH_LENGTH,
};
use tracing::debug;

use crate::context::AppContext;

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub reason: &'static str,
    pub status: StatusCode,
    pub message: &'static str,
}

impl Rejection {
    const URI_TOO_LONG: Self = Self {
        reason: BLOCK_REASON_URI_LENGTH,
        status: StatusCode::BAD_REQUEST,
        message: "URI too long",
    };
    const BAD_METHOD: Self = Self {
        reason: BLOCK_REASON_BAD_METHOD,
        status: StatusCode::METHOD_NOT_ALLOWED,
        message: "method not allowed",
    };
    const INVALID_CHAR: Self = Self {
        reason: BLOCK_REASON_INVALID_CHAR,
        status: StatusCode::BAD_REQUEST,
        message: "Invalid URL characters",
    };
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (self.status, format!("{}\n", self.message)).into_response()
    }
}

/// Check `method` and the raw request `path` against the guard rules.
///
/// Rules apply in order: decoded path length, method, replacement
/// character (including invalid UTF-8 after decoding), NUL byte.
pub fn inspect_request(method: &Method, path: &str) -> Option<Rejection> {
    let decoded = urlencoding::decode_binary(path.as_bytes());
    let decoded: Cow<'_, str> = String::from_utf8_lossy(&decoded);

    if decoded.len() > MAX_REQUEST_PATH_LENGTH {
        return Some(Rejection::URI_TOO_LONG);
    }
    if method != Method::GET {
        return Some(Rejection::BAD_METHOD);
    }
    if decoded.contains(char::REPLACEMENT_CHARACTER) {
        return Some(Rejection::INVALID_CHAR);
    }
    if decoded.contains('\0') || decoded.contains("%00") {
        return Some(Rejection::INVALID_CHAR);
    }
    None
}

/// Refuse malformed requests and set the content security policy on
/// everything that passes.
pub async fn guard_request(
    State(ctx): State<Arc<AppContext>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(rejection) = inspect_request(request.method(), request.uri().path()) {
        ctx.http.record_blocked(rejection.reason);
        debug!(
            method = %request.method(),
            reason = rejection.reason,
            status = rejection.status.as_u16(),
            "request blocked"
        );
        return rejection.into_response();
    }

    let mut response = next.run(request).await;
    response.headers_mut().insert(CSP_HEADER, HeaderValue::from_static(CONTENT_SECURITY_POLICY));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_get() {
        assert_eq!(inspect_request(&Method::GET, "/article/hello-world"), None);
        assert_eq!(inspect_request(&Method::GET, "/article/caf%C3%A9"), None);
    }

    #[test]
    fn long_path_is_checked_before_method() {
        let path = format!("/{}", "a".repeat(MAX_REQUEST_PATH_LENGTH));
        assert_eq!(inspect_request(&Method::POST, &path), Some(Rejection::URI_TOO_LONG));

        let exact = format!("/{}", "a".repeat(MAX_REQUEST_PATH_LENGTH - 1));
        assert_eq!(inspect_request(&Method::GET, &exact), None);
    }

    #[test]
    fn length_counts_decoded_bytes() {
        let path = format!("/{}", "%61".repeat(MAX_REQUEST_PATH_LENGTH / 2));
        assert_eq!(inspect_request(&Method::GET, &path), None);
    }

    #[test]
    fn non_get_is_refused() {
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            assert_eq!(inspect_request(&method, "/content/"), Some(Rejection::BAD_METHOD));
        }
    }

    #[test]
    fn invalid_characters_are_refused() {
        for path in ["/article/%FF", "/article/%EF%BF%BD", "/article/a%00b", "/article/%2500"] {
            let rejection = inspect_request(&Method::GET, path);
            assert_eq!(rejection, Some(Rejection::INVALID_CHAR), "{path}");
        }
    }

    #[test]
    fn rejection_maps_to_its_status() {
        let response = Rejection::BAD_METHOD.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
