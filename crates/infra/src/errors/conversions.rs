//! Conversions from external infrastructure errors into domain errors.

use quill_domain::QuillError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub QuillError);

impl From<InfraError> for QuillError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<QuillError> for InfraError {
    fn from(value: QuillError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoQuillError {
    fn into_quill(self) -> QuillError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → QuillError */
/* -------------------------------------------------------------------------- */

impl IntoQuillError for HttpError {
    fn into_quill(self) -> QuillError {
        if self.is_timeout() {
            return QuillError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return QuillError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => QuillError::Config(format!("credentials rejected: {message}")),
                404 => QuillError::NotFound(message),
                400..=499 if code != 429 => QuillError::InvalidInput(message),
                _ => QuillError::Network(message),
            };
        }

        if self.is_decode() {
            return QuillError::InvalidInput(format!("HTTP response body invalid: {self}"));
        }

        QuillError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_quill())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → QuillError */
/* -------------------------------------------------------------------------- */

impl IntoQuillError for std::io::Error {
    fn into_quill(self) -> QuillError {
        match self.kind() {
            std::io::ErrorKind::NotFound => QuillError::NotFound(self.to_string()),
            _ => QuillError::Io(self.to_string()),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_quill())
    }
}

/* -------------------------------------------------------------------------- */
/* config parse errors → QuillError */
/* -------------------------------------------------------------------------- */

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(QuillError::Config(format!("Invalid TOML format: {value}")))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(QuillError::Config(format!("Invalid JSON format: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
