//! Collaborator error types

use std::fmt;
use thiserror::Error;

/// Which external collaborator failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Nlu,
    Directory,
    Templating,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Service::Nlu => "the language service",
            Service::Directory => "the directory",
            Service::Templating => "the card renderer",
        };
        f.write_str(name)
    }
}

/// Error classification for collaborator failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollaboratorErrorKind {
    /// Credential rejected (401, 403)
    Auth,
    /// Network issues, timeouts, 5xx
    Unavailable,
    /// Card template could not be rendered
    Rendering,
    /// Response did not have the expected shape
    InvalidResponse,
}

/// Collaborator error with classification
#[derive(Debug, Clone, Error)]
#[error("{service} failed: {message}")]
pub struct CollaboratorError {
    pub service: Service,
    pub kind: CollaboratorErrorKind,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(service: Service, kind: CollaboratorErrorKind, message: impl Into<String>) -> Self {
        Self {
            service,
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(service: Service, message: impl Into<String>) -> Self {
        Self::new(service, CollaboratorErrorKind::Unavailable, message)
    }

    pub fn rendering(message: impl Into<String>) -> Self {
        Self::new(Service::Templating, CollaboratorErrorKind::Rendering, message)
    }

    pub fn invalid_response(service: Service, message: impl Into<String>) -> Self {
        Self::new(service, CollaboratorErrorKind::InvalidResponse, message)
    }

    /// Classify an HTTP failure status
    pub fn from_status(service: Service, status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => CollaboratorErrorKind::Auth,
            400..=499 => CollaboratorErrorKind::InvalidResponse,
            _ => CollaboratorErrorKind::Unavailable,
        };
        Self::new(service, kind, format!("HTTP {status}: {body}"))
    }

    /// Message shown to the user when this error ends a dialog
    pub fn user_message(&self) -> String {
        match self.kind {
            CollaboratorErrorKind::Auth => format!(
                "Sorry, {} refused the request. You may not have the rights to do this.",
                self.service
            ),
            _ => format!(
                "Sorry, something went wrong while talking to {}. Please try again later.",
                self.service
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let e = CollaboratorError::from_status(Service::Directory, 403, "forbidden");
        assert_eq!(e.kind, CollaboratorErrorKind::Auth);
        let e = CollaboratorError::from_status(Service::Directory, 404, "missing");
        assert_eq!(e.kind, CollaboratorErrorKind::InvalidResponse);
        let e = CollaboratorError::from_status(Service::Nlu, 503, "down");
        assert_eq!(e.kind, CollaboratorErrorKind::Unavailable);
    }

    #[test]
    fn test_user_message_names_service() {
        let e = CollaboratorError::unavailable(Service::Directory, "timeout");
        assert!(e.user_message().contains("the directory"));
    }
}
