//! Error types for wsman.
//!
//! Every failure a WS-Management exchange can produce is represented here so
//! callers can tell whether to re-authenticate, re-issue, or abort.

use std::time::Duration;
use thiserror::Error;

use crate::auth::AuthError;
use crate::message::Message;
use crate::soap::Fault;
use crate::xml::Element;

/// Result type alias for wsman operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller supplied malformed input.
    Argument,
    /// Digest/Basic authentication could not be performed.
    Auth,
    /// Network failure or non-2xx HTTP status.
    Transport,
    /// Unexpected envelope shape or undecodable response.
    Protocol,
    /// The server answered with a SOAP Fault.
    Fault,
}

/// The main error type for wsman.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Caller Errors
    // ========================================================================
    /// Malformed input such as an odd-length name/value list.
    #[error("Invalid argument: {0}")]
    Argument(String),

    // ========================================================================
    // Authentication Errors
    // ========================================================================
    /// Authentication could not be performed.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// The HTTP request could not be completed (DNS, connect, TLS, read).
    #[error("Request to '{endpoint}' failed: {message}")]
    Transport {
        /// Target endpoint
        endpoint: String,
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The endpoint answered with an error status.
    #[error("'{endpoint}' answered HTTP {status}: {body}")]
    HttpStatus {
        /// Target endpoint
        endpoint: String,
        /// Numeric HTTP status
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// The whole exchange took longer than the configured timeout.
    #[error("Request to '{endpoint}' timed out after {timeout:?}")]
    Timeout {
        /// Target endpoint
        endpoint: String,
        /// Configured timeout
        timeout: Duration,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// The envelope did not have the expected shape.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The payload was not well-formed XML.
    #[error("Malformed XML: {0}")]
    Xml(String),

    /// The server returned a SOAP Fault.
    #[error("SOAP fault: {fault}")]
    Fault {
        /// Decoded fault
        fault: Fault,
        /// Full response carrying the fault
        response: Box<Message>,
    },

    /// An enumeration failed part way through. The items pulled before the
    /// failure are kept for diagnostics.
    #[error("Enumeration aborted after {} item(s): {source}", items.len())]
    Enumeration {
        /// Items accumulated before the failure
        items: Vec<Element>,
        /// The failure that stopped the enumeration
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Creates a new argument error.
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }

    /// Creates a new protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Creates a new transport error from a reqwest failure.
    pub fn transport(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Classifies this error. A partial enumeration reports the kind of the
    /// failure that interrupted it.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Argument(_) => ErrorKind::Argument,
            Error::Auth(_) => ErrorKind::Auth,
            Error::Transport { .. } | Error::HttpStatus { .. } | Error::Timeout { .. } => {
                ErrorKind::Transport
            }
            Error::Protocol(_) | Error::Xml(_) => ErrorKind::Protocol,
            Error::Fault { .. } => ErrorKind::Fault,
            Error::Enumeration { source, .. } => source.kind(),
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            Error::Enumeration { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Items pulled before an enumeration failed.
    pub fn partial_items(&self) -> Option<&[Element]> {
        match self {
            Error::Enumeration { items, .. } => Some(items),
            _ => None,
        }
    }

    /// The fault response, when the server returned one.
    pub fn fault_response(&self) -> Option<&Message> {
        match self {
            Error::Fault { response, .. } => Some(response),
            Error::Enumeration { source, .. } => source.fault_response(),
            _ => None,
        }
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Fault => 1,
            ErrorKind::Auth | ErrorKind::Transport | ErrorKind::Protocol => 2,
            ErrorKind::Argument => 3,
        }
    }
}
