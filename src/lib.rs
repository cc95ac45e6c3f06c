//! # wsman - A WS-Management Client
//!
//! wsman speaks WS-Management (SOAP 1.2 over HTTP(S)) to out-of-band
//! management controllers and similar endpoints. A caller issues one logical
//! operation against a resource URI and gets one logical result back; the
//! crate takes care of the two parts of the protocol that are tedious to get
//! right by hand:
//!
//! - **Digest authentication**: RFC 2617 (MD5, `qop=auth`) with transparent
//!   reauthorization when the server rotates its nonce
//! - **Enumeration paging**: Enumerate → Pull → ... → EndOfSequence folded
//!   into a single response, with Release on failure
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      Client                               │
//! │   identify / get / put / create / delete / invoke /      │
//! │   enumerate / enumerate_epr / send                       │
//! └──────────────────────────────────────────────────────────┘
//!          │                     │                    │
//!          ▼                     ▼                    ▼
//! ┌─────────────────┐  ┌──────────────────┐  ┌─────────────────┐
//! │     Message     │  │ EnumerationDriver│  │    Transport    │
//! │ (headers, sets, │  │ (Pull loop,      │──▶ (POST, Basic /  │
//! │  parameters)    │  │  Release)        │  │  Digest, retry) │
//! └─────────────────┘  └──────────────────┘  └─────────────────┘
//!          │                                          │
//!          ▼                                          ▼
//! ┌─────────────────────────────┐         ┌────────────────────┐
//! │  soap::Envelope / xml tree  │         │  auth::Challenge   │
//! └─────────────────────────────┘         └────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use wsman::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut client = Client::new("https://10.0.0.12/wsman", "root", "calvin", AuthMode::Digest)?;
//!
//!     let system = client
//!         .get("http://schemas.dmtf.org/wbem/wscim/1/cim-schema/2/CIM_ComputerSystem")
//!         .with_selector("Name", "srv:system")
//!         .send(&mut client)
//!         .await?;
//!     println!("{}", system.to_pretty_xml()?);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types.
    //!
    //! ```rust,ignore
    //! use wsman::prelude::*;
    //! ```

    pub use crate::auth::{AuthError, AuthMode, Credentials};
    pub use crate::client::{Client, ClientBuilder};
    pub use crate::enumeration::EnumerationMode;
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::message::Message;
    pub use crate::soap::{Envelope, Fault};
    pub use crate::xml::Element;
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases for wsman operations.
///
/// [`Error::kind`](error::Error::kind) tells a caller whether to
/// re-authenticate, re-issue, or give up.
pub mod error;

/// Namespace and action URIs.
pub mod namespaces;

/// Namespace-aware XML element tree, parser and serializer.
pub mod xml;

/// SOAP 1.2 envelopes and faults.
pub mod soap;

// ============================================================================
// Protocol
// ============================================================================

/// Basic and Digest authentication.
///
/// The digest [`Challenge`](auth::Challenge) carries a nonce count that
/// must never repeat, so it is owned by exactly one transport.
pub mod auth;

/// HTTP transport with the single digest reauthorization retry.
pub mod transport;

/// WS-Management messages and their builders.
pub mod message;

/// Enumerate/Pull/Release paging.
pub mod enumeration;

/// The client entry point.
pub mod client;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration management for wsman.
///
/// Handles loading and merging configuration from config files and
/// environment variables.
pub mod config;

pub use client::{Client, ClientBuilder};
pub use error::{Error, ErrorKind, Result};
pub use message::Message;

/// Returns the current version of wsman.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
