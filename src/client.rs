//! WS-Management client.
//!
//! [`Client`] is the entry point: it owns the [`Transport`] (and with it the
//! digest challenge) for one endpoint and exposes the WS-Management
//! operations.
//!
//! # Example
//!
//! ```rust,ignore
//! use wsman::prelude::*;
//!
//! let mut client = ClientBuilder::new("https://10.0.0.12/wsman")
//!     .credentials("root", "calvin")
//!     .auth(AuthMode::Digest)
//!     .build()?;
//!
//! let nics = client
//!     .enumerate("http://schemas.dell.com/wbem/wscim/1/cim-schema/2/DCIM_NICView")
//!     .await?;
//! for nic in nics.items().map(|i| i.children()).unwrap_or_default() {
//!     println!("{}", nic.name());
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::auth::{AuthMode, Credentials};
use crate::enumeration::{self, EnumerationDriver, EnumerationMode, DEFAULT_MAX_PAGES};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::namespaces::action;
use crate::transport::{self, Transport, TransportConfig};

/// A WS-Management client bound to one endpoint.
///
/// Operations that touch the network take `&mut self`: the digest nonce
/// count is per-client state, so one client serves one request at a time.
/// Use one client per concurrent session.
#[derive(Debug)]
pub struct Client {
    transport: Transport,
    optimize_enumeration: bool,
    driver: EnumerationDriver,
}

impl Client {
    /// Create a client with default settings.
    ///
    /// Empty `username` or `password` means requests are sent without
    /// credentials (Digest mode then fails with `MissingCredentials`).
    pub fn new(endpoint: &str, username: &str, password: &str, auth: AuthMode) -> Result<Self> {
        ClientBuilder::new(endpoint)
            .credentials(username, password)
            .auth(auth)
            .build()
    }

    /// Start a [`ClientBuilder`].
    pub fn builder(endpoint: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(endpoint)
    }

    /// Endpoint URL.
    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    /// Authentication scheme.
    pub fn auth_mode(&self) -> AuthMode {
        self.transport.auth_mode()
    }

    /// Whether `Enumerate` asks for items in the first response.
    pub fn optimize_enumeration(&self) -> bool {
        self.optimize_enumeration
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// A request for an arbitrary action URI.
    pub fn new_message(&self, action: &str) -> Message {
        Message::new(action, self.endpoint())
    }

    /// A `Get` of the instance at `resource`; add selectors before sending.
    pub fn get(&self, resource: &str) -> Message {
        self.new_message(action::GET).with_resource_uri(resource)
    }

    /// A `Put` replacing the instance at `resource`.
    pub fn put(&self, resource: &str) -> Message {
        self.new_message(action::PUT).with_resource_uri(resource)
    }

    /// A `Create` of a new instance of `resource`.
    pub fn create(&self, resource: &str) -> Message {
        self.new_message(action::CREATE).with_resource_uri(resource)
    }

    /// A `Delete` of the instance at `resource`.
    pub fn delete(&self, resource: &str) -> Message {
        self.new_message(action::DELETE).with_resource_uri(resource)
    }

    /// An invocation of `method` on `resource` (action `<resource>/<method>`).
    pub fn invoke(&self, resource: &str, method: &str) -> Message {
        self.new_message(&format!("{resource}/{method}"))
            .with_resource_uri(resource)
    }

    /// Send a request and return the response.
    ///
    /// A response carrying a SOAP Fault is returned as [`Error::Fault`].
    pub async fn send(&mut self, message: &Message) -> Result<Message> {
        debug!(
            endpoint = %self.endpoint(),
            action = message.action().unwrap_or("Identify"),
            resource = message.resource_uri().unwrap_or_default(),
            "sending wsman request"
        );
        transport::send(&mut self.transport, message).await
    }

    /// WSMID `Identify`: protocol version and product information.
    pub async fn identify(&mut self) -> Result<Message> {
        self.send(&Message::identify()).await
    }

    /// An `Enumerate` request, for callers that want to add options,
    /// selectors or a filter before running it with
    /// [`Client::run_enumeration`].
    pub fn enumerate_request(&self, resource: &str, mode: EnumerationMode) -> Message {
        enumeration::enumerate_request(self.endpoint(), resource, mode, self.optimize_enumeration)
    }

    /// Run an `Enumerate` request to completion.
    pub async fn run_enumeration(&mut self, request: &Message) -> Result<Message> {
        self.driver.run(&mut self.transport, request).await
    }

    /// Enumerate every instance of `resource`.
    pub async fn enumerate(&mut self, resource: &str) -> Result<Message> {
        let request = self.enumerate_request(resource, EnumerationMode::Objects);
        self.run_enumeration(&request).await
    }

    /// Enumerate endpoint references to every instance of `resource`.
    pub async fn enumerate_epr(&mut self, resource: &str) -> Result<Message> {
        let request = self.enumerate_request(resource, EnumerationMode::EndpointReferences);
        self.run_enumeration(&request).await
    }
}

// ============================================================================
// Client Builder
// ============================================================================

/// Builder for [`Client`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    config: TransportConfig,
    optimize_enumeration: bool,
    max_pages: Option<usize>,
}

impl ClientBuilder {
    /// Create a builder for `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            config: TransportConfig::new(endpoint),
            optimize_enumeration: true,
            max_pages: Some(DEFAULT_MAX_PAGES),
        }
    }

    /// Set username and password
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Set the authentication scheme
    pub fn auth(mut self, auth: AuthMode) -> Self {
        self.config.auth = auth;
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set TLS certificate verification
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.config.verify_tls = verify;
        self
    }

    /// Set custom CA certificate
    pub fn ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ca_cert = Some(path.into());
        self
    }

    /// Request items in the `Enumerate` response itself
    pub fn optimize_enumeration(mut self, optimize: bool) -> Self {
        self.optimize_enumeration = optimize;
        self
    }

    /// Cap the number of pages one enumeration may pull
    pub fn max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Validate the endpoint and build the client.
    pub fn build(self) -> Result<Client> {
        let url = Url::parse(&self.config.endpoint).map_err(|e| {
            Error::argument(format!("invalid endpoint '{}': {e}", self.config.endpoint))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::argument(format!(
                "endpoint '{}' must use http or https",
                self.config.endpoint
            )));
        }

        Ok(Client {
            transport: Transport::new(self.config)?,
            optimize_enumeration: self.optimize_enumeration,
            driver: EnumerationDriver::with_max_pages(self.max_pages),
        })
    }
}
