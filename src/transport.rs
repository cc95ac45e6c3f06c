//! HTTP(S) transport for SOAP envelopes.
//!
//! A [`Transport`] performs one logical POST: it attaches Basic or Digest
//! credentials, and when a Digest server answers 401 (first contact, or a
//! rotated nonce) it absorbs the new challenge and retries exactly once.
//! Everything past that is reported to the caller.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{Client, Response, StatusCode};
use secrecy::ExposeSecret;
use tracing::{debug, trace};

use crate::auth::{AuthError, AuthMode, Challenge, Credentials};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::soap::{Envelope, SOAP_CONTENT_TYPE};

/// Default bound on one `post`, retry included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can carry one envelope to the endpoint and bring the
/// answer back.
///
/// [`Transport`] is the real implementation; the enumeration driver only
/// depends on this trait.
#[async_trait]
pub trait Exchange: Send {
    /// Endpoint URL used for the `To` header of follow-up messages.
    fn endpoint(&self) -> &str;

    /// Post one envelope and return the decoded response.
    async fn exchange(&mut self, envelope: &Envelope) -> Result<Envelope>;
}

/// Send `request` and check the response for a SOAP Fault.
///
/// HTTP success and SOAP success are independent: a 200 carrying a Fault
/// is still an error.
pub async fn send<E: Exchange + ?Sized>(exchange: &mut E, request: &Message) -> Result<Message> {
    let response = Message::from(exchange.exchange(request.envelope()).await?);
    if let Some(fault) = response.fault() {
        debug!(%fault, action = request.action().unwrap_or_default(), "SOAP fault");
        return Err(Error::Fault {
            fault,
            response: Box::new(response),
        });
    }
    Ok(response)
}

/// Transport settings.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Endpoint URL
    pub endpoint: String,
    /// Authentication scheme
    pub auth: AuthMode,
    /// Credentials, if any
    pub credentials: Option<Credentials>,
    /// Bound on one `post`, retry included
    pub timeout: Duration,
    /// Verify the server certificate
    pub verify_tls: bool,
    /// Additional PEM root certificate
    pub ca_cert: Option<PathBuf>,
}

impl TransportConfig {
    /// Settings for `endpoint` with everything else defaulted.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            auth: AuthMode::Basic,
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            verify_tls: false,
            ca_cert: None,
        }
    }
}

/// Authenticated SOAP-over-HTTP transport.
pub struct Transport {
    http: Client,
    endpoint: String,
    auth: AuthMode,
    credentials: Option<Credentials>,
    challenge: Option<Challenge>,
    timeout: Duration,
}

impl Transport {
    /// Build the HTTP client.
    pub fn new(config: TransportConfig) -> Result<Self> {
        if config.auth == AuthMode::Digest
            && config.credentials.as_ref().map_or(true, Credentials::is_empty)
        {
            return Err(AuthError::MissingCredentials.into());
        }

        let mut builder = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_tls);

        if let Some(ca_path) = &config.ca_cert {
            let pem = std::fs::read(ca_path).map_err(|e| {
                Error::argument(format!("failed to read CA cert '{}': {e}", ca_path.display()))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                Error::argument(format!("invalid CA cert '{}': {e}", ca_path.display()))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|e| Error::transport(config.endpoint.as_str(), e))?;

        Ok(Self {
            http,
            endpoint: config.endpoint,
            auth: config.auth,
            credentials: config.credentials,
            challenge: None,
            timeout: config.timeout,
        })
    }

    /// Endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Authentication scheme.
    pub fn auth_mode(&self) -> AuthMode {
        self.auth
    }

    /// Current digest challenge, once the server has sent one.
    pub fn challenge(&self) -> Option<&Challenge> {
        self.challenge.as_ref()
    }

    /// Post one envelope, reauthorizing once on a digest 401.
    pub async fn post(&mut self, envelope: &Envelope) -> Result<Envelope> {
        let timeout = self.timeout;
        match tokio::time::timeout(timeout, self.post_with_reauth(envelope)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                endpoint: self.endpoint.clone(),
                timeout,
            }),
        }
    }

    async fn post_with_reauth(&mut self, envelope: &Envelope) -> Result<Envelope> {
        let body = envelope.to_xml()?;
        trace!(endpoint = %self.endpoint, body = %body, "wsman request");

        let mut response = self.send_once(body.clone()).await?;

        if self.auth == AuthMode::Digest && response.status() == StatusCode::UNAUTHORIZED {
            debug!(endpoint = %self.endpoint, "Digest reauthorizing");
            let header = challenge_header(&response)?;
            self.accept_challenge(&header)?;
            response = self.send_once(body).await?;
        }

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::transport(self.endpoint.as_str(), e))?;

        if status.is_client_error() || status.is_server_error() {
            debug!(endpoint = %self.endpoint, status = status.as_u16(), "wsman request rejected");
            return Err(Error::HttpStatus {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body: text,
            });
        }

        trace!(endpoint = %self.endpoint, status = status.as_u16(), body = %text, "wsman response");
        Envelope::parse(text.as_bytes())
    }

    async fn send_once(&mut self, body: String) -> Result<Response> {
        let mut request = self
            .http
            .post(self.endpoint.as_str())
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .body(body);

        match self.auth {
            AuthMode::None => {}
            AuthMode::Basic => {
                if let Some(creds) = self.credentials.as_ref().filter(|c| !c.is_empty()) {
                    request = request.basic_auth(creds.username(), Some(creds.password().expose_secret()));
                }
            }
            AuthMode::Digest => {
                // No challenge yet: the first request goes out bare and its
                // 401 supplies one.
                if let Some(challenge) = self.challenge.as_mut() {
                    let authorization = challenge.authorize("POST", &self.endpoint)?;
                    request = request.header(AUTHORIZATION, authorization);
                }
            }
        }

        request
            .send()
            .await
            .map_err(|e| Error::transport(self.endpoint.as_str(), e))
    }

    fn accept_challenge(&mut self, header: &str) -> Result<()> {
        if let Some(challenge) = self.challenge.as_mut() {
            challenge.update(header)?;
            return Ok(());
        }
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(AuthError::MissingCredentials)?;
        self.challenge = Some(Challenge::parse(credentials, header)?);
        Ok(())
    }
}

#[async_trait]
impl Exchange for Transport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn exchange(&mut self, envelope: &Envelope) -> Result<Envelope> {
        self.post(envelope).await
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("endpoint", &self.endpoint)
            .field("auth", &self.auth)
            .field("challenge", &self.challenge)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// The `Digest` challenge among the response's `WWW-Authenticate` headers.
/// Servers may offer several schemes, one per header.
fn challenge_header(response: &Response) -> Result<String> {
    let mut offered = response.headers().get_all(WWW_AUTHENTICATE).iter().peekable();
    if offered.peek().is_none() {
        return Err(AuthError::MissingChallenge.into());
    }

    offered
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.trim_start().starts_with("Digest "))
        .map(str::to_string)
        .ok_or_else(|| {
            let reason = "no Digest challenge among WWW-Authenticate headers";
            AuthError::MalformedChallenge(reason.to_string()).into()
        })
}
