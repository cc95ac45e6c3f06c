//! Transport and authentication tests against a stub WS-Management server
//!
//! Covers:
//! - Basic authentication and request framing
//! - Lazy Digest handshake and the single 401 retry
//! - Nonce rotation between requests
//! - HTTP status, timeout and SOAP fault classification

use std::time::Duration;

use wiremock::matchers::{header, header_regex, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};
use wsman::auth::{AuthError, AuthMode};
use wsman::namespaces::NS_WSMID;
use wsman::{Client, ClientBuilder, Error, ErrorKind};

const IDENTIFY_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"
            xmlns:wsmid="http://schemas.dmtf.org/wbem/wsman/identity/1/wsmanidentity.xsd">
  <s:Header/>
  <s:Body>
    <wsmid:IdentifyResponse>
      <wsmid:ProtocolVersion>http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd</wsmid:ProtocolVersion>
      <wsmid:ProductVendor>Acme</wsmid:ProductVendor>
      <wsmid:ProductVersion>1.0</wsmid:ProductVersion>
    </wsmid:IdentifyResponse>
  </s:Body>
</s:Envelope>"#;

const FAULT_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"
            xmlns:w="http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd">
  <s:Header/>
  <s:Body>
    <s:Fault>
      <s:Code>
        <s:Value>s:Sender</s:Value>
        <s:Subcode><s:Value>w:InvalidSelectors</s:Value></s:Subcode>
      </s:Code>
      <s:Reason><s:Text xml:lang="en">The selectors for the resource are not valid.</s:Text></s:Reason>
    </s:Fault>
  </s:Body>
</s:Envelope>"#;

const CHALLENGE: &str = r#"Digest realm="Digest:ACME", nonce="n1", qop="auth", opaque="op""#;

/// Matches requests that carry no Authorization header.
struct NoAuthorization;

impl Match for NoAuthorization {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

fn endpoint(server: &MockServer) -> String {
    format!("{}/wsman", server.uri())
}

fn ok_identify() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_string(IDENTIFY_RESPONSE)
}

fn unauthorized(challenge: &str) -> ResponseTemplate {
    ResponseTemplate::new(401).insert_header("WWW-Authenticate", challenge)
}

fn digest_client(server: &MockServer) -> Client {
    Client::new(&endpoint(server), "root", "calvin", AuthMode::Digest).unwrap()
}

// ============================================================================
// Basic Authentication
// ============================================================================

#[tokio::test]
async fn test_basic_auth_and_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wsman"))
        .and(header("authorization", "Basic cm9vdDpjYWx2aW4="))
        .and(header("content-type", "application/soap+xml;charset=UTF-8"))
        .respond_with(ok_identify())
        .expect(1)
        .mount(&server)
        .await;

    let mut client = Client::new(&endpoint(&server), "root", "calvin", AuthMode::Basic).unwrap();
    let reply = client.identify().await.unwrap();

    assert_eq!(
        reply.find("ProductVendor", NS_WSMID).map(|e| e.text()),
        Some("Acme")
    );
}

#[tokio::test]
async fn test_no_credentials_sends_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(NoAuthorization)
        .respond_with(ok_identify())
        .expect(1)
        .mount(&server)
        .await;

    let mut client = Client::new(&endpoint(&server), "", "", AuthMode::Basic).unwrap();
    client.identify().await.unwrap();
}

// ============================================================================
// Digest Authentication
// ============================================================================

#[tokio::test]
async fn test_digest_handshake_retries_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(NoAuthorization)
        .respond_with(unauthorized(CHALLENGE))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header_regex(
            "authorization",
            r#"^Digest username="root", realm="Digest:ACME", nonce="n1", uri="[^"]+/wsman", response="[0-9a-f]{32}", algorithm="MD5", opaque="op", qop=auth, nc=00000001, cnonce="[0-9a-f]{16}"$"#,
        ))
        .respond_with(ok_identify())
        .expect(1)
        .mount(&server)
        .await;

    let mut client = digest_client(&server);
    client.identify().await.unwrap();

    let challenge = client.transport().challenge().unwrap();
    assert_eq!(challenge.realm(), "Digest:ACME");
    assert_eq!(challenge.nonce_count(), 1);
}

#[tokio::test]
async fn test_digest_challenge_found_among_several_schemes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(NoAuthorization)
        .respond_with(
            ResponseTemplate::new(401)
                .append_header("WWW-Authenticate", r#"Basic realm="ACME""#)
                .append_header("WWW-Authenticate", CHALLENGE),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header_regex("authorization", r#"^Digest .*realm="Digest:ACME""#))
        .respond_with(ok_identify())
        .expect(1)
        .mount(&server)
        .await;

    let mut client = digest_client(&server);
    client.identify().await.unwrap();

    assert_eq!(client.transport().challenge().unwrap().realm(), "Digest:ACME");
}

#[tokio::test]
async fn test_401_with_only_basic_challenge_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(unauthorized(r#"Basic realm="ACME""#))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = digest_client(&server);
    let err = client.identify().await.unwrap_err();
    assert!(matches!(err, Error::Auth(AuthError::MalformedChallenge(_))));
}

#[tokio::test]
async fn test_digest_nonce_rotation_between_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(NoAuthorization)
        .respond_with(unauthorized(CHALLENGE))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header_regex("authorization", r#"nonce="n1".*nc=00000001"#))
        .respond_with(ok_identify())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header_regex("authorization", r#"nonce="n1".*nc=00000002"#))
        .respond_with(unauthorized(
            r#"Digest realm="Digest:ACME", nonce="n2", qop="auth", opaque="op", stale="true""#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header_regex("authorization", r#"nonce="n2".*nc=00000003"#))
        .respond_with(ok_identify())
        .expect(1)
        .mount(&server)
        .await;

    let mut client = digest_client(&server);
    client.identify().await.unwrap();
    client.identify().await.unwrap();

    let challenge = client.transport().challenge().unwrap();
    assert_eq!(challenge.nonce(), "n2");
    assert!(challenge.is_stale());
    assert_eq!(challenge.nonce_count(), 3);
}

#[tokio::test]
async fn test_two_consecutive_401s_fail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(unauthorized(CHALLENGE).set_body_string("go away"))
        .expect(2)
        .mount(&server)
        .await;

    let mut client = digest_client(&server);
    let err = client.identify().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.status(), Some(401));
    match err {
        Error::HttpStatus { body, .. } => assert_eq!(body, "go away"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_401_without_challenge_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = digest_client(&server);
    let err = client.identify().await.unwrap_err();
    assert!(matches!(err, Error::Auth(AuthError::MissingChallenge)));
}

#[tokio::test]
async fn test_unsupported_qop_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(unauthorized(r#"Digest realm="r", nonce="n", qop="auth-int""#))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = digest_client(&server);
    let err = client.identify().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert!(matches!(err, Error::Auth(AuthError::UnsupportedQop(_))));
}

#[tokio::test]
async fn test_basic_mode_does_not_retry_401() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(unauthorized(CHALLENGE))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = Client::new(&endpoint(&server), "root", "calvin", AuthMode::Basic).unwrap();
    let err = client.identify().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
}

// ============================================================================
// Response Classification
// ============================================================================

#[tokio::test]
async fn test_server_error_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal failure"))
        .mount(&server)
        .await;

    let mut client = Client::new(&endpoint(&server), "root", "calvin", AuthMode::Basic).unwrap();
    let err = client.identify().await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("internal failure"));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_fault_with_http_200_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FAULT_RESPONSE))
        .mount(&server)
        .await;

    let mut client = Client::new(&endpoint(&server), "root", "calvin", AuthMode::Basic).unwrap();
    let request = client
        .get("http://schemas.dmtf.org/wbem/wscim/1/cim-schema/2/CIM_ComputerSystem")
        .with_selector("Name", "nope");
    let err = request.send(&mut client).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Fault);
    assert_eq!(err.exit_code(), 1);
    match &err {
        Error::Fault { fault, response } => {
            assert_eq!(fault.subcode.as_deref(), Some("w:InvalidSelectors"));
            assert!(response.fault().is_some());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_undecodable_body_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not soap</html>"))
        .mount(&server)
        .await;

    let mut client = Client::new(&endpoint(&server), "", "", AuthMode::None).unwrap();
    let err = client.identify().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_identify().set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let mut client = ClientBuilder::new(endpoint(&server))
        .auth(AuthMode::None)
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let err = client.identify().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let mut client = Client::new("http://127.0.0.1:1/wsman", "", "", AuthMode::None).unwrap();
    let err = client.identify().await.unwrap_err();
    assert!(matches!(err, Error::Transport { .. }));
}
