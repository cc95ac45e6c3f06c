//! RFC 2617 Digest authentication, MD5 only.
//!
//! A [`Challenge`] is created from the server's `WWW-Authenticate` header and
//! then answers every subsequent request with an `Authorization` value. Each
//! answer advances the nonce count, which servers use to reject replays, so a
//! challenge must have exactly one owner and is deliberately not `Clone`.
//!
//! `MD5-sess` and `qop=auth-int` are not implemented; controllers that
//! support them are rare and their implementations inconsistent.

use std::fmt::Write as _;

use secrecy::{ExposeSecret, SecretString};

use super::{AuthError, Credentials};

const SCHEME_PREFIX: &str = "Digest ";
const MD5: &str = "MD5";
const QOP_AUTH: &str = "auth";

/// Server challenge plus the client-side state needed to answer it.
pub struct Challenge {
    username: String,
    password: SecretString,
    realm: String,
    domain: String,
    nonce: String,
    opaque: String,
    stale: bool,
    algorithm: String,
    qop: String,
    cnonce: String,
    nonce_count: u32,
}

impl Challenge {
    /// A challenge with no server parameters yet.
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            username: credentials.username().to_string(),
            password: credentials.password().clone(),
            realm: String::new(),
            domain: String::new(),
            nonce: String::new(),
            opaque: String::new(),
            stale: false,
            algorithm: MD5.to_string(),
            qop: String::new(),
            cnonce: String::new(),
            nonce_count: 0,
        }
    }

    /// Parse a `WWW-Authenticate` header value into a new challenge.
    pub fn parse(credentials: &Credentials, header: &str) -> Result<Self, AuthError> {
        let mut challenge = Self::new(credentials);
        challenge.update(header)?;
        Ok(challenge)
    }

    /// Replace the server parameters with those of a fresh challenge.
    ///
    /// The nonce count carries over: it only ever grows for the lifetime of
    /// this value. On error the current parameters are left untouched.
    pub fn update(&mut self, header: &str) -> Result<(), AuthError> {
        let params = parse_params(header)?;
        self.realm = params.realm;
        self.domain = params.domain;
        self.nonce = params.nonce;
        self.opaque = params.opaque;
        self.stale = params.stale;
        self.algorithm = params.algorithm;
        self.qop = params.qop;
        Ok(())
    }

    /// Realm announced by the server.
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Protection space announced by the server.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Current server nonce.
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Opaque value echoed back to the server.
    pub fn opaque(&self) -> &str {
        &self.opaque
    }

    /// Whether the server flagged the previous nonce as stale.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Hash algorithm, `MD5` unless the server said otherwise.
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Quality of protection, empty when unqualified.
    pub fn qop(&self) -> &str {
        &self.qop
    }

    /// Number of requests answered so far.
    pub fn nonce_count(&self) -> u32 {
        self.nonce_count
    }

    /// Client nonce used by the last `qop=auth` answer.
    pub fn cnonce(&self) -> &str {
        &self.cnonce
    }

    /// Compute the `Authorization` header value for one request.
    pub fn authorize(&mut self, method: &str, uri: &str) -> Result<String, AuthError> {
        self.authorize_with_cnonce(method, uri, None)
    }

    /// Like [`Challenge::authorize`], with a caller-chosen client nonce.
    /// A fresh random one is generated when `cnonce` is `None`.
    pub fn authorize_with_cnonce(
        &mut self,
        method: &str,
        uri: &str,
        cnonce: Option<&str>,
    ) -> Result<String, AuthError> {
        if self.algorithm != MD5 {
            return Err(AuthError::UnsupportedAlgorithm(self.algorithm.clone()));
        }
        if !self.qop.is_empty() && self.qop != QOP_AUTH {
            return Err(AuthError::UnsupportedQop(self.qop.clone()));
        }

        self.nonce_count += 1;
        let ha1 = h(&format!(
            "{}:{}:{}",
            self.username,
            self.realm,
            self.password.expose_secret()
        ));
        let ha2 = h(&format!("{method}:{uri}"));

        let response = if self.qop == QOP_AUTH {
            self.cnonce = cnonce.map_or_else(generate_cnonce, str::to_string);
            h(&format!(
                "{ha1}:{}:{:08x}:{}:{QOP_AUTH}:{ha2}",
                self.nonce, self.nonce_count, self.cnonce
            ))
        } else {
            h(&format!("{ha1}:{}:{ha2}", self.nonce))
        };

        let mut fields = vec![
            format!(r#"username="{}""#, self.username),
            format!(r#"realm="{}""#, self.realm),
            format!(r#"nonce="{}""#, self.nonce),
            format!(r#"uri="{uri}""#),
            format!(r#"response="{response}""#),
        ];
        if !self.algorithm.is_empty() {
            fields.push(format!(r#"algorithm="{}""#, self.algorithm));
        }
        if !self.opaque.is_empty() {
            fields.push(format!(r#"opaque="{}""#, self.opaque));
        }
        if !self.qop.is_empty() {
            fields.push(format!("qop={}", self.qop));
            fields.push(format!("nc={:08x}", self.nonce_count));
            fields.push(format!(r#"cnonce="{}""#, self.cnonce));
        }

        Ok(format!("{SCHEME_PREFIX}{}", fields.join(", ")))
    }
}

impl std::fmt::Debug for Challenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Challenge")
            .field("username", &self.username)
            .field("realm", &self.realm)
            .field("nonce", &self.nonce)
            .field("algorithm", &self.algorithm)
            .field("qop", &self.qop)
            .field("nonce_count", &self.nonce_count)
            .finish_non_exhaustive()
    }
}

/// Server half of a challenge.
struct Params {
    realm: String,
    domain: String,
    nonce: String,
    opaque: String,
    stale: bool,
    algorithm: String,
    qop: String,
}

fn parse_params(header: &str) -> Result<Params, AuthError> {
    let header = header.trim();
    let rest = header.strip_prefix(SCHEME_PREFIX).ok_or_else(|| {
        AuthError::MalformedChallenge(format!("missing '{}' prefix: {header}", SCHEME_PREFIX.trim()))
    })?;

    let mut params = Params {
        realm: String::new(),
        domain: String::new(),
        nonce: String::new(),
        opaque: String::new(),
        stale: false,
        algorithm: MD5.to_string(),
        qop: String::new(),
    };

    for token in split_unquoted_commas(rest.trim()) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let (key, value) = token.split_once('=').ok_or_else(|| {
            AuthError::MalformedChallenge(format!("expected key=value, found '{token}'"))
        })?;
        let value = value.trim().trim_matches('"').to_string();
        match key.trim() {
            "realm" => params.realm = value,
            "domain" => params.domain = value,
            "nonce" => params.nonce = value,
            "opaque" => params.opaque = value,
            "stale" => params.stale = value.eq_ignore_ascii_case("true"),
            "algorithm" => params.algorithm = value,
            "qop" => params.qop = select_qop(value),
            other => {
                return Err(AuthError::MalformedChallenge(format!(
                    "unexpected token '{other}'"
                )))
            }
        }
    }

    if params.nonce.is_empty() {
        return Err(AuthError::MalformedChallenge("challenge has no nonce".to_string()));
    }
    Ok(params)
}

/// Split on commas that are not inside a quoted string.
fn split_unquoted_commas(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Servers may offer several qop values; pick `auth` when it is one of them.
fn select_qop(offered: String) -> String {
    if offered.contains(',') && offered.split(',').any(|q| q.trim() == QOP_AUTH) {
        QOP_AUTH.to_string()
    } else {
        offered
    }
}

fn h(data: &str) -> String {
    format!("{:x}", md5::compute(data))
}

fn generate_cnonce() -> String {
    let bytes: [u8; 8] = rand::random();
    bytes.iter().fold(String::with_capacity(16), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
