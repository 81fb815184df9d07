//! HTTP Digest challenge/response (spec §4.4, RFC 2617/7616 subset).

use std::sync::Arc;

use async_trait::async_trait;
use md5::Md5;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest as _, Sha256};

use crate::error::{MapRuntimeError, Result, UnexpectedError};
use crate::http::{FetchResponse, PreparedRequest};

use super::cache::DigestCache;
use super::SecurityHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md5,
    Md5Sess,
    Sha256,
    Sha256Sess,
}

impl DigestAlgorithm {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "MD5" => Some(Self::Md5),
            "MD5-sess" => Some(Self::Md5Sess),
            "SHA-256" => Some(Self::Sha256),
            "SHA-256-sess" => Some(Self::Sha256Sess),
            _ => None,
        }
    }

    fn is_session_variant(&self) -> bool {
        matches!(self, Self::Md5Sess | Self::Sha256Sess)
    }

    fn hash_hex(&self, data: &str) -> String {
        match self {
            Self::Md5 | Self::Md5Sess => hex::encode(Md5::digest(data.as_bytes())),
            Self::Sha256 | Self::Sha256Sess => hex::encode(Sha256::digest(data.as_bytes())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qop {
    Auth,
    AuthInt,
}

impl Qop {
    fn as_str(&self) -> &'static str {
        match self {
            Qop::Auth => "auth",
            Qop::AuthInt => "auth-int",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub qop: Option<Qop>,
    pub algorithm: DigestAlgorithm,
}

impl Default for DigestChallenge {
    fn default() -> Self {
        Self {
            realm: String::new(),
            nonce: String::new(),
            opaque: None,
            qop: None,
            algorithm: DigestAlgorithm::Md5,
        }
    }
}

/// Parse a `WWW-Authenticate: Digest ...` header value (spec §4.4 "Challenge
/// parse"). The leading scheme token must be present; remaining fields are
/// `key=value` pairs, quoted or not, separated by commas.
pub fn parse_challenge(header: &str) -> Result<DigestChallenge> {
    let mut parts = header.trim().splitn(2, char::is_whitespace);
    let scheme = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| MapRuntimeError::Unexpected(UnexpectedError::DigestMissingPart("scheme".into())))?;
    if !scheme.eq_ignore_ascii_case("Digest") {
        return Err(MapRuntimeError::Unexpected(UnexpectedError::DigestUnexpectedValue {
            part: "scheme".into(),
            value: scheme.into(),
        }));
    }
    let rest = parts.next().unwrap_or("");

    let mut realm = None;
    let mut nonce = None;
    let mut opaque = None;
    let mut qop_raw = None;
    let mut algorithm_raw = None;

    for field in split_fields(rest) {
        let Some((key, value)) = field.split_once('=') else { continue };
        let key = key.trim();
        let value = value.trim().trim_matches('"');
        match key {
            "realm" => realm = Some(value.to_string()),
            "nonce" => nonce = Some(value.to_string()),
            "opaque" => opaque = Some(value.to_string()),
            "qop" => qop_raw = Some(value.to_string()),
            "algorithm" => algorithm_raw = Some(value.to_string()),
            _ => {}
        }
    }

    let realm = realm.ok_or_else(|| MapRuntimeError::Unexpected(UnexpectedError::DigestMissingPart("realm".into())))?;
    let nonce = nonce.ok_or_else(|| MapRuntimeError::Unexpected(UnexpectedError::DigestMissingPart("nonce".into())))?;

    let qop = match qop_raw {
        None => None,
        Some(raw) => {
            let offered: Vec<&str> = raw.split(',').map(str::trim).collect();
            if offered.contains(&"auth-int") {
                Some(Qop::AuthInt)
            } else if offered.contains(&"auth") {
                Some(Qop::Auth)
            } else {
                return Err(MapRuntimeError::Unexpected(UnexpectedError::DigestUnexpectedValue {
                    part: "qop".into(),
                    value: raw,
                }));
            }
        }
    };

    let algorithm = match algorithm_raw {
        None => DigestAlgorithm::Md5,
        Some(raw) => DigestAlgorithm::parse(&raw).ok_or_else(|| {
            MapRuntimeError::Unexpected(UnexpectedError::DigestUnexpectedValue {
                part: "algorithm".into(),
                value: raw,
            })
        })?,
    };

    Ok(DigestChallenge {
        realm,
        nonce,
        opaque,
        qop,
        algorithm,
    })
}

fn split_fields(rest: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in rest.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        fields.push(current);
    }
    fields
}

/// The path component of a resolved URL (spec §4.4 "URI is the path
/// component of the resolved URL").
fn path_component(url: &str) -> String {
    let without_scheme = url.splitn(2, "://").nth(1).unwrap_or(url);
    let path_start = without_scheme.find('/').map(|i| &without_scheme[i..]).unwrap_or("/");
    path_start.split('?').next().unwrap_or("/").to_string()
}

/// Source of cryptographically random `cnonce` values (spec §4.4 "cnonce is
/// 32 hex characters drawn from a cryptographic random source injected into
/// the handler").
pub trait CnonceSource: Send + Sync {
    fn cnonce(&self) -> String;
}

pub struct OsRngCnonce;

impl CnonceSource for OsRngCnonce {
    fn cnonce(&self) -> String {
        let mut bytes = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

pub struct DigestHandler {
    id: String,
    username: String,
    password: SecretString,
    status_code: u16,
    challenge_header: String,
    authorization_header: String,
    cache: Arc<DigestCache>,
    cnonce_source: Arc<dyn CnonceSource>,
}

impl DigestHandler {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        cache: Arc<DigestCache>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            password: SecretString::from(password.into()),
            status_code: 401,
            challenge_header: "www-authenticate".into(),
            authorization_header: "Authorization".into(),
            cache,
            cnonce_source: Arc::new(OsRngCnonce),
        }
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn with_challenge_header(mut self, header: impl Into<String>) -> Self {
        self.challenge_header = header.into();
        self
    }

    pub fn with_authorization_header(mut self, header: impl Into<String>) -> Self {
        self.authorization_header = header.into();
        self
    }

    pub fn with_cnonce_source(mut self, source: Arc<dyn CnonceSource>) -> Self {
        self.cnonce_source = source;
        self
    }

    fn cache_key(&self) -> String {
        DigestCache::key(&self.id, &self.username, self.password.expose_secret())
    }

    /// Build the `Authorization` header value for `challenge` against the
    /// given HTTP method and URL (spec §4.4 "Response construction").
    pub fn build_authorization(
        &self,
        challenge: &DigestChallenge,
        method: &str,
        url: &str,
    ) -> String {
        let password = self.password.expose_secret();
        let uri = path_component(url);
        let cnonce = self.cnonce_source.cnonce();
        let nc = "00000001";

        let mut ha1 = challenge.algorithm.hash_hex(&format!(
            "{}:{}:{}",
            self.username, challenge.realm, password
        ));
        if challenge.algorithm.is_session_variant() {
            ha1 = challenge
                .algorithm
                .hash_hex(&format!("{}:{}:{}", ha1, challenge.nonce, cnonce));
        }

        let ha2 = challenge.algorithm.hash_hex(&format!("{method}:{uri}"));

        let response = match challenge.qop {
            Some(qop) => challenge.algorithm.hash_hex(&format!(
                "{}:{}:{}:{}:{}:{}",
                ha1,
                challenge.nonce,
                nc,
                cnonce,
                qop.as_str(),
                ha2
            )),
            None => challenge
                .algorithm
                .hash_hex(&format!("{}:{}:{}", ha1, challenge.nonce, ha2)),
        };

        let mut fields = vec![
            format!("username=\"{}\"", self.username),
            format!("realm=\"{}\"", challenge.realm),
            format!("nonce=\"{}\"", challenge.nonce),
            format!("uri=\"{}\"", uri),
        ];
        if let Some(opaque) = &challenge.opaque {
            fields.push(format!("opaque=\"{opaque}\""));
        }
        if let Some(qop) = challenge.qop {
            fields.push(format!("qop={}", qop.as_str()));
        }
        fields.push(format!(
            "algorithm={}",
            match challenge.algorithm {
                DigestAlgorithm::Md5 => "MD5",
                DigestAlgorithm::Md5Sess => "MD5-sess",
                DigestAlgorithm::Sha256 => "SHA-256",
                DigestAlgorithm::Sha256Sess => "SHA-256-sess",
            }
        ));
        fields.push(format!("response=\"{response}\""));
        if challenge.qop.is_some() {
            fields.push(format!("nc={nc}"));
            fields.push(format!("cnonce=\"{cnonce}\""));
        }

        format!("Digest {}", fields.join(", "))
    }
}

#[async_trait]
impl SecurityHandler for DigestHandler {
    async fn authenticate(&self, request: &mut PreparedRequest) -> Result<()> {
        if let Some(cached) = self.cache.get(&self.cache_key()) {
            request.headers.set(&self.authorization_header, cached);
        }
        Ok(())
    }

    async fn handle_response(
        &self,
        response: &FetchResponse,
        request: &mut PreparedRequest,
    ) -> Result<Option<bool>> {
        if response.status != self.status_code {
            return Ok(None);
        }
        let header = response
            .headers
            .get_first(&self.challenge_header)
            .ok_or_else(|| MapRuntimeError::Unexpected(UnexpectedError::DigestHeaderNotFound))?;
        let challenge = parse_challenge(header)?;

        let key = self.cache_key();
        self.cache.invalidate(&key);

        let authorization = self.build_authorization(&challenge, request.method.as_str(), &request.url);
        self.cache.store(key, authorization.clone());
        request.headers.set(&self.authorization_header, authorization);
        Ok(Some(true))
    }
}
