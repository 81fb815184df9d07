//! API-key placement: header, query, path segment, or JSON-pointer body path
//! (spec §4.4 "ApiKey security scheme").

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::Result;
use crate::http::PreparedRequest;
use crate::value::{set_by_path, Variable};

use super::SecurityHandler;

#[derive(Debug, Clone)]
pub enum ApiKeyPlacement {
    Header { name: String },
    Query { name: String },
    Path { name: String },
    Body { pointer: String },
}

pub struct ApiKeyHandler {
    placement: ApiKeyPlacement,
    apikey: SecretString,
}

impl ApiKeyHandler {
    pub fn new(placement: ApiKeyPlacement, apikey: impl Into<String>) -> Self {
        Self {
            placement,
            apikey: SecretString::from(apikey.into()),
        }
    }

    /// Split a JSON-pointer-like body path (`/a/b/c`) into segments.
    fn pointer_segments(pointer: &str) -> Vec<&str> {
        pointer
            .trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[async_trait]
impl SecurityHandler for ApiKeyHandler {
    async fn authenticate(&self, request: &mut PreparedRequest) -> Result<()> {
        let value = self.apikey.expose_secret().to_string();
        match &self.placement {
            ApiKeyPlacement::Header { name } => {
                request.headers.set(name, value);
            }
            ApiKeyPlacement::Query { name } => {
                request.query.push((name.clone(), value));
            }
            ApiKeyPlacement::Path { name } => {
                let placeholder = format!("{{{name}}}");
                request.url = request.url.replacen(&placeholder, &value, 1);
            }
            ApiKeyPlacement::Body { pointer } => {
                let segments = Self::pointer_segments(pointer);
                let mut body = std::mem::replace(&mut request.body, Variable::Null);
                set_by_path(&mut body, &segments, Variable::String(value))?;
                request.body = body;
            }
        }
        Ok(())
    }
}
