//! HTTP Basic and Bearer schemes (spec §4.4).

use async_trait::async_trait;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};

use crate::error::Result;
use crate::http::PreparedRequest;

use super::SecurityHandler;

pub struct BasicHandler {
    username: String,
    password: SecretString,
}

impl BasicHandler {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

#[async_trait]
impl SecurityHandler for BasicHandler {
    async fn authenticate(&self, request: &mut PreparedRequest) -> Result<()> {
        let raw = format!("{}:{}", self.username, self.password.expose_secret());
        let encoded = base64::engine::general_purpose::STANDARD.encode(raw);
        request.headers.set("authorization", format!("Basic {encoded}"));
        Ok(())
    }
}

pub struct BearerHandler {
    token: SecretString,
}

impl BearerHandler {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

#[async_trait]
impl SecurityHandler for BearerHandler {
    async fn authenticate(&self, request: &mut PreparedRequest) -> Result<()> {
        request
            .headers
            .set("authorization", format!("Bearer {}", self.token.expose_secret()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HeaderMultimap, Method};
    use crate::value::Variable;

    fn request() -> PreparedRequest {
        PreparedRequest {
            url: "https://api.example.com".into(),
            method: Method::Get,
            headers: HeaderMultimap::new(),
            query: Vec::new(),
            body: Variable::Null,
            content_type: None,
            timeout: None,
        }
    }

    #[tokio::test]
    async fn basic_encodes_username_password() {
        let handler = BasicHandler::new("alice", "wonderland");
        let mut req = request();
        handler.authenticate(&mut req).await.unwrap();
        assert_eq!(
            req.headers.get_first("authorization"),
            Some("Basic YWxpY2U6d29uZGVybGFuZA==")
        );
    }

    #[tokio::test]
    async fn bearer_sets_authorization_header() {
        let handler = BearerHandler::new("tok123");
        let mut req = request();
        handler.authenticate(&mut req).await.unwrap();
        assert_eq!(req.headers.get_first("authorization"), Some("Bearer tok123"));
    }
}
