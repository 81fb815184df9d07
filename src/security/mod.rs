//! Security handlers (spec §4.4, component C4): one narrow trait implemented
//! per scheme, with an authenticate/handleResponse pipeline hook pair so
//! Digest's challenge/response round trip can rewrite the request after a
//! 401.

mod apikey;
mod cache;
mod digest;
mod http_auth;

pub use apikey::{ApiKeyHandler, ApiKeyPlacement};
pub use cache::DigestCache;
pub use digest::{CnonceSource, DigestHandler};
pub use http_auth::{BasicHandler, BearerHandler};

use async_trait::async_trait;

use crate::error::Result;
use crate::http::{FetchResponse, PreparedRequest};

/// One authentication scheme (spec §4.4). `authenticate` runs before the
/// request is sent; `handle_response` runs after, and may signal that the
/// request should be resent (`Ok(Some(true))`) after rewriting it in place —
/// used only by Digest's challenge/response handshake.
#[async_trait]
pub trait SecurityHandler: Send + Sync {
    async fn authenticate(&self, request: &mut PreparedRequest) -> Result<()>;

    async fn handle_response(
        &self,
        _response: &FetchResponse,
        _request: &mut PreparedRequest,
    ) -> Result<Option<bool>> {
        Ok(None)
    }
}
