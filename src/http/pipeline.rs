//! HTTP pipeline orchestration (spec §4.3, component C3):
//! authenticate -> prepareRequest -> fetch -> handleResponse, with a single
//! possible re-entry into fetch when a security handler rewrites the
//! request (e.g. Digest's challenge/response round trip).

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::Result;
use crate::security::SecurityHandler;
use crate::value::Variable;

use super::body::dispatch_body;
use super::fetch::{Fetch, FetchRequest, FetchResponse, Method};
use super::headers::{apply_default_headers, HeaderMultimap};
use super::url::{create_url, resolve_placeholders};

/// A use-case-authored HTTP request description before pipeline processing
/// (spec §4.3 "RequestParameters").
pub struct RequestParameters {
    pub url: String,
    pub method: Method,
    pub headers: HeaderMultimap,
    pub query_parameters: BTreeMap<String, Variable>,
    pub path_parameters: BTreeMap<String, Variable>,
    pub body: Variable,
    pub content_type: Option<String>,
    pub timeout: Option<Duration>,
}

pub struct PreparedRequest {
    pub url: String,
    pub method: Method,
    pub headers: HeaderMultimap,
    pub query: Vec<(String, String)>,
    pub body: Variable,
    pub content_type: Option<String>,
    pub timeout: Option<Duration>,
}

const USER_AGENT: &str = concat!("mapruntime/", env!("CARGO_PKG_VERSION"));

/// Fill in `{name}` placeholders, assemble query parameters, and apply
/// default headers (spec §4.3 urlFilter -> bodyFilter -> queryFilter ->
/// methodFilter -> headersFilter, folded here since none of them depend on
/// each other's output besides the base request).
fn prepare_request(base_url: &str, params: RequestParameters) -> Result<PreparedRequest> {
    let path = resolve_placeholders(&params.url, &params.path_parameters)?;
    let url = create_url(base_url, &path)?;

    let query = super::body::flatten_query_parameters(&params.query_parameters)?;

    let mut headers = params.headers;
    apply_default_headers(&mut headers, USER_AGENT);

    Ok(PreparedRequest {
        url,
        method: params.method,
        headers,
        query,
        body: params.body,
        content_type: params.content_type,
        timeout: params.timeout,
    })
}

/// Run one full pipeline pass for a request, including the security
/// handler's single allowed retry (spec §4.4 Digest challenge/response).
pub async fn perform_http(
    base_url: &str,
    params: RequestParameters,
    security: Option<&dyn SecurityHandler>,
    fetch: &dyn Fetch,
) -> Result<FetchResponse> {
    let mut prepared = prepare_request(base_url, params)?;

    if let Some(security) = security {
        security.authenticate(&mut prepared).await?;
    }

    let response = send(&prepared, fetch).await?;

    if let Some(security) = security {
        if let Some(retry) = security.handle_response(&response, &mut prepared).await? {
            if retry {
                return send(&prepared, fetch).await;
            }
        }
    }

    Ok(response)
}

async fn send(prepared: &PreparedRequest, fetch: &dyn Fetch) -> Result<FetchResponse> {
    let content_type = prepared.content_type.as_deref();
    let body = dispatch_body(content_type, &prepared.body)?;

    let mut headers = prepared.headers.clone();
    // multipart/form-data's content-type (with its boundary) is generated by
    // the transport, not set here (spec §4.3 "header rules").
    if let Some(ct) = content_type {
        if ct.split(';').next().unwrap_or("").trim() != "multipart/form-data" {
            headers.set_if_absent("content-type", ct);
        }
    }

    let request = FetchRequest {
        url: prepared.url.clone(),
        method: prepared.method,
        headers,
        query: prepared.query.clone(),
        body,
        timeout: prepared.timeout,
    };

    fetch.fetch(request).await
}
