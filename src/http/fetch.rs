//! The `Fetch` adapter seam (spec §4.3 / §9 "narrow host interface"): one
//! async-trait boundary between the pipeline and the wire, with `reqwest`
//! as the concrete implementation.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::body::{FetchBody, MultipartPart};
use super::headers::HeaderMultimap;
use crate::error::{MapRuntimeError, PerformError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

pub struct FetchRequest {
    pub url: String,
    pub method: Method,
    pub headers: HeaderMultimap,
    pub query: Vec<(String, String)>,
    pub body: Option<FetchBody>,
    pub timeout: Option<Duration>,
}

pub struct FetchResponse {
    pub status: u16,
    pub headers: HeaderMultimap,
    pub body: Bytes,
}

/// The seam between the HTTP pipeline and the network (spec §4.3 step
/// "fetch"). Implementations must never retry or follow non-trivial
/// semantics beyond a single request/response round trip — retries belong
/// to the failure-policy layer (C5).
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse>;
}

/// Default `reqwest`-backed implementation.
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestFetch {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl Fetch for ReqwestFetch {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .expect("Method::as_str always yields a valid HTTP method token");
        let mut builder = self.client.request(method, &request.url).query(&request.query);

        for (name, values) in request.headers.iter() {
            for value in values {
                builder = builder.header(name, value);
            }
        }

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match request.body {
            None => builder,
            Some(FetchBody::Json(s)) => builder.header("content-type", "application/json").body(s),
            Some(FetchBody::FormUrlEncoded(s)) => builder
                .header("content-type", "application/x-www-form-urlencoded")
                .body(s),
            Some(FetchBody::Text(s)) => builder.body(s),
            Some(FetchBody::Raw(b)) => builder.body(b),
            Some(FetchBody::Binary(data)) => {
                let bytes = data.get_all_data(0).await?;
                builder.body(bytes.to_vec())
            }
            Some(FetchBody::Multipart(parts)) => {
                let mut form = reqwest::multipart::Form::new();
                for part in parts {
                    form = match part {
                        MultipartPart::Field { name, value } => form.text(name, value),
                        MultipartPart::File { name, data } => {
                            let bytes = data.get_all_data(0).await?;
                            let file_name = data.display_name().unwrap_or_else(|| name.clone());
                            let mimetype = data.mimetype();
                            let mut part = reqwest::multipart::Part::bytes(bytes.to_vec())
                                .file_name(file_name);
                            if let Some(mime) = mimetype {
                                part = part.mime_str(&mime).map_err(MapRuntimeError::from)?;
                            }
                            form.part(name, part)
                        }
                    };
                }
                builder.multipart(form)
            }
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                MapRuntimeError::Perform(PerformError::FetchTimeout(
                    request.timeout.unwrap_or_default(),
                ))
            } else {
                MapRuntimeError::Perform(PerformError::fetch_network(&request.url, e.to_string()))
            }
        })?;

        let status = response.status().as_u16();
        let mut headers = HeaderMultimap::new();
        for (name, value) in response.headers().iter() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str(), v);
            }
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| MapRuntimeError::Perform(PerformError::fetch_network(&request.url, e.to_string())))?;

        Ok(FetchResponse { status, headers, body })
    }
}
