//! HTTP pipeline (spec §4.3, component C3): URL templating, body dispatch,
//! header handling, and the authenticate/prepareRequest/fetch/handleResponse
//! filter chain.

pub mod body;
pub mod fetch;
pub mod headers;
pub mod pipeline;
pub mod url;

pub use body::{dispatch_body, flatten_query_parameters, FetchBody, MultipartPart};
pub use fetch::{Fetch, FetchRequest, FetchResponse, Method, ReqwestFetch};
pub use headers::HeaderMultimap;
pub use pipeline::{perform_http, PreparedRequest, RequestParameters};
