//! # mapruntime - a client-side runtime for declarative use-case maps
//!
//! `mapruntime` executes declarative "use-case maps" against provider HTTP
//! APIs: a profile declares a use-case's input/output contract, a map
//! describes how to fulfill it against a specific provider, and a
//! super-document binds profiles to providers with priority/failover rules.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use mapruntime::client::Client;
//! use mapruntime::driver::PerformOptions;
//! use mapruntime::value::Variable;
//!
//! # async fn run(client: Client) -> mapruntime::error::Result<()> {
//! let output = client
//!     .get_profile("weather")?
//!     .get_usecase("CurrentWeather")
//!     .perform(Variable::object(), PerformOptions::default())
//!     .await?;
//! # let _ = output;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`value`] — the tagged-variant runtime value type (`Variable`).
//! - [`binary`] — pull-based binary data streaming.
//! - [`http`] — URL templating, body dispatch, and the fetch pipeline.
//! - [`security`] — API key, Basic/Bearer, and Digest authentication.
//! - [`failure`] — retry/circuit-breaker/router failure policies.
//! - [`events`] — the around-interceptor event bus.
//! - [`config`] — super-document loading and normalization.
//! - [`interpreter`] — the map AST executor.
//! - [`driver`] — the `perform()` orchestration and bound-provider cache.
//! - [`client`] — the public facade.

pub mod binary;
pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod failure;
pub mod http;
pub mod interpreter;
pub mod security;
pub mod telemetry;
pub mod value;

pub use client::{Client, Profile, UseCase};
pub use driver::{Driver, PerformOptions};
pub use error::{MapRuntimeError, Result};
pub use value::Variable;
