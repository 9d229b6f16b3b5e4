//! A resilient JSON HTTP client: request context, the transport contract,
//! and the fixed-order resilience pipeline tying together `rhttp-bulkhead`,
//! `rhttp-circuitbreaker`, `rhttp-retry`, `rhttp-timelimiter`, and
//! `rhttp-cache`.
//!
//! ```no_run
//! use rhttp_client::{Client, RequestOptions};
//!
//! # async fn run() -> Result<(), rhttp_core::ClientError> {
//! # #[cfg(feature = "reqwest-transport")]
//! # {
//! let transport = std::sync::Arc::new(rhttp_client::ReqwestTransport::default());
//! let client = Client::builder().build(transport);
//! let response = client.fetch("https://example.com/widgets", RequestOptions::default()).await?;
//! # let _ = response;
//! # }
//! # Ok(())
//! # }
//! ```

mod abort;
mod client;
mod context;
mod headers;
mod pipeline;
mod transport;

pub use abort::{race as race_abort_handles, AbortHandle};
pub use client::{CacheOptions, Client, ClientBuilder, JsonResponse, RequestOptions};
pub use context::RequestContext;
pub use headers::merge_headers;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use transport::{Request, Response, Transport};

#[cfg(feature = "reqwest-transport")]
pub use transport::ReqwestTransport;
