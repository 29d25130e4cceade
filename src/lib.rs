//! Declarative HTTP request execution with a caching pipeline.
//!
//! A request is a plain serializable type implementing [`ApiRequest`], with
//! all static metadata declared once per type in a [`RequestDeclaration`].
//! The [`Executor`] turns an invocation into a wire call through its chain
//! of [`ChainLink`]s, runs the attempt loop, interprets the response per the
//! declared shape, and consults the cache on both sides of the call. Every
//! classified failure is returned as a [`ClientResponse`] error envelope
//! rather than an `Err`.

pub mod cache;
pub mod chain;
pub mod client;
pub mod constants;
pub mod declaration;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod logging;
pub mod mime;
pub mod params;
pub mod registry;
pub mod request;
pub mod resolve;
pub mod response;
pub mod transport;

pub use cache::{CacheBackend, CacheEntry, CacheKeyBuilder, CacheStore, MemoryBackend};
pub use chain::ChainLink;
pub use client::{CacheMode, CacheSettings, ClientConfig};
pub use declaration::{FieldSpec, Method, RequestDeclaration};
pub use error::Error;
pub use executor::{Executor, ExecutorBuilder};
pub use registry::ResourceRegistry;
pub use request::{ApiRequest, CacheDirective, Invocation};
pub use response::{ClientResponse, FileHandle, Resolved};
pub use transport::{BodyFormat, Transport, WireRequest, WireResponse};
