//! Blocking client core for the Beaker orchestration service.
//!
//! # Overview
//! Every call funnels through one pipeline: an `ApiRequest` is addressed and
//! authenticated by `RequestBuilder`, sent by `RetryingTransport` with
//! jittered exponential backoff, and interpreted once by `response`, which
//! yields a typed value or a `ClientError`. Resource handles bind a canonical
//! ID resolved from a name-or-ID reference; `Pager` walks list endpoints.
//!
//! # Design
//! - Requests and responses are plain data (`HttpRequest`, `HttpResponse`);
//!   the `Transport` trait is the only place bytes move.
//! - `Client` is an `Arc` over frozen configuration and is cheap to clone
//!   across threads. The only shared mutable state is the backoff RNG.
//! - Every network operation takes a `Context` carrying its deadline and
//!   cancellation signal.
//! - The library emits `tracing` events and installs no subscriber.
//!
//! ```no_run
//! use beaker_core::{Client, Context, DatasetPatch};
//!
//! # fn main() -> beaker_core::Result<()> {
//! let client = Client::new("beaker.example.org", "my-token")?;
//! let ctx = Context::background();
//! let dataset = client.dataset(&ctx, "ana/imagenet")?;
//! let patch = DatasetPatch {
//!     description: Some("ILSVRC 2012".to_string()),
//!     ..DatasetPatch::default()
//! };
//! dataset.patch(&ctx, &patch)?;
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod pager;
pub mod request;
pub mod resolve;
pub mod resource;
pub mod response;
pub mod retry;
pub mod transport;
pub mod types;

pub use backoff::Backoff;
pub use client::{Client, User};
pub use config::{ClientConfig, ResponseHook, RetryConfig};
pub use context::{CancelToken, Context};
pub use error::{ApiError, ClientError, Result, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use pager::{ListOptions, Page, Pager};
pub use request::{ApiRequest, RequestBuilder};
pub use resource::{Handle, ResourceKind};
pub use retry::RetryingTransport;
pub use transport::{Transport, UreqTransport};
pub use types::{
    Cluster, ClusterHandle, ClusterPatch, Clusters, Dataset, DatasetHandle, DatasetPatch,
    Datasets, Experiment, ExperimentHandle, ExperimentPatch, Experiments, Identity, Workspace,
    WorkspaceHandle, WorkspacePatch, Workspaces,
};
