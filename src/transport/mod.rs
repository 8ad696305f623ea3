//! HTTP transport and the session pipeline layered over it.

pub mod http;
pub mod pipeline;
pub mod request;

pub use http::{HttpTransport, Transport};
pub use pipeline::{SessionPipeline, SessionPipelineBuilder};
pub use request::{ApiResponse, PendingRequest};
