//! HTTP client for the todo API: request building, envelope normalization,
//! retry of transient failures and typed errors.

pub mod api;
pub mod envelope;
pub mod error;
pub mod retry;

pub use api::{ApiClient, ApiInfo, ClientConfig, TodoApi};
pub use error::ClientError;
pub use retry::RetryPolicy;
