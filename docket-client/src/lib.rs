//! Docket client library exports.

pub mod api_client;
pub mod config;
pub mod envelope;
pub mod record;
pub mod service;
pub mod telemetry;

pub use api_client::{ApiTransport, Method, RestClient};
pub use config::ClientConfig;
pub use record::{Page, Record};
pub use service::ResourceService;
