/// Elasticsearch-compatible indexing endpoint
///
/// Provides the HTTP client that checks the store and posts documents into dated indices

pub mod endpoint;

pub use endpoint::{dated_index, EndpointClient};
