// Network module.
// HTTP transport for fetching resources that are not served from cache.

pub mod client;

pub use client::HttpClient;
