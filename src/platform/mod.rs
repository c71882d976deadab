// ABOUTME: Platform adapter module
// ABOUTME: Re-exports the HTTP live-platform client

pub mod http;

pub use http::HttpPlatformClient;
