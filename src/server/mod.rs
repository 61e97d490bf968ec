pub mod http;

pub use http::PathServer;
