//! Network front end: HTTP endpoints plus the `/map.ws` WebSocket.

pub mod http;
pub mod ws;

pub use http::run;
