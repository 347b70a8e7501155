// basket/src/remote/mod.rs

//! The network boundary: the `RemoteResource` trait and its reqwest implementation.

pub mod client;
pub mod http;
pub(crate) mod wire;

pub use client::RemoteResource;
pub use http::HttpRemote;
