//! Integration test common infrastructure.
//!
//! Provides utilities for spawning test servers and driving the member API
//! over HTTP.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::{Reply, TestClient};
#[allow(unused_imports)]
pub use server::TestServer;
