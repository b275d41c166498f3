//! HTTP plumbing shared by every source and by the SensorThings client.

pub mod client;
pub mod partial;

pub use client::{HttpResponse, HttpTransport, ReqwestTransport};
pub use partial::{FetchOutcome, fetch};
