//! Clients for the NiFi management API and the NiFi Registry API.
//!
//! All remote traffic is isolated here. The rest of the crate depends only on
//! the [`CanvasApi`] and [`FlowRegistryApi`] traits.

mod canvas;
mod http;
mod poll;
mod registry;
pub mod types;

pub use canvas::{CanvasApi, NifiClient};
pub use poll::wait_until_ready;
pub use registry::{FlowRegistryApi, RegistryClient};
