//! Backend module - Instances, registry, and the outbound HTTP client

pub mod http_client;
pub mod instance;
pub mod registry;
pub mod traits;

pub use instance::{Instance, InstanceAddress, InstanceView};
pub use registry::InstanceRegistry;
pub use traits::{ForwardRequest, ForwardResponse, InstanceClient};
