//! Configuration module

pub mod settings;

pub use settings::{
    DispatchConfig, HealthCheckConfig, InstanceConfig, LoggingConfig, ServerConfig, Settings,
};
