//! Gateway module - Dispatching, health probing, and pool administration

pub mod admin;
pub mod dispatcher;
pub mod health_check;

pub use admin::AdminInterface;
pub use dispatcher::Dispatcher;
pub use health_check::{HealthProber, ProbeSummary};
