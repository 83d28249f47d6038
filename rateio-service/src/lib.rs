pub mod bootstrap;
pub mod config;
pub mod engine;
pub mod observability;
pub mod pipeline;
pub mod session;
pub mod sinks;
pub mod sources;
pub mod tasks;
pub mod transform;

pub use pipeline::{Envelope, Pipeline};
