pub mod registry;

pub use registry::RegistrySink;
