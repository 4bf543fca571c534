//! Configuration.

mod settings;

pub use settings::{Config, DatabaseConfig, SynthesisConfig};
