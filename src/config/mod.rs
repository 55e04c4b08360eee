//! Configuration loading for the roster engine.

mod settings;

pub use settings::*;
