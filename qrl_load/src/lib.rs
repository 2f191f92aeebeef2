//! Library for lazily loading symbols from modules, loading each module at most once.
//!
//! The types provided by this module are thread-safe, to allow dependents such as event dispatchers and state
//! deserializers running on multiple threads to share a single [`State`].

mod state;

pub mod config;
pub mod error;
pub mod module;
pub mod resolver;

pub use config::{Config, Initializer};
pub use error::LoadError;
pub use resolver::Resolver;
pub use state::{Deferred, Resolution, State, Statistics};
