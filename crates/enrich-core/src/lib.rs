pub mod aliases;
pub mod coerce;
pub mod config;
pub mod error;
pub mod io;
pub mod mapper;
pub mod merge;
pub mod notion;
pub mod orchestrator;
pub mod paths;
pub mod payload;
pub mod quality;
pub mod schema;
pub mod semantic;
pub mod store;
pub mod types;

pub use error::{EnrichError, Result};
pub use orchestrator::{EngineSettings, Plan, Reconciler};
