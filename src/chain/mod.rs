pub mod snapshot;
pub mod types;
