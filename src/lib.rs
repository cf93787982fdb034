pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod poker;
pub mod project;
pub mod report;
pub mod style;
pub mod tracker;
pub mod workflow;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use error::TrackerError;
pub use workflow::{Filter, WorkflowState};
