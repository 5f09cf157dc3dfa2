pub mod api;
pub mod commands;
pub mod config;
pub mod database;
pub mod document;
pub mod error;
pub mod llm;
pub mod providers;
pub mod session;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used items
pub use config::{AppConfig, Credentials};
pub use error::{QaError, QaResult};
pub use workflow::{HostedServices, Outcome, QaWorkflow, SubmitForm};
