pub mod catalog;
pub mod common;
pub mod executor;
pub mod inventory;
pub mod orchestrator;
