pub mod commands;
pub mod modules;

pub use modules::catalog;
pub use modules::common::error::UninstallerError;
pub use modules::common::utils;
pub use modules::executor;
pub use modules::inventory;
pub use modules::orchestrator;
