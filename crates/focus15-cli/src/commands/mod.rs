pub mod config;
pub mod history;
pub mod reset;
pub mod session;
pub mod status;
