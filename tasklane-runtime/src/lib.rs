pub mod backend;
pub mod capture;
pub mod config_store;
pub mod defaults;
pub mod runtime_bridge;
pub mod session_store;
