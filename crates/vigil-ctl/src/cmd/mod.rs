//! CLI command modules.

pub mod http;
pub mod peers;
pub mod rooms;
pub mod traffic;
